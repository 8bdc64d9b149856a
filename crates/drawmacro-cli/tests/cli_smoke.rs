use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn drawmacro() -> Command {
    Command::new(assert_cmd::cargo_bin!("drawmacro"))
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf-8 stdout")
}

fn sample_model() -> Value {
    json!({
        "diagramType": "network",
        "elements": [
            { "id": "web", "type": "mxgraph.networks.server", "label": "Web", "x": 40, "y": 40 },
            { "id": "db", "type": "cylinder", "label": "DB", "x": 240, "y": 40 }
        ],
        "connections": [
            { "id": "q", "source": "web", "target": "db", "type": "dashed", "label": "SQL" }
        ]
    })
}

#[test]
fn cli_encodes_and_decodes() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let model_path = tmp.path().join("model.json");
    fs::write(&model_path, sample_model().to_string()).expect("write model");

    let payload = stdout_of(drawmacro().args(["encode", model_path.to_string_lossy().as_ref()]));
    let payload = payload.trim();
    assert!(!payload.is_empty());

    let decoded: Value =
        serde_json::from_str(&stdout_of(drawmacro().arg("decode").write_stdin(payload)))
            .expect("decode JSON");
    assert_eq!(decoded["diagramType"], "network");
    assert_eq!(decoded["elements"][1]["label"], "DB");
    assert_eq!(decoded["connections"][0]["source"], "element-1");

    let xml = stdout_of(
        drawmacro()
            .args(["encode", "--xml"])
            .write_stdin(sample_model().to_string()),
    );
    assert!(xml.starts_with("<mxfile host=\"Confluence\""));
}

#[test]
fn cli_decode_meta_reports_status() {
    let fixture = repo_root()
        .join("fixtures")
        .join("payloads")
        .join("not-a-diagram.b64");

    let out: Value = serde_json::from_str(&stdout_of(
        drawmacro().args(["decode", "--meta", fixture.to_string_lossy().as_ref()]),
    ))
    .expect("decode JSON");
    assert_eq!(out["status"], "unreadable");
    assert_eq!(out["model"]["elements"], json!([]));

    drawmacro()
        .args(["decode", "--strict", fixture.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}

#[test]
fn cli_lists_and_reads_document_macros() {
    let fixture = repo_root()
        .join("fixtures")
        .join("documents")
        .join("architecture-page.xml");
    assert!(fixture.exists(), "fixture missing: {}", fixture.display());
    let doc = fixture.to_string_lossy().to_string();

    let listed: Value =
        serde_json::from_str(&stdout_of(drawmacro().args(["list", &doc]))).expect("list JSON");
    assert_eq!(
        listed,
        json!([
            { "macroId": "arch", "diagramName": "Architecture", "hasPayload": true },
            { "macroId": "flow", "diagramName": "Approval & release", "hasPayload": true }
        ])
    );

    let fetched: Value = serde_json::from_str(&stdout_of(drawmacro().args([
        "get",
        "--macro-id",
        "flow",
        "--strict",
        &doc,
    ])))
    .expect("get JSON");
    assert_eq!(fetched["meta"]["diagramKind"], "flowchart");
    assert_eq!(fetched["meta"]["status"], "complete");
    assert_eq!(fetched["model"]["elements"][1]["label"], "Approved?");

    drawmacro()
        .args(["get", "--macro-id", "missing-id", &doc])
        .assert()
        .code(3);
}

#[test]
fn cli_creates_and_updates_in_place() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("page.xml");
    fs::write(&doc, "<p>Intro</p>").expect("write page");
    let model_path = tmp.path().join("model.json");
    fs::write(&model_path, sample_model().to_string()).expect("write model");
    let doc_arg = doc.to_string_lossy().to_string();
    let model_arg = model_path.to_string_lossy().to_string();

    let macro_id = stdout_of(drawmacro().args([
        "create", "--name", "Stack", "--model", &model_arg, &doc_arg,
    ]));
    let macro_id = macro_id.trim().to_string();
    assert!(macro_id.starts_with("drawio-"));
    let body = fs::read_to_string(&doc).expect("read page");
    assert!(body.starts_with("<p>Intro</p>\n<ac:structured-macro"));

    let mut changed = sample_model();
    changed["elements"][0]["label"] = json!("Web tier");
    fs::write(&model_path, changed.to_string()).expect("write model");
    drawmacro()
        .args([
            "update",
            "--macro-id",
            &macro_id,
            "--model",
            &model_arg,
            &doc_arg,
        ])
        .assert()
        .success();

    let fetched: Value = serde_json::from_str(&stdout_of(drawmacro().args([
        "get",
        "--macro-id",
        &macro_id,
        &doc_arg,
    ])))
    .expect("get JSON");
    assert_eq!(fetched["meta"]["diagramName"], "Stack");
    assert_eq!(fetched["model"]["elements"][0]["label"], "Web tier");
}

#[test]
fn cli_config_changes_macro_parameters() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("page.xml");
    fs::write(&doc, "").expect("write page");
    let model_path = tmp.path().join("model.json");
    fs::write(&model_path, sample_model().to_string()).expect("write model");
    let config_path = tmp.path().join("config.json");
    fs::write(
        &config_path,
        json!({ "macro": { "width": "800px", "simpleViewer": true } }).to_string(),
    )
    .expect("write config");

    drawmacro()
        .args([
            "create",
            "--name",
            "Sized",
            "--model",
            model_path.to_string_lossy().as_ref(),
            "--config",
            config_path.to_string_lossy().as_ref(),
            doc.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let body = fs::read_to_string(&doc).expect("read page");
    assert!(body.starts_with("<ac:structured-macro"));
    assert!(body.contains("<ac:parameter ac:name=\"width\">800px</ac:parameter>"));
    assert!(body.contains("<ac:parameter ac:name=\"simpleViewer\">true</ac:parameter>"));
}

#[test]
fn cli_set_overrides_config_keys() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("page.xml");
    fs::write(&doc, "").expect("write page");
    let model_path = tmp.path().join("model.json");
    fs::write(&model_path, sample_model().to_string()).expect("write model");
    let config_path = tmp.path().join("config.json");
    fs::write(
        &config_path,
        json!({ "macro": { "width": "800px" } }).to_string(),
    )
    .expect("write config");

    drawmacro()
        .args([
            "create",
            "--name",
            "Overridden",
            "--model",
            model_path.to_string_lossy().as_ref(),
            "--config",
            config_path.to_string_lossy().as_ref(),
            "--set",
            "macro.width=640px",
            "--set",
            "macro.border=0",
            doc.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let body = fs::read_to_string(&doc).expect("read page");
    assert!(body.contains("<ac:parameter ac:name=\"width\">640px</ac:parameter>"));
    assert!(body.contains("<ac:parameter ac:name=\"border\">0</ac:parameter>"));

    let xml = stdout_of(
        drawmacro()
            .args(["encode", "--xml", "--set", "envelope.host=wiki.example.com"])
            .write_stdin(sample_model().to_string()),
    );
    assert!(xml.starts_with("<mxfile host=\"wiki.example.com\""));
}

#[test]
fn cli_usage_errors_exit_2() {
    drawmacro().assert().code(2);
    drawmacro().args(["decode", "--bogus"]).assert().code(2);
    drawmacro().args(["get", "page.xml"]).assert().code(2);
    drawmacro().args(["encode", "--set", "no-equals"]).assert().code(2);
    drawmacro().args(["encode", "--set", "=1"]).assert().code(2);
}
