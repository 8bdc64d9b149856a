use super::network_model;
use crate::*;
use chrono::{TimeZone, Utc};
use futures::executor::block_on;
use serde_json::json;

#[test]
fn codec_async_round_trip() {
    let codec = Codec::new();
    let model = network_model();
    let payload = block_on(codec.encode(&model)).unwrap();
    let decoded = block_on(codec.decode(&payload)).unwrap();
    assert_eq!(decoded.status, DecodeStatus::Complete);
    assert!(decoded.model.structurally_eq(&model));
}

#[test]
fn codec_sync_and_async_agree() {
    let codec = Codec::new();
    let model = network_model();
    assert_eq!(
        codec.encode_sync(&model).unwrap(),
        block_on(codec.encode(&model)).unwrap()
    );
    assert_eq!(
        codec.encode_xml_sync(&model).unwrap(),
        block_on(codec.encode_xml(&model)).unwrap()
    );
    let xml = codec.encode_xml_sync(&model).unwrap();
    assert_eq!(
        codec.decode_xml_sync(&xml).unwrap(),
        block_on(codec.decode_xml(&xml)).unwrap()
    );
}

#[test]
fn codec_decodes_leniently_by_default() {
    let codec = Codec::new();
    let decoded = codec.decode_sync("%%%").unwrap();
    assert!(!decoded.status.is_complete());

    let err = codec
        .decode_with_sync("%%%", DecodeOptions::strict())
        .unwrap_err();
    assert!(err.is_parse_failure());

    let strict = Codec::new().with_decode_options(DecodeOptions::strict());
    assert!(matches!(
        strict.decode_sync("%%%").unwrap_err(),
        Error::InvalidBase64(_)
    ));
}

#[test]
fn codec_config_overrides_merge_over_defaults() {
    let codec = Codec::new().with_config(CodecConfig::from_value(json!({
        "envelope": { "agent": "wiki-bot/2" },
        "encode": { "danglingReferences": "drop" },
        "decode": { "suppressErrors": false }
    })));
    assert_eq!(codec.encode_options().agent, "wiki-bot/2");
    assert_eq!(codec.encode_options().host, "Confluence");
    assert_eq!(codec.encode_options().dangling, DanglingPolicy::Drop);
    assert_eq!(codec.decode_options(), DecodeOptions::strict());
    assert_eq!(codec.config().get_str("macro.kind"), Some("drawio"));
}

#[test]
fn codec_timestamps() {
    let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
    let model = network_model();

    let plain = Codec::new();
    let stamped = decode::decode_base64(&plain.encode_at_sync(&model, at).unwrap()).unwrap();
    assert!(stamped.contains(" modified=\"2026-03-04T05:06:07.000Z\" "));
    assert!(!plain.encode_xml_sync(&model).unwrap().contains("modified="));

    let fixed = Codec::new().with_modified(Some(at));
    assert!(fixed.encode_xml_sync(&model).unwrap().contains("modified="));
    // Reconfiguring keeps the fixed timestamp.
    let fixed = fixed.with_config(CodecConfig::empty_object());
    assert_eq!(fixed.encode_options().modified, Some(at));
}

#[test]
fn codec_dangling_policy_builder() {
    let mut model = network_model();
    model.push_connector(DiagramConnector::new(
        "x",
        "web",
        "nowhere",
        ConnectorKind::Sync,
    ));
    assert!(Codec::new().encode_sync(&model).is_err());
    let payload = Codec::new()
        .with_dangling_policy(DanglingPolicy::Drop)
        .encode_sync(&model)
        .unwrap();
    let decoded = Codec::new().decode_sync(&payload).unwrap();
    assert_eq!(decoded.model.connectors.len(), 1);
}

#[test]
fn config_paths() {
    let mut config = CodecConfig::empty_object();
    config.set_value("macro.width", json!("640px"));
    config.set_value("macro.zoom", json!(2));
    assert_eq!(config.get_str("macro.width"), Some("640px"));
    assert_eq!(config.get_i64("macro.zoom"), Some(2));
    assert_eq!(config.get_f64("macro.zoom"), Some(2.0));
    assert_eq!(config.get_bool("macro.zoom"), None);
    assert_eq!(config.get_str("macro.width.inner"), None);

    config.deep_merge(&json!({ "macro": { "height": "300px" } }));
    assert_eq!(
        config.as_value(),
        &json!({ "macro": { "width": "640px", "zoom": 2, "height": "300px" } })
    );

    config.set_value("macro.zoom.level", json!(3));
    assert_eq!(config.get_i64("macro.zoom.level"), Some(3));
    assert_eq!(config.get_str("macro.width"), Some("640px"));
    config.set_value("macro", json!({ "border": 0 }));
    assert_eq!(config.get_i64("macro.border"), Some(0));
    assert_eq!(config.get_str("macro.height"), Some("300px"));

    assert!(CodecConfig::from_json_str("{ not json").is_err());
}
