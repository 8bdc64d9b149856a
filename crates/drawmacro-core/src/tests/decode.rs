use super::payload_of;
use crate::*;

/// A diagram as the draw.io editor writes it: wrapper objects, a second layer, a child that
/// precedes its container, legacy route points and an unattached edge.
const EDITOR_ENVELOPE: &str = r#"<mxfile host="app.diagrams.net">
  <diagram id="abc" name="Page-1">
    <mxGraphModel dx="1000" dy="600" grid="0" gridSize="20" pageWidth="1169" pageHeight="827">
      <root>
        <mxCell id="0"/>
        <mxCell id="1" parent="0"/>
        <mxCell id="layer2" parent="0"/>
        <mxCell id="child" value="Inner" style="ellipse;whiteSpace=wrap;html=1;" parent="grp" vertex="1">
          <mxGeometry x="10.4" y="20.6" width="80" height="40" as="geometry"/>
        </mxCell>
        <object id="grp" label="Group" tooltip="t">
          <mxCell style="shape=not-a-real-shape;fillColor=#dae8fc;" parent="layer2" vertex="1">
            <mxGeometry x="100" y="100" width="300" height="200" as="geometry"/>
          </mxCell>
        </object>
        <mxCell id="e1" value="" style="edgeStyle=orthogonalEdgeStyle;endArrow=classic;" parent="1" source="child" target="grp" edge="1">
          <mxGeometry relative="1" as="geometry">
            <mxPoint x="5" y="5" as="sourcePoint"/>
            <mxPoint x="30" y="40"/>
            <mxPoint x="9" y="9" as="targetPoint"/>
          </mxGeometry>
        </mxCell>
        <mxCell id="e2" style="" parent="1" source="child" edge="1">
          <mxGeometry relative="1" as="geometry"/>
        </mxCell>
      </root>
    </mxGraphModel>
  </diagram>
</mxfile>"#;

/// The same small diagram with the element prefix and the root attributes left to the caller.
fn namespaced_envelope(prefix: &str, root_attrs: &str) -> String {
    r#"<{p}mxfile{attrs}>
  <{p}diagram name="er">
    <{p}mxGraphModel>
      <{p}root>
        <{p}mxCell id="0"/>
        <{p}mxCell id="1" parent="0"/>
        <{p}mxCell id="2" value="Customer" style="shape=rectangle;rounded=1;" parent="1" vertex="1">
          <{p}mxGeometry x="0" y="0" width="160" height="90" as="geometry"/>
        </{p}mxCell>
        <{p}mxCell id="3" value="Order" style="shape=rectangle;" parent="1" vertex="1">
          <{p}mxGeometry x="300" y="0" width="160" height="90" as="geometry"/>
        </{p}mxCell>
        <{p}mxCell id="4" value="places" style="edgeStyle=straight;" parent="1" source="2" target="3" edge="1">
          <{p}mxGeometry relative="1" as="geometry"/>
        </{p}mxCell>
      </{p}root>
    </{p}mxGraphModel>
  </{p}diagram>
</{p}mxfile>"#
        .replace("{p}", prefix)
        .replace("{attrs}", root_attrs)
}

#[test]
fn decode_editor_envelope() {
    let decoded = decode::from_payload(&payload_of(EDITOR_ENVELOPE), DecodeOptions::strict()).unwrap();
    assert_eq!(decoded.status, DecodeStatus::Complete);
    let model = decoded.model;

    // `Page-1` is not a diagram kind.
    assert_eq!(model.kind, DiagramKind::Flowchart);
    assert!(!model.style.grid);
    assert_eq!(model.style.grid_size, 20);
    assert_eq!((model.style.page_width, model.style.page_height), (1169, 827));
    assert_eq!(model.style.background, DocumentStyle::default().background);

    assert_eq!(model.elements.len(), 2);
    let child = &model.elements[0];
    assert_eq!(child.id, "element-1");
    assert_eq!(child.shape, ShapeKind::Ellipse);
    assert_eq!(child.label, "Inner");
    assert_eq!(
        child.geometry,
        Geometry {
            x: 10,
            y: 21,
            width: 80,
            height: 40
        }
    );
    assert_eq!(child.parent.as_deref(), Some("element-2"));

    let group = &model.elements[1];
    assert_eq!(group.id, "element-2");
    assert_eq!(group.label, "Group");
    assert_eq!(group.shape, ShapeKind::Rectangle);
    assert_eq!(group.style.fill_color, "#dae8fc");
    // Parented to a layer, which is the root layer as far as the model is concerned.
    assert_eq!(group.parent, None);

    assert_eq!(model.connectors.len(), 1);
    let edge = &model.connectors[0];
    assert_eq!(edge.id, "connector-1");
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("element-1", "element-2"));
    assert_eq!(edge.kind, ConnectorKind::Orthogonal);
    assert_eq!(edge.waypoints, vec![Waypoint { x: 30, y: 40 }]);
    assert_eq!(edge.style, ElementStyle::default());
}

#[test]
fn decode_resolves_edges_written_before_their_endpoints() {
    let xml = r#"<mxfile>
  <diagram name="flowchart">
    <mxGraphModel>
      <root>
        <mxCell id="0"/>
        <mxCell id="1" parent="0"/>
        <mxCell id="late-edge" value="back" style="edgeStyle=dashed;" parent="grp" source="b" target="a" edge="1">
          <mxGeometry relative="1" as="geometry"/>
        </mxCell>
        <mxCell id="a" value="A" style="shape=rectangle;" parent="1" vertex="1">
          <mxGeometry x="0" y="0" width="80" height="40" as="geometry"/>
        </mxCell>
        <mxCell id="b" value="B" style="shape=ellipse;" parent="1" vertex="1">
          <mxGeometry x="200" y="0" width="80" height="40" as="geometry"/>
        </mxCell>
        <mxCell id="grp" value="Group" style="shape=rectangle;" parent="1" vertex="1">
          <mxGeometry x="-20" y="-20" width="400" height="200" as="geometry"/>
        </mxCell>
      </root>
    </mxGraphModel>
  </diagram>
</mxfile>"#;

    let decoded = decode::from_xml(xml, DecodeOptions::strict()).unwrap();
    assert_eq!(decoded.status, DecodeStatus::Complete);
    let model = decoded.model;
    let labels: Vec<&str> = model.elements.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["A", "B", "Group"]);

    assert_eq!(model.connectors.len(), 1);
    let edge = &model.connectors[0];
    assert_eq!(edge.label, "back");
    assert_eq!(edge.kind, ConnectorKind::Dashed);
    assert_eq!((edge.source.as_str(), edge.target.as_str()), ("element-2", "element-1"));
    assert_eq!(edge.parent.as_deref(), Some("element-3"));
}

#[test]
fn decode_unknown_shape_falls_back_to_rectangle() {
    let xml = namespaced_envelope("", "")
        .replace("shape=rectangle;rounded=1;", "shape=not-a-real-shape;");
    let model = decode::from_xml(&xml, DecodeOptions::strict()).unwrap().model;
    assert_eq!(model.elements[0].shape, ShapeKind::Rectangle);
}

#[test]
fn decode_is_namespace_tolerant() {
    let plain = decode::from_xml(&namespaced_envelope("", ""), DecodeOptions::strict()).unwrap();
    let default_ns = decode::from_xml(
        &namespaced_envelope("", r#" xmlns="http://www.jgraph.com/""#),
        DecodeOptions::strict(),
    )
    .unwrap();
    let prefixed = decode::from_xml(
        &namespaced_envelope("mx:", r#" xmlns:mx="http://www.jgraph.com/""#),
        DecodeOptions::strict(),
    )
    .unwrap();
    let undeclared =
        decode::from_xml(&namespaced_envelope("mx:", ""), DecodeOptions::strict()).unwrap();

    assert_eq!(plain.model.kind, DiagramKind::Er);
    assert_eq!(plain.model.elements.len(), 2);
    assert!(plain.model.elements[0].style.rounded);
    assert_eq!(plain.model.connectors[0].label, "places");
    assert_eq!(default_ns, plain);
    assert_eq!(prefixed, plain);
    assert_eq!(undeclared, plain);
}

#[test]
fn decode_keeps_values_that_look_like_declarations() {
    let xml = namespaced_envelope("", r#" xmlns="http://www.jgraph.com/""#)
        .replace(r#"value="Customer""#, r#"value="see xmlns='urn:x' here""#)
        .replace(r#"value="places""#, r#"value="a:b='c'""#);
    let model = decode::from_xml(&xml, DecodeOptions::strict()).unwrap().model;
    assert_eq!(model.elements[0].label, "see xmlns='urn:x' here");
    assert_eq!(model.connectors[0].label, "a:b='c'");
}

#[test]
fn decode_reads_array_points_in_order() {
    let xml = namespaced_envelope("", "").replace(
        r#"<mxGeometry relative="1" as="geometry"/>"#,
        r#"<mxGeometry relative="1" as="geometry"><Array as="points"><mxPoint x="1.5" y="2"/><mxPoint x="-3" y="4"/></Array></mxGeometry>"#,
    );
    let model = decode::from_xml(&xml, DecodeOptions::strict()).unwrap().model;
    assert_eq!(
        model.connectors[0].waypoints,
        vec![Waypoint { x: 2, y: 2 }, Waypoint { x: -3, y: 4 }]
    );
}

#[test]
fn decode_tolerates_wrapped_and_unpadded_payloads() {
    let xml = namespaced_envelope("", "");
    let expected = decode::from_xml(&xml, DecodeOptions::strict()).unwrap();

    let payload = payload_of(&xml);
    let wrapped: String = payload
        .as_bytes()
        .chunks(76)
        .map(|chunk| format!("  {}\r\n", String::from_utf8_lossy(chunk)))
        .collect();
    assert_eq!(
        decode::from_payload(&wrapped, DecodeOptions::strict()).unwrap(),
        expected
    );

    let unpadded = payload.trim_end_matches('=');
    assert_eq!(
        decode::from_payload(unpadded, DecodeOptions::strict()).unwrap(),
        expected
    );
}

#[test]
fn decode_strict_reports_parse_failures() {
    let err = decode::from_payload("!!!not base64!!!", DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::InvalidBase64(_)));
    assert!(err.is_parse_failure());

    let err = decode::from_payload("//4=", DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::InvalidUtf8(_)));

    let err = decode::from_payload(&payload_of("<mxfile><diagram>"), DecodeOptions::strict())
        .unwrap_err();
    assert!(matches!(err, Error::MalformedXml(_)));

    let err = decode::from_xml("<mxfile/>", DecodeOptions::strict()).unwrap_err();
    assert!(matches!(err, Error::MissingNode { node: "diagram" }));

    let err = decode::from_xml(
        r#"<mxfile><diagram name="uml"><mxGraphModel/></diagram></mxfile>"#,
        DecodeOptions::strict(),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Diagram XML has no <root> node");
}

#[test]
fn decode_lenient_tags_unreadable_payloads() {
    let decoded = decode::from_payload("!!!not base64!!!", DecodeOptions::lenient()).unwrap();
    assert_eq!(decoded.model, DiagramModel::default());
    assert!(matches!(
        decoded.status,
        DecodeStatus::Unreadable { ref reason } if reason.starts_with("Diagram payload is not valid base64")
    ));
    assert!(!decoded.status.is_complete());
}

#[test]
fn decode_empty_diagram_is_complete() {
    let xml = encode::to_xml(&DiagramModel::default(), &EncodeOptions::default()).unwrap();
    let decoded = decode::from_xml(&xml, DecodeOptions::lenient()).unwrap();
    assert!(decoded.status.is_complete());
    assert!(decoded.model.is_empty());
}

#[test]
fn decode_options_from_config() {
    let config = CodecConfig::from_json_str(r#"{ "decode": { "suppressErrors": false } }"#).unwrap();
    assert_eq!(DecodeOptions::from_config(&config), DecodeOptions::strict());
    assert_eq!(
        DecodeOptions::from_config(&CodecConfig::defaults()),
        DecodeOptions::lenient()
    );
}
