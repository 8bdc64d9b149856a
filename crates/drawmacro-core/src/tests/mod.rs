use crate::{ConnectorKind, DiagramConnector, DiagramElement, DiagramKind, DiagramModel, ShapeKind};

mod codec;
mod decode;

/// Two servers joined by a routed, labelled connector.
fn network_model() -> DiagramModel {
    let mut model = DiagramModel::new(DiagramKind::Network);
    model
        .push_element(
            DiagramElement::new("web", ShapeKind::Server)
                .with_label("Web")
                .with_geometry(40, 40, 120, 60),
        )
        .push_element(
            DiagramElement::new("db", ShapeKind::Database)
                .with_label("DB")
                .with_geometry(240, 40, 80, 80),
        )
        .push_connector(
            DiagramConnector::new("web-db", "web", "db", ConnectorKind::Orthogonal)
                .with_label("SQL")
                .with_waypoints([(100, 200)]),
        );
    model
}

/// Wraps envelope XML into a transport payload.
fn payload_of(xml: &str) -> String {
    crate::encode::encode_base64(xml)
}
