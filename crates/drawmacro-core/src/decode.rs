//! Base64 transport payload → mxGraph XML envelope → DiagramModel.

use crate::config::CodecConfig;
use crate::error::{Error, Result};
use crate::model::{DiagramConnector, DiagramElement, DiagramModel, Geometry, Waypoint};
use crate::namespace;
use crate::style::{DocumentStyle, ElementStyle, StyleString, attr_flag, attr_int};
use crate::vocabulary::{ConnectorKind, DiagramKind, ShapeKind};
use crate::encode::{LAYER_CELL_ID, ROOT_CELL_ID};
use base64::Engine as _;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use roxmltree::Node;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Standard alphabet; tolerates payloads that lost their `=` padding in transit.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// When true, an unreadable payload yields an empty model tagged
    /// [`DecodeStatus::Unreadable`] instead of an error.
    pub suppress_errors: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self {
            suppress_errors: false,
        }
    }

    pub fn lenient() -> Self {
        Self {
            suppress_errors: true,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            suppress_errors: config.get_bool("decode.suppressErrors").unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DecodeStatus {
    Complete,
    /// The payload could not be read; the accompanying model is the empty default.
    Unreadable { reason: String },
}

impl DecodeStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeStatus::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedDiagram {
    pub model: DiagramModel,
    #[serde(flatten)]
    pub status: DecodeStatus,
}

impl DecodedDiagram {
    fn complete(model: DiagramModel) -> Self {
        Self {
            model,
            status: DecodeStatus::Complete,
        }
    }
}

/// Decodes the base64 transport payload into envelope XML text.
pub fn decode_base64(payload: &str) -> Result<String> {
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let bytes = PAYLOAD_ENGINE.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

/// Decodes a transport payload.
pub fn from_payload(payload: &str, options: DecodeOptions) -> Result<DecodedDiagram> {
    let parsed = decode_base64(payload).and_then(|xml| parse_envelope(&xml));
    finish(parsed, options)
}

/// Decodes envelope XML that is already in text form.
pub fn from_xml(xml: &str, options: DecodeOptions) -> Result<DecodedDiagram> {
    finish(parse_envelope(xml), options)
}

fn finish(parsed: Result<DiagramModel>, options: DecodeOptions) -> Result<DecodedDiagram> {
    match parsed {
        Ok(model) => Ok(DecodedDiagram::complete(model)),
        Err(err) if options.suppress_errors && err.is_parse_failure() => {
            tracing::warn!(error = %err, "diagram payload unreadable; using empty model");
            Ok(DecodedDiagram {
                model: DiagramModel::default(),
                status: DecodeStatus::Unreadable {
                    reason: err.to_string(),
                },
            })
        }
        Err(err) => Err(err),
    }
}

fn parse_envelope(xml: &str) -> Result<DiagramModel> {
    let normalized = namespace::normalize(xml);
    let doc = roxmltree::Document::parse(&normalized)?;

    let diagram = doc
        .descendants()
        .find(|n| is_named(n, "diagram"))
        .ok_or(Error::MissingNode { node: "diagram" })?;
    let graph_model = child_named(diagram, "mxGraphModel").ok_or(Error::MissingNode {
        node: "mxGraphModel",
    })?;
    let root = child_named(graph_model, "root").ok_or(Error::MissingNode { node: "root" })?;

    let kind = DiagramKind::parse(attr(diagram, "name").unwrap_or_default());
    let style = DocumentStyle::from_graph_model(|name| attr(graph_model, name));

    let cells: Vec<RawCell<'_, '_>> = root
        .children()
        .filter(Node::is_element)
        .filter_map(RawCell::read)
        .collect();

    let layers: HashSet<&str> = cells
        .iter()
        .filter(|c| c.is_reserved())
        .map(|c| c.id)
        .collect();

    // Pass one: vertices. Parents are resolved once every vertex has a caller id, since
    // children may precede their container.
    let mut caller_ids: HashMap<&str, String> = HashMap::new();
    let mut elements = Vec::new();
    let mut element_parents = Vec::new();
    for cell in cells.iter().filter(|c| !c.is_reserved() && !c.edge) {
        let id = format!("element-{}", elements.len() + 1);
        caller_ids.insert(cell.id, id.clone());
        let style = StyleString::parse(cell.style);
        let shape = style
            .get("shape")
            .or_else(|| style.named())
            .map(ShapeKind::parse)
            .unwrap_or_default();
        elements.push(DiagramElement {
            id,
            shape,
            geometry: cell.geometry(),
            label: cell.label.to_string(),
            style: ElementStyle::from_style(&style),
            parent: None,
        });
        element_parents.push((cell.id, cell.parent));
    }

    let resolve_parent = |owner: &str, parent: Option<&str>| -> Option<String> {
        let parent = parent?;
        if parent == owner || layers.contains(parent) {
            return None;
        }
        let resolved = caller_ids.get(parent).cloned();
        if resolved.is_none() {
            tracing::warn!(cell = owner, parent, "unknown parent cell; using root layer");
        }
        resolved
    };
    for (element, (cell_id, parent)) in elements.iter_mut().zip(element_parents) {
        element.parent = resolve_parent(cell_id, parent);
    }

    // Pass two: edges.
    let mut connectors = Vec::new();
    for cell in cells.iter().filter(|c| !c.is_reserved() && c.edge) {
        let source = cell.source.and_then(|id| caller_ids.get(id));
        let target = cell.target.and_then(|id| caller_ids.get(id));
        let (Some(source), Some(target)) = (source, target) else {
            tracing::warn!(
                cell = cell.id,
                source = cell.source,
                target = cell.target,
                "dropping edge without resolvable endpoints"
            );
            continue;
        };
        let style = StyleString::parse(cell.style);
        connectors.push(DiagramConnector {
            id: format!("connector-{}", connectors.len() + 1),
            source: source.clone(),
            target: target.clone(),
            kind: style
                .get("edgeStyle")
                .map(ConnectorKind::parse)
                .unwrap_or_default(),
            label: cell.label.to_string(),
            style: ElementStyle::from_style(&style),
            waypoints: cell.waypoints(),
            parent: resolve_parent(cell.id, cell.parent),
        });
    }

    tracing::debug!(
        kind = kind.as_str(),
        elements = elements.len(),
        connectors = connectors.len(),
        "decoded diagram envelope"
    );
    Ok(DiagramModel {
        kind,
        style,
        elements,
        connectors,
    })
}

/// One child of `<root>`: a bare `mxCell`, or an `object`/`UserObject` wrapper whose id and
/// label live on the wrapper.
struct RawCell<'a, 'input> {
    id: &'a str,
    label: &'a str,
    style: &'a str,
    parent: Option<&'a str>,
    source: Option<&'a str>,
    target: Option<&'a str>,
    vertex: bool,
    edge: bool,
    cell: Node<'a, 'input>,
}

impl<'a, 'input> RawCell<'a, 'input> {
    fn read(node: Node<'a, 'input>) -> Option<Self> {
        let (outer, cell) = match node.tag_name().name() {
            "mxCell" => (node, node),
            "object" | "UserObject" => (node, child_named(node, "mxCell")?),
            _ => return None,
        };
        let label = if outer == cell {
            attr(cell, "value")
        } else {
            attr(outer, "label").or_else(|| attr(outer, "value"))
        };
        Some(Self {
            id: attr(outer, "id")?,
            label: label.unwrap_or_default(),
            style: attr(cell, "style").unwrap_or_default(),
            parent: attr(cell, "parent"),
            source: attr(cell, "source"),
            target: attr(cell, "target"),
            vertex: attr_flag(attr(cell, "vertex")).unwrap_or(false),
            edge: attr_flag(attr(cell, "edge")).unwrap_or(false),
            cell,
        })
    }

    /// The graph root, the default layer, and any other layer cell.
    fn is_reserved(&self) -> bool {
        self.id == ROOT_CELL_ID
            || self.id == LAYER_CELL_ID
            || self.parent == Some(ROOT_CELL_ID)
            || (self.parent.is_none() && !self.vertex && !self.edge)
    }

    fn geometry(&self) -> Geometry {
        let mut geometry = Geometry::default();
        let Some(node) = child_named(self.cell, "mxGeometry") else {
            return geometry;
        };
        geometry.x = attr_int(attr(node, "x")).unwrap_or(0);
        geometry.y = attr_int(attr(node, "y")).unwrap_or(0);
        if let Some(width) = attr_int(attr(node, "width")) {
            geometry.width = width;
        }
        if let Some(height) = attr_int(attr(node, "height")) {
            geometry.height = height;
        }
        geometry
    }

    fn waypoints(&self) -> Vec<Waypoint> {
        let Some(node) = child_named(self.cell, "mxGeometry") else {
            return Vec::new();
        };
        let point = |p: Node<'_, '_>| Waypoint {
            x: attr_int(attr(p, "x")).unwrap_or(0),
            y: attr_int(attr(p, "y")).unwrap_or(0),
        };

        let array = node
            .children()
            .find(|n| is_named(n, "Array") && attr(*n, "as") == Some("points"));
        if let Some(array) = array {
            return array
                .children()
                .filter(|n| is_named(n, "mxPoint"))
                .map(point)
                .collect();
        }

        // Older payloads list route points as bare children of the geometry.
        node.children()
            .filter(|n| is_named(n, "mxPoint"))
            .filter(|n| !matches!(attr(*n, "as"), Some("sourcePoint" | "targetPoint")))
            .map(point)
            .collect()
    }
}

fn is_named(node: &Node<'_, '_>, local: &str) -> bool {
    node.is_element() && node.tag_name().name() == local
}

fn child_named<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_named(n, local))
}

/// Attribute lookup by local name, ignoring any namespace prefix.
fn attr<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == local)
        .map(|a| a.value())
}
