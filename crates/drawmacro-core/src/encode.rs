//! DiagramModel → mxGraph XML envelope → base64 transport payload.

use crate::config::CodecConfig;
use crate::error::{Error, ReferenceRole, Result};
use crate::model::{DiagramConnector, DiagramElement, DiagramModel};
use crate::style::StyleString;
use crate::xml::{escape_attr_into, first_non_xml_char};
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Reserved id of the mxGraph root cell.
pub const ROOT_CELL_ID: &str = "0";
/// Reserved id of the default layer every top-level cell hangs off.
pub const LAYER_CELL_ID: &str = "1";

const DIAGRAM_ID: &str = "diagram-1";

/// What the encoder does with a connector endpoint or parent that names no element of the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DanglingPolicy {
    /// Fail with [`Error::DanglingReference`]; nothing is emitted.
    #[default]
    Reject,
    /// Drop the connector (or re-parent the element onto the root layer) and log a warning.
    Drop,
}

impl DanglingPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "reject" => Some(Self::Reject),
            "drop" => Some(Self::Drop),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub host: String,
    pub agent: String,
    /// Written as the envelope's `modified` attribute. `None` omits it so output depends on the
    /// model alone.
    pub modified: Option<DateTime<Utc>>,
    pub dangling: DanglingPolicy,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::from_config(&CodecConfig::defaults())
    }
}

impl EncodeOptions {
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            host: config
                .get_str("envelope.host")
                .unwrap_or("Confluence")
                .to_string(),
            agent: config
                .get_str("envelope.agent")
                .unwrap_or(concat!("drawmacro/", env!("CARGO_PKG_VERSION")))
                .to_string(),
            modified: None,
            dangling: config
                .get_str("encode.danglingReferences")
                .and_then(DanglingPolicy::parse)
                .unwrap_or_default(),
        }
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_dangling(mut self, dangling: DanglingPolicy) -> Self {
        self.dangling = dangling;
        self
    }
}

/// Serializes `model` into the mxGraph XML envelope.
pub fn to_xml(model: &DiagramModel, options: &EncodeOptions) -> Result<String> {
    check_text(model, options)?;
    let plan = CellPlan::build(model, options.dangling)?;

    let mut out = String::with_capacity(512 + 256 * (model.elements.len() + plan.edges.len()));
    out.push_str("<mxfile");
    push_attr(&mut out, "host", &options.host);
    if let Some(modified) = options.modified {
        push_attr(
            &mut out,
            "modified",
            &modified.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    push_attr(&mut out, "agent", &options.agent);
    out.push_str(">\n");

    out.push_str("  <diagram");
    push_attr(&mut out, "id", DIAGRAM_ID);
    push_attr(&mut out, "name", model.kind.as_str());
    out.push_str(">\n");

    out.push_str("    <mxGraphModel");
    for (name, value) in model.style.graph_model_attributes() {
        push_attr(&mut out, name, &value);
    }
    out.push_str(">\n");

    out.push_str("      <root>\n");
    let _ = writeln!(out, "        <mxCell id=\"{ROOT_CELL_ID}\"/>");
    let _ = writeln!(
        out,
        "        <mxCell id=\"{LAYER_CELL_ID}\" parent=\"{ROOT_CELL_ID}\"/>"
    );

    for (element, (cell_id, parent_id)) in model.elements.iter().zip(&plan.vertices) {
        write_vertex(&mut out, element, cell_id, parent_id);
    }
    for edge in &plan.edges {
        write_edge(&mut out, edge);
    }

    out.push_str("      </root>\n");
    out.push_str("    </mxGraphModel>\n");
    out.push_str("  </diagram>\n");
    out.push_str("</mxfile>\n");

    tracing::debug!(
        kind = model.kind.as_str(),
        elements = model.elements.len(),
        connectors = plan.edges.len(),
        bytes = out.len(),
        "encoded diagram envelope"
    );
    Ok(out)
}

/// Serializes `model` and base64-encodes the envelope for transport.
pub fn to_payload(model: &DiagramModel, options: &EncodeOptions) -> Result<String> {
    let xml = to_xml(model, options)?;
    Ok(encode_base64(&xml))
}

pub fn encode_base64(xml: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(xml.as_bytes())
}

/// Rejects text the envelope could carry only as unparseable XML.
fn check_text(model: &DiagramModel, options: &EncodeOptions) -> Result<()> {
    let check = |owner: &str, field: &'static str, value: &str| match first_non_xml_char(value) {
        Some(character) => Err(Error::InvalidCharacter {
            owner: owner.to_string(),
            field,
            character,
        }),
        None => Ok(()),
    };

    check("envelope", "host", &options.host)?;
    check("envelope", "agent", &options.agent)?;
    for (name, value) in model.style.graph_model_attributes() {
        check("document", name, &value)?;
    }
    for element in &model.elements {
        check(&element.id, "label", &element.label)?;
        check(&element.id, "style", &element_style(element).to_string())?;
    }
    for connector in &model.connectors {
        check(&connector.id, "label", &connector.label)?;
        check(&connector.id, "style", &connector_style(connector).to_string())?;
    }
    Ok(())
}

struct PlannedEdge<'m> {
    connector: &'m DiagramConnector,
    cell_id: String,
    parent_id: String,
    source_id: String,
    target_id: String,
}

/// Internal cell ids for every emitted node, resolved before any text is written so a rejected
/// reference never yields a partial envelope.
struct CellPlan<'m> {
    /// `(cell id, parent cell id)` per element, in model order.
    vertices: Vec<(String, String)>,
    edges: Vec<PlannedEdge<'m>>,
}

impl<'m> CellPlan<'m> {
    fn build(model: &'m DiagramModel, dangling: DanglingPolicy) -> Result<Self> {
        let mut seen = HashSet::new();
        for element in &model.elements {
            if !seen.insert(element.id.as_str()) {
                return Err(Error::DuplicateElementId {
                    id: element.id.clone(),
                });
            }
        }
        let mut seen = HashSet::new();
        for connector in &model.connectors {
            if !seen.insert(connector.id.as_str()) {
                return Err(Error::DuplicateConnectorId {
                    id: connector.id.clone(),
                });
            }
        }

        // Cell ids 0 and 1 are reserved; elements take 2.. in model order.
        let cell_ids: HashMap<&str, String> = model
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), (i + 2).to_string()))
            .collect();

        let resolve = |owner: &str, role: ReferenceRole, target: &str| -> Result<Option<String>> {
            let found = cell_ids.get(target).filter(|_| {
                // An element cannot contain itself.
                !(role == ReferenceRole::Parent && owner == target)
            });
            match (found, dangling) {
                (Some(id), _) => Ok(Some(id.clone())),
                (None, DanglingPolicy::Reject) => Err(Error::DanglingReference {
                    owner: owner.to_string(),
                    role,
                    target: target.to_string(),
                }),
                (None, DanglingPolicy::Drop) => {
                    tracing::warn!(
                        owner,
                        %role,
                        target,
                        "dropping reference to unknown element"
                    );
                    Ok(None)
                }
            }
        };

        let mut vertices = Vec::with_capacity(model.elements.len());
        for element in &model.elements {
            let parent_id = match element.parent.as_deref() {
                None => LAYER_CELL_ID.to_string(),
                Some(parent) => resolve(&element.id, ReferenceRole::Parent, parent)?
                    .unwrap_or_else(|| LAYER_CELL_ID.to_string()),
            };
            vertices.push((cell_ids[element.id.as_str()].clone(), parent_id));
        }

        let mut next_id = model.elements.len() + 2;
        let mut edges = Vec::with_capacity(model.connectors.len());
        for connector in &model.connectors {
            let source = resolve(&connector.id, ReferenceRole::Source, &connector.source)?;
            let target = resolve(&connector.id, ReferenceRole::Target, &connector.target)?;
            let (Some(source_id), Some(target_id)) = (source, target) else {
                continue;
            };
            let parent_id = match connector.parent.as_deref() {
                None => LAYER_CELL_ID.to_string(),
                Some(parent) => resolve(&connector.id, ReferenceRole::Parent, parent)?
                    .unwrap_or_else(|| LAYER_CELL_ID.to_string()),
            };
            edges.push(PlannedEdge {
                connector,
                cell_id: next_id.to_string(),
                parent_id,
                source_id,
                target_id,
            });
            next_id += 1;
        }

        Ok(Self { vertices, edges })
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    escape_attr_into(out, value);
    out.push('"');
}

fn element_style(element: &DiagramElement) -> StyleString {
    let mut style = StyleString::new();
    style.insert("shape", element.shape.as_str());
    element.style.write_into(&mut style);
    style
}

fn connector_style(connector: &DiagramConnector) -> StyleString {
    let mut style = StyleString::new();
    style.insert("edgeStyle", connector.kind.as_str());
    connector.style.write_into(&mut style);

    let heads = connector.kind.arrow_heads();
    if let Some((arrow, fill)) = heads.start {
        style.insert("startArrow", arrow);
        style.insert("startFill", crate::style::flag(fill));
    }
    match heads.end {
        Some((arrow, fill)) => {
            style.insert("endArrow", arrow);
            style.insert("endFill", crate::style::flag(fill));
        }
        None => style.insert("endArrow", "none"),
    }
    style
}

fn write_vertex(out: &mut String, element: &DiagramElement, cell_id: &str, parent_id: &str) {
    out.push_str("        <mxCell");
    push_attr(out, "id", cell_id);
    push_attr(out, "value", &element.label);
    push_attr(out, "style", &element_style(element).to_string());
    push_attr(out, "parent", parent_id);
    push_attr(out, "vertex", "1");
    out.push_str(">\n");

    let g = element.geometry;
    let _ = writeln!(
        out,
        "          <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/>",
        g.x, g.y, g.width, g.height
    );
    out.push_str("        </mxCell>\n");
}

fn write_edge(out: &mut String, edge: &PlannedEdge<'_>) {
    let connector = edge.connector;
    out.push_str("        <mxCell");
    push_attr(out, "id", &edge.cell_id);
    push_attr(out, "value", &connector.label);
    push_attr(out, "style", &connector_style(connector).to_string());
    push_attr(out, "parent", &edge.parent_id);
    push_attr(out, "source", &edge.source_id);
    push_attr(out, "target", &edge.target_id);
    push_attr(out, "edge", "1");
    out.push_str(">\n");

    if connector.waypoints.is_empty() {
        out.push_str("          <mxGeometry relative=\"1\" as=\"geometry\"/>\n");
    } else {
        out.push_str("          <mxGeometry relative=\"1\" as=\"geometry\">\n");
        out.push_str("            <Array as=\"points\">\n");
        for point in &connector.waypoints {
            let _ = writeln!(
                out,
                "              <mxPoint x=\"{}\" y=\"{}\"/>",
                point.x, point.y
            );
        }
        out.push_str("            </Array>\n");
        out.push_str("          </mxGeometry>\n");
    }
    out.push_str("        </mxCell>\n");
}
