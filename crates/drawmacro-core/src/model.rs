//! The in-memory diagram entity graph.

use crate::style::{DocumentStyle, ElementStyle};
use crate::vocabulary::{ConnectorKind, DiagramKind, ShapeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 120,
            height: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramElement {
    pub id: String,
    #[serde(default, alias = "type")]
    pub shape: ShapeKind,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub style: ElementStyle,
    /// Containing element; `None` places the element on the root layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl DiagramElement {
    pub fn new(id: impl Into<String>, shape: ShapeKind) -> Self {
        Self {
            id: id.into(),
            shape,
            geometry: Geometry::default(),
            label: String::new(),
            style: ElementStyle::default(),
            parent: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_geometry(mut self, x: i64, y: i64, width: i64, height: i64) -> Self {
        self.geometry = Geometry {
            x,
            y,
            width,
            height,
        };
        self
    }

    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramConnector {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "type")]
    pub kind: ConnectorKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub style: ElementStyle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl DiagramConnector {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: ConnectorKind,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            label: String::new(),
            style: ElementStyle::default(),
            waypoints: Vec::new(),
            parent: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_style(mut self, style: ElementStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_waypoints(mut self, points: impl IntoIterator<Item = (i64, i64)>) -> Self {
        self.waypoints = points.into_iter().map(|(x, y)| Waypoint { x, y }).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramModel {
    #[serde(default, rename = "diagramType")]
    pub kind: DiagramKind,
    #[serde(default)]
    pub style: DocumentStyle,
    #[serde(default)]
    pub elements: Vec<DiagramElement>,
    #[serde(default, rename = "connections")]
    pub connectors: Vec<DiagramConnector>,
}

impl DiagramModel {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: DocumentStyle) -> Self {
        self.style = style;
        self
    }

    pub fn push_element(&mut self, element: DiagramElement) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn push_connector(&mut self, connector: DiagramConnector) -> &mut Self {
        self.connectors.push(connector);
        self
    }

    pub fn element(&self, id: &str) -> Option<&DiagramElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.connectors.is_empty()
    }

    /// Compares two models while treating element/connector ids as opaque: references
    /// (connector endpoints and parents) are compared by the position of the element they
    /// point at. Everything else is compared by value.
    ///
    /// This is the equality that survives an encode/decode cycle, since the decoder assigns
    /// fresh caller-facing ids.
    pub fn structurally_eq(&self, other: &DiagramModel) -> bool {
        if self.kind != other.kind
            || self.style != other.style
            || self.elements.len() != other.elements.len()
            || self.connectors.len() != other.connectors.len()
        {
            return false;
        }

        let lhs_index = self.element_positions();
        let rhs_index = other.element_positions();
        let position = |index: &HashMap<&str, usize>, id: Option<&str>| -> Option<Option<usize>> {
            match id {
                None => Some(None),
                Some(id) => index.get(id).copied().map(Some),
            }
        };

        for (a, b) in self.elements.iter().zip(&other.elements) {
            if a.shape != b.shape
                || a.geometry != b.geometry
                || a.label != b.label
                || a.style != b.style
            {
                return false;
            }
            let pa = position(&lhs_index, a.parent.as_deref());
            let pb = position(&rhs_index, b.parent.as_deref());
            if pa.is_none() || pa != pb {
                return false;
            }
        }

        for (a, b) in self.connectors.iter().zip(&other.connectors) {
            if a.kind != b.kind
                || a.label != b.label
                || a.style != b.style
                || a.waypoints != b.waypoints
            {
                return false;
            }
            let ends = [
                (Some(a.source.as_str()), Some(b.source.as_str())),
                (Some(a.target.as_str()), Some(b.target.as_str())),
                (a.parent.as_deref(), b.parent.as_deref()),
            ];
            for (ea, eb) in ends {
                let pa = position(&lhs_index, ea);
                let pb = position(&rhs_index, eb);
                if pa.is_none() || pa != pb {
                    return false;
                }
            }
        }
        true
    }

    fn element_positions(&self) -> HashMap<&str, usize> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.as_str(), i))
            .collect()
    }
}
