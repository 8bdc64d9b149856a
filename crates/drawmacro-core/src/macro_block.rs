//! Storage-format text for a new diagram macro.

use crate::config::CodecConfig;
use crate::locator::{NAME_PARAMETER, PAYLOAD_PARAMETER};
use crate::xml::{escape_attr, escape_text};
use std::fmt::Write as _;

/// Presentation parameters written into every new macro.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDefaults {
    pub kind: String,
    pub content_type: String,
    pub simple_viewer: bool,
    pub width: String,
    pub height: String,
    pub zoom: f64,
    pub border: i64,
}

impl Default for MacroDefaults {
    fn default() -> Self {
        Self::from_config(&CodecConfig::defaults())
    }
}

impl MacroDefaults {
    pub fn from_config(config: &CodecConfig) -> Self {
        let string = |path: &str, fallback: &str| {
            config.get_str(path).unwrap_or(fallback).to_string()
        };
        Self {
            kind: string("macro.kind", "drawio"),
            content_type: string("macro.contentType", "application/vnd.jgraph.mxfile"),
            simple_viewer: config.get_bool("macro.simpleViewer").unwrap_or(false),
            width: string("macro.width", "100%"),
            height: string("macro.height", "auto"),
            zoom: config
                .get_f64("macro.zoom")
                .filter(|z| z.is_finite() && *z > 0.0)
                .unwrap_or(1.0),
            border: config.get_i64("macro.border").unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroBlock {
    pub macro_id: String,
    pub diagram_name: String,
    pub payload: String,
    pub defaults: MacroDefaults,
}

impl MacroBlock {
    /// A block with a freshly generated macro id and default presentation parameters.
    pub fn new(diagram_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            macro_id: Self::generate_macro_id(),
            diagram_name: diagram_name.into(),
            payload: payload.into(),
            defaults: MacroDefaults::default(),
        }
    }

    pub fn with_macro_id(mut self, macro_id: impl Into<String>) -> Self {
        self.macro_id = macro_id.into();
        self
    }

    pub fn with_defaults(mut self, defaults: MacroDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn generate_macro_id() -> String {
        format!("drawio-{}", uuid::Uuid::new_v4())
    }

    pub fn render(&self) -> String {
        let d = &self.defaults;
        let mut out = String::with_capacity(512 + self.payload.len());
        let _ = writeln!(
            out,
            "<ac:structured-macro ac:name=\"{}\" ac:schema-version=\"1\" ac:macro-id=\"{}\">",
            escape_attr(&d.kind),
            escape_attr(&self.macro_id)
        );

        let params: [(&str, String); 8] = [
            (NAME_PARAMETER, self.diagram_name.clone()),
            ("contentType", d.content_type.clone()),
            ("simpleViewer", d.simple_viewer.to_string()),
            ("width", d.width.clone()),
            ("height", d.height.clone()),
            ("zoom", d.zoom.to_string()),
            ("border", d.border.to_string()),
            (PAYLOAD_PARAMETER, self.payload.clone()),
        ];
        for (name, value) in &params {
            let _ = writeln!(
                out,
                "  <ac:parameter ac:name=\"{name}\">{}</ac:parameter>",
                escape_text(value)
            );
        }
        out.push_str("</ac:structured-macro>");
        out
    }
}
