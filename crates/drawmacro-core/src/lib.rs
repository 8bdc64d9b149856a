#![forbid(unsafe_code)]

//! draw.io diagram codec + Confluence storage-format macro locator (headless).
//!
//! Design goals:
//! - lossless `DiagramModel` ⇄ mxGraph XML ⇄ base64 round trips
//! - deterministic output for a given model and options
//! - runtime-agnostic async APIs (no specific executor required)

pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod locator;
pub mod macro_block;
pub mod model;
mod namespace;
pub mod style;
pub mod vocabulary;
mod xml;

pub use config::CodecConfig;
pub use decode::{DecodeOptions, DecodeStatus, DecodedDiagram};
pub use encode::{DanglingPolicy, EncodeOptions};
pub use error::{Error, ReferenceRole, Result};
pub use locator::{LocatedMacro, MacroQuery, MacroSummary, MatchStrategy, PayloadSlot};
pub use macro_block::{MacroBlock, MacroDefaults};
pub use model::{DiagramConnector, DiagramElement, DiagramModel, Geometry, Waypoint};
pub use style::{DocumentStyle, ElementStyle, FontStyle, StyleString, TextAlign};
pub use vocabulary::{ConnectorKind, DiagramKind, ShapeKind};

use chrono::{DateTime, Utc};

/// Configured entry point bundling encoder and decoder options.
#[derive(Debug, Clone)]
pub struct Codec {
    config: CodecConfig,
    encode: EncodeOptions,
    decode: DecodeOptions,
}

impl Default for Codec {
    fn default() -> Self {
        let config = CodecConfig::defaults();
        Self {
            encode: EncodeOptions::from_config(&config),
            decode: DecodeOptions::from_config(&config),
            config,
        }
    }
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `config` over the built-in defaults and re-derives every option from the result.
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config.deep_merge(config.as_value());
        let modified = self.encode.modified;
        self.encode = EncodeOptions::from_config(&self.config).with_modified(modified);
        self.decode = DecodeOptions::from_config(&self.config);
        self
    }

    /// Stamps every encoded envelope with `modified`. `None` (the default) omits the attribute.
    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.encode.modified = modified;
        self
    }

    pub fn with_dangling_policy(mut self, dangling: DanglingPolicy) -> Self {
        self.encode.dangling = dangling;
        self
    }

    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode = options;
        self
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn encode_options(&self) -> &EncodeOptions {
        &self.encode
    }

    pub fn decode_options(&self) -> DecodeOptions {
        self.decode
    }

    /// Synchronous variant of [`Codec::encode`]: model → base64 payload.
    ///
    /// The work is CPU-bound and does not perform I/O.
    pub fn encode_sync(&self, model: &DiagramModel) -> Result<String> {
        encode::to_payload(model, &self.encode)
    }

    /// Like [`Codec::encode_sync`], stamping the envelope with `modified` for this call only.
    pub fn encode_at_sync(&self, model: &DiagramModel, modified: DateTime<Utc>) -> Result<String> {
        let options = self.encode.clone().with_modified(Some(modified));
        encode::to_payload(model, &options)
    }

    /// Model → envelope XML, without the transport encoding.
    pub fn encode_xml_sync(&self, model: &DiagramModel) -> Result<String> {
        encode::to_xml(model, &self.encode)
    }

    /// Synchronous variant of [`Codec::decode`]: base64 payload → model.
    pub fn decode_sync(&self, payload: &str) -> Result<DecodedDiagram> {
        decode::from_payload(payload, self.decode)
    }

    pub fn decode_with_sync(&self, payload: &str, options: DecodeOptions) -> Result<DecodedDiagram> {
        decode::from_payload(payload, options)
    }

    pub fn decode_xml_sync(&self, xml: &str) -> Result<DecodedDiagram> {
        decode::from_xml(xml, self.decode)
    }

    pub async fn encode(&self, model: &DiagramModel) -> Result<String> {
        self.encode_sync(model)
    }

    pub async fn encode_xml(&self, model: &DiagramModel) -> Result<String> {
        self.encode_xml_sync(model)
    }

    pub async fn decode(&self, payload: &str) -> Result<DecodedDiagram> {
        self.decode_sync(payload)
    }

    pub async fn decode_xml(&self, xml: &str) -> Result<DecodedDiagram> {
        self.decode_xml_sync(xml)
    }
}

#[cfg(test)]
mod tests;
