//! Create, update and read diagram macros in documents held by a [`DocumentStore`].

use crate::store::{DocumentStore, StoreError};
use chrono::Utc;
use drawmacro_core::locator::{self, MacroQuery};
use drawmacro_core::{
    Codec, DecodeStatus, DiagramKind, DiagramModel, DocumentStyle, MacroBlock, MacroDefaults,
    MacroSummary,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Codec(#[from] drawmacro_core::Error),
    #[error("Document store failed: {0}")]
    Store(#[source] StoreError),
}

impl ServiceError {
    /// The codec error, if this is not a store failure.
    pub fn codec(&self) -> Option<&drawmacro_core::Error> {
        match self {
            ServiceError::Codec(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramMeta {
    pub macro_id: String,
    pub diagram_name: Option<String>,
    pub diagram_kind: DiagramKind,
    pub style: DocumentStyle,
    #[serde(flatten)]
    pub status: DecodeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedDiagram {
    pub meta: DiagramMeta,
    pub model: DiagramModel,
}

/// Embeds diagrams in host documents and reads them back.
///
/// Every operation fetches the whole body, edits it as text and writes the whole body back.
/// There is no version check, so concurrent updates to one document can overwrite each other
/// unless the store rejects stale writes. Store failures are returned as-is and never retried.
#[derive(Debug, Clone)]
pub struct DiagramService<S> {
    store: S,
    codec: Codec,
    defaults: MacroDefaults,
}

impl<S: DocumentStore> DiagramService<S> {
    pub fn new(store: S) -> Self {
        Self::with_codec(store, Codec::new())
    }

    /// Uses `codec` for encoding and decoding, and its config for new macro blocks.
    pub fn with_codec(store: S, codec: Codec) -> Self {
        let defaults = MacroDefaults::from_config(codec.config());
        Self {
            store,
            codec,
            defaults,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    fn query(&self, macro_id: &str) -> MacroQuery {
        MacroQuery::new(macro_id).with_kind(self.defaults.kind.clone())
    }

    async fn fetch(&self, document_id: &str) -> Result<String> {
        self.store
            .fetch_body(document_id)
            .await
            .map_err(ServiceError::Store)
    }

    async fn replace(&self, document_id: &str, body: &str) -> Result<()> {
        self.store
            .replace_body(document_id, body)
            .await
            .map_err(ServiceError::Store)
    }

    /// Appends a new diagram macro to the document and returns its macro id.
    pub async fn create(
        &self,
        document_id: &str,
        diagram_name: &str,
        model: &DiagramModel,
    ) -> Result<String> {
        let payload = self.codec.encode_at_sync(model, Utc::now())?;
        let block = MacroBlock::new(diagram_name, payload).with_defaults(self.defaults.clone());

        let mut body = self.fetch(document_id).await?;
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&block.render());
        self.replace(document_id, &body).await?;

        tracing::info!(
            document_id,
            macro_id = %block.macro_id,
            elements = model.elements.len(),
            connectors = model.connectors.len(),
            "created diagram macro"
        );
        Ok(block.macro_id)
    }

    /// Replaces the payload of an existing macro. Nothing else in the document changes.
    pub async fn update(&self, document_id: &str, macro_id: &str, model: &DiagramModel) -> Result<()> {
        let body = self.fetch(document_id).await?;
        let located = locator::locate(&body, &self.query(macro_id))?;
        if located.payload.is_none() {
            return Err(drawmacro_core::Error::PayloadMissing {
                macro_id: located.macro_id,
            }
            .into());
        }

        let payload = self.codec.encode_at_sync(model, Utc::now())?;
        let updated = located.splice_payload(&body, &payload)?;
        self.replace(document_id, &updated).await?;

        tracing::info!(
            document_id,
            macro_id,
            elements = model.elements.len(),
            connectors = model.connectors.len(),
            "updated diagram macro"
        );
        Ok(())
    }

    pub async fn get(&self, document_id: &str, macro_id: &str) -> Result<FetchedDiagram> {
        let body = self.fetch(document_id).await?;
        let located = locator::locate(&body, &self.query(macro_id))?;
        let payload = located.payload_text(&body)?;
        let decoded = self.codec.decode_sync(&payload)?;

        let model = decoded.model;
        Ok(FetchedDiagram {
            meta: DiagramMeta {
                macro_id: located.macro_id,
                diagram_name: located.diagram_name,
                diagram_kind: model.kind,
                style: model.style.clone(),
                status: decoded.status,
            },
            model,
        })
    }

    /// Diagram macros of this service's kind in the document, in document order.
    pub async fn list(&self, document_id: &str) -> Result<Vec<MacroSummary>> {
        let body = self.fetch(document_id).await?;
        Ok(locator::list_macros(&body, &self.defaults.kind))
    }
}
