#![forbid(unsafe_code)]

//! `drawmacro` creates, updates and reads draw.io diagrams embedded as macros in Confluence
//! storage-format documents.
//!
//! The codec, the macro locator and the model types come from `drawmacro-core` and are
//! re-exported here. This crate adds [`service::DiagramService`], which runs them against a
//! [`store::DocumentStore`].

pub use drawmacro_core::*;

pub mod service;
pub mod store;

pub use service::{DiagramMeta, DiagramService, FetchedDiagram, ServiceError};
pub use store::{DocumentStore, MemoryStore, StoreError};
