//! The document store collaborator: the only I/O [`DiagramService`](crate::service::DiagramService)
//! performs goes through this trait.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// Error type of a store implementation, passed through the service unchanged.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

pub trait DocumentStore: Send + Sync {
    /// Returns the current storage-format body of `document_id`.
    fn fetch_body(
        &self,
        document_id: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Replaces the whole body of `document_id`.
    fn replace_body(
        &self,
        document_id: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, thiserror::Error)]
#[error("Document `{0}` does not exist")]
pub struct UnknownDocument(pub String);

/// Keeps document bodies in memory. Fetching an unknown document fails; replacing one creates it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bodies: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, document_id: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(document_id, body);
        self
    }

    pub fn insert(&self, document_id: impl Into<String>, body: impl Into<String>) {
        self.lock().insert(document_id.into(), body.into());
    }

    pub fn body(&self, document_id: &str) -> Option<String> {
        self.lock().get(document_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a map entry half-written.
        self.bodies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryStore {
    async fn fetch_body(&self, document_id: &str) -> Result<String, StoreError> {
        self.body(document_id)
            .ok_or_else(|| UnknownDocument(document_id.to_string()).into())
    }

    async fn replace_body(&self, document_id: &str, body: &str) -> Result<(), StoreError> {
        self.insert(document_id, body);
        Ok(())
    }
}
