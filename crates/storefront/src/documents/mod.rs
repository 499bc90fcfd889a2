//! Remote document store.
//!
//! # Architecture
//!
//! - Collections of JSON documents addressed by `(collection, id)`
//! - `write` replaces a document wholesale; there is no partial update, no
//!   version check and no conflict detection (last writer wins)
//! - `create` appends a document under a store-assigned id and stamps a
//!   server-side `createdAt` timestamp
//!
//! The wire protocol of a hosted store is out of scope; the trait is the
//! seam. [`MemoryDocumentStore`] backs tests and [`FileDocumentStore`] keeps
//! collections on disk for the CLI.

mod file;
mod memory;

pub use file::FileDocumentStore;
pub use memory::{MemoryDocumentStore, WriteRecord};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use corewell_core::DocumentId;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Field stamped by the store on [`DocumentStore::create`].
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A payload did not serialize to a JSON object.
    #[error("document for {collection} must be a JSON object")]
    NotAnObject {
        /// Target collection.
        collection: String,
    },

    /// Collection or document id cannot be used as a storage name.
    #[error("invalid document path: {0:?}")]
    InvalidPath(String),

    /// The store could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Remote per-identity durable document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    async fn read(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>>;

    /// Write a document, replacing any existing one.
    async fn write(&self, collection: &str, id: &DocumentId, document: Document)
    -> StoreResult<()>;

    /// Append a document under a store-assigned id.
    ///
    /// Implementations stamp [`CREATED_AT_FIELD`] with the store's clock.
    async fn create(&self, collection: &str, document: Document) -> StoreResult<DocumentId>;
}

/// Read and decode a typed document.
///
/// # Errors
///
/// Returns `StoreError` if the read fails or the document does not decode.
pub async fn read_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &DocumentId,
) -> StoreResult<Option<T>> {
    match store.read(collection, id).await? {
        Some(document) => Ok(Some(serde_json::from_value(Value::Object(document))?)),
        None => Ok(None),
    }
}

/// Encode and write a typed document, replacing any existing one.
///
/// # Errors
///
/// Returns `StoreError` if encoding or the write fails.
pub async fn write_as<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &DocumentId,
    value: &T,
) -> StoreResult<()> {
    let document = to_document(collection, value)?;
    store.write(collection, id, document).await
}

/// Encode and append a typed document under a store-assigned id.
///
/// # Errors
///
/// Returns `StoreError` if encoding or the create fails.
pub async fn create_as<T: Serialize + Sync>(
    store: &dyn DocumentStore,
    collection: &str,
    value: &T,
) -> StoreResult<DocumentId> {
    let document = to_document(collection, value)?;
    store.create(collection, document).await
}

/// Encode a value as a document (JSON object).
///
/// # Errors
///
/// Returns `StoreError::NotAnObject` if `value` is not a JSON object.
pub fn to_document<T: Serialize>(collection: &str, value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(document) => Ok(document),
        _ => Err(StoreError::NotAnObject {
            collection: collection.to_owned(),
        }),
    }
}

/// Generate an auto id and stamp the creation timestamp.
fn prepare_create(mut document: Document) -> (DocumentId, Document) {
    let id = DocumentId::new(uuid::Uuid::new_v4().simple().to_string());
    document.insert(
        CREATED_AT_FIELD.to_owned(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    (id, document)
}

/// Collection names and ids become path components, so restrict them.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_document_rejects_non_objects() {
        assert!(matches!(
            to_document("carts", &vec![1, 2]),
            Err(StoreError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_prepare_create_stamps_timestamp() {
        let (id, document) = prepare_create(Document::new());
        assert_eq!(id.as_str().len(), 32);
        let stamp = document[CREATED_AT_FIELD].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_safe_segments() {
        assert!(is_safe_segment("stockistRequests"));
        assert!(is_safe_segment("buyer@corewell.co.za"));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
        assert!(!is_safe_segment(""));
    }
}
