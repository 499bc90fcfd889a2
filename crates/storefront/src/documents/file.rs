//! Document store on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use corewell_core::DocumentId;

use super::{Document, DocumentStore, StoreError, StoreResult, is_safe_segment, prepare_create};

/// Document store laid out as `<root>/<collection>/<id>.json`.
///
/// Writes are staged in a temporary file and renamed into place.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: &str, id: &DocumentId) -> StoreResult<PathBuf> {
        for segment in [collection, id.as_str()] {
            if !is_safe_segment(segment) {
                return Err(StoreError::InvalidPath(format!("{collection}/{id}")));
            }
        }
        Ok(self.root.join(collection).join(format!("{id}.json")))
    }

    async fn put(&self, path: &Path, document: Document) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(&Value::Object(document))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn read(&self, collection: &str, id: &DocumentId) -> StoreResult<Option<Document>> {
        let path = self.path_for(collection, id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes)? {
            Value::Object(document) => Ok(Some(document)),
            _ => Err(StoreError::NotAnObject {
                collection: collection.to_owned(),
            }),
        }
    }

    async fn write(
        &self,
        collection: &str,
        id: &DocumentId,
        document: Document,
    ) -> StoreResult<()> {
        let path = self.path_for(collection, id)?;
        self.put(&path, document).await
    }

    async fn create(&self, collection: &str, document: Document) -> StoreResult<DocumentId> {
        let (id, document) = prepare_create(document);
        let path = self.path_for(collection, &id)?;
        self.put(&path, document).await?;
        Ok(id)
    }
}
