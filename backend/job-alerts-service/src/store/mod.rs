//! Document store seam.
//!
//! Handlers only see [`DocumentStore`]; production wires in
//! [`FirestoreStore`], local runs and tests use [`InMemoryDocumentStore`].

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod firestore;
pub mod memory;

pub use firebase_shared::firestore::{FieldFilter, FieldOperator, Fields, Value as FieldValue};
pub use firestore::FirestoreStore;
pub use memory::InMemoryDocumentStore;

/// Errors from document store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<firebase_shared::FirebaseError> for StoreError {
    fn from(err: firebase_shared::FirebaseError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

fn split_segments(raw: &str) -> StoreResult<Vec<String>> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Err(StoreError::InvalidPath(raw.to_string()));
    }
    let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(raw.to_string()));
    }
    Ok(segments)
}

/// Path to a collection: an odd number of segments (`jobs`,
/// `jobs/{id}/applications`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments))
    }

    /// Top-level collection
    pub fn root(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    pub fn doc(&self, id: &str) -> DocumentPath {
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        DocumentPath(segments)
    }

    /// Collection id, i.e. the last segment
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Owning document for subcollections
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.0.len() > 1 {
            Some(DocumentPath(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Path to a document: an even number of segments (`jobs/{id}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(Vec<String>);

impl DocumentPath {
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments))
    }

    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn collection(&self, name: &str) -> CollectionPath {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        CollectionPath(segments)
    }

    pub fn parent(&self) -> CollectionPath {
        CollectionPath(self.0[..self.0.len() - 1].to_vec())
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn string(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(FieldValue::as_str)
    }
}

/// One write inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Delete(DocumentPath),
    /// Fails the whole batch if the document exists
    Create(DocumentPath, Fields),
}

/// Writes committed together, all or nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete(path));
        self
    }

    pub fn create(&mut self, path: DocumentPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Create(path, fields));
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn delete_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::Delete(_)))
            .count()
    }
}

/// Document database operations consumed by the handlers
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read; `None` when the document does not exist
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Direct children of `collection` matching every filter, at most
    /// `limit` of them when set. No ordering guarantee.
    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>>;

    /// Apply the batch atomically
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Create a document with a generated id. `FieldValue::ServerTimestamp`
    /// fields are resolved by the store.
    async fn add(&self, collection: &CollectionPath, fields: Fields) -> StoreResult<DocumentPath> {
        let path = collection.doc(&uuid::Uuid::new_v4().simple().to_string());
        let mut batch = WriteBatch::new();
        batch.create(path.clone(), fields);
        self.commit(batch).await?;
        Ok(path)
    }
}
