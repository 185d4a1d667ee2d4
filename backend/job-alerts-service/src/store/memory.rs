use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::{
    CollectionPath, Document, DocumentPath, DocumentStore, FieldFilter, FieldOperator, FieldValue,
    Fields, StoreError, StoreResult, WriteBatch, WriteOp,
};

/// Process-local document store
///
/// Commits take the write lock once, so a batch is applied all or nothing
/// and is never observed half-applied by readers.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<DocumentPath, Fields>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a document
    pub async fn insert(&self, path: DocumentPath, fields: Fields) {
        self.documents.write().await.insert(path, fields);
    }

    pub async fn contains(&self, path: &DocumentPath) -> bool {
        self.documents.read().await.contains_key(path)
    }

    /// Every document whose direct parent is `collection`
    pub async fn documents_in(&self, collection: &CollectionPath) -> Vec<Document> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|(path, _)| &path.parent() == collection)
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect()
    }
}

fn matches(fields: &Fields, filter: &FieldFilter) -> bool {
    let Some(actual) = fields.get(&filter.field) else {
        return false;
    };
    let Some(ordering) = actual.compare(&filter.value) else {
        return false;
    };
    match filter.op {
        FieldOperator::LessThan => ordering == Ordering::Less,
        FieldOperator::LessThanOrEqual => ordering != Ordering::Greater,
        FieldOperator::Equal => ordering == Ordering::Equal,
        FieldOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        FieldOperator::GreaterThan => ordering == Ordering::Greater,
    }
}

fn resolve_server_timestamps(fields: Fields) -> Fields {
    let now = Utc::now();
    fields
        .into_iter()
        .map(|(name, value)| match value {
            FieldValue::ServerTimestamp => (name, FieldValue::Timestamp(now)),
            other => (name, other),
        })
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        Ok(self.documents.read().await.get(path).map(|fields| Document {
            path: path.clone(),
            fields: fields.clone(),
        }))
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let matching = documents
            .iter()
            .filter(|(path, _)| &path.parent() == collection)
            .filter(|(_, fields)| filters.iter().all(|f| matches(fields, f)))
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            });

        Ok(match limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut documents = self.documents.write().await;

        // Validate before touching anything so a rejected batch leaves no trace
        let mut created = BTreeSet::new();
        for op in batch.ops() {
            if let WriteOp::Create(path, _) = op {
                if documents.contains_key(path) || !created.insert(path.clone()) {
                    return Err(StoreError::AlreadyExists(path.to_string()));
                }
            }
        }

        for op in batch.ops().iter().cloned() {
            match op {
                WriteOp::Delete(path) => {
                    documents.remove(&path);
                }
                WriteOp::Create(path, fields) => {
                    documents.insert(path, resolve_server_timestamps(fields));
                }
            }
        }

        Ok(())
    }
}
