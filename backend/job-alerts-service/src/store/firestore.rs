use async_trait::async_trait;
use firebase_shared::firestore::{FirestoreDocument, Write};
use firebase_shared::FirestoreClient;
use std::sync::Arc;

use super::{
    CollectionPath, Document, DocumentPath, DocumentStore, FieldFilter, StoreError, StoreResult,
    WriteBatch, WriteOp,
};

/// [`DocumentStore`] backed by Cloud Firestore
pub struct FirestoreStore {
    client: Arc<FirestoreClient>,
}

impl FirestoreStore {
    pub fn new(client: Arc<FirestoreClient>) -> Self {
        Self { client }
    }
}

fn into_document(doc: FirestoreDocument) -> StoreResult<Document> {
    Ok(Document {
        path: DocumentPath::parse(&doc.path)?,
        fields: doc.fields,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.client
            .get_document(&path.to_string())
            .await?
            .map(into_document)
            .transpose()
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let parent = collection.parent().map(|p| p.to_string());
        let limit = limit
            .map(u32::try_from)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("query limit out of range: {}", e)))?;

        self.client
            .run_query(parent.as_deref(), collection.id(), filters, limit)
            .await?
            .into_iter()
            .map(into_document)
            .collect()
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let writes: Vec<Write> = batch
            .ops()
            .iter()
            .cloned()
            .map(|op| match op {
                WriteOp::Delete(path) => Write::Delete {
                    path: path.to_string(),
                },
                WriteOp::Create(path, fields) => Write::Create {
                    path: path.to_string(),
                    fields,
                },
            })
            .collect();

        self.client.commit(&writes).await?;
        Ok(())
    }
}
