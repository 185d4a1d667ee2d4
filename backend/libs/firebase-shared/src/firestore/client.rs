use serde_json::json;
use tracing::debug;

use super::types::{structured_query, FieldFilter, FirestoreDocument, RawDocument, RunQueryItem, Write};
use super::value::decode_fields;
use crate::auth::AccessTokenProvider;
use crate::errors::{FirebaseError, FirebaseResult};
use crate::models::ServiceAccountKey;

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Cloud Firestore REST client
///
/// Paths passed to and returned from this client are relative to the
/// database's `documents` root, e.g. `jobs/abc` or `jobs/abc/applications`.
pub struct FirestoreClient {
    pub project_id: String,
    pub database_id: String,
    tokens: AccessTokenProvider,
    base_url: String,
    http_client: reqwest::Client,
}

impl FirestoreClient {
    pub fn new(project_id: String, database_id: String, credentials: ServiceAccountKey) -> Self {
        Self {
            project_id,
            database_id,
            tokens: AccessTokenProvider::service_account(credentials),
            base_url: FIRESTORE_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Client for the local emulator (`FIRESTORE_EMULATOR_HOST`), which
    /// speaks plain HTTP and accepts the fixed `owner` token
    pub fn emulator(project_id: String, database_id: String, host: &str) -> Self {
        Self {
            project_id,
            database_id,
            tokens: AccessTokenProvider::emulator(),
            base_url: format!("http://{}/v1", host.trim_end_matches('/')),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database_id
        )
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.base_url, self.documents_root(), suffix)
    }

    /// Point read. `Ok(None)` when the document does not exist.
    pub async fn get_document(&self, path: &str) -> FirebaseResult<Option<FirestoreDocument>> {
        let access_token = self.tokens.access_token().await?;

        let response = self
            .http_client
            .get(self.url(&format!("/{}", path)))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| FirebaseError::FirestoreRequestError(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let raw: RawDocument = response
                    .json()
                    .await
                    .map_err(|e| FirebaseError::FirestoreRequestError(e.to_string()))?;
                Ok(Some(self.convert(raw)?))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(self.api_error(status, response).await),
        }
    }

    /// Run a structured query over the direct children of `parent`
    /// (`None` for root collections) in collection `collection_id`.
    pub async fn run_query(
        &self,
        parent: Option<&str>,
        collection_id: &str,
        filters: &[FieldFilter],
        limit: Option<u32>,
    ) -> FirebaseResult<Vec<FirestoreDocument>> {
        let access_token = self.tokens.access_token().await?;
        let body = structured_query(collection_id, filters, limit)?;

        let suffix = match parent {
            Some(parent) => format!("/{}:runQuery", parent),
            None => ":runQuery".to_string(),
        };

        let response = self
            .http_client
            .post(self.url(&suffix))
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| FirebaseError::FirestoreRequestError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(self.api_error(status, response).await);
        }

        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .map_err(|e| FirebaseError::FirestoreRequestError(e.to_string()))?;

        let documents = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|raw| self.convert(raw))
            .collect::<FirebaseResult<Vec<_>>>()?;

        debug!(
            collection = %collection_id,
            parent = ?parent,
            returned = documents.len(),
            "Firestore query completed"
        );

        Ok(documents)
    }

    /// Apply all writes atomically
    pub async fn commit(&self, writes: &[Write]) -> FirebaseResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let access_token = self.tokens.access_token().await?;
        let root = self.documents_root();
        let writes = writes
            .iter()
            .map(|w| w.to_json(&root))
            .collect::<FirebaseResult<Vec<_>>>()?;

        let response = self
            .http_client
            .post(self.url(":commit"))
            .bearer_auth(access_token)
            .json(&json!({ "writes": writes }))
            .send()
            .await
            .map_err(|e| FirebaseError::FirestoreRequestError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(self.api_error(status, response).await);
        }

        Ok(())
    }

    fn convert(&self, raw: RawDocument) -> FirebaseResult<FirestoreDocument> {
        let prefix = format!("{}/", self.documents_root());
        let path = raw
            .name
            .strip_prefix(&prefix)
            .unwrap_or(&raw.name)
            .to_string();

        Ok(FirestoreDocument {
            path,
            fields: decode_fields(&raw.fields)?,
        })
    }

    async fn api_error(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> FirebaseError {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        FirebaseError::FirestoreApiError(status.to_string(), error_text)
    }
}
