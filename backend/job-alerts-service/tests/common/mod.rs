#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use job_alerts_service::models::{job_path, user_path, FCM_TOKEN_FIELD};
use job_alerts_service::services::{PushDispatcher, PushError, PushMessage, PushTarget};
use job_alerts_service::store::{
    CollectionPath, Document, DocumentPath, DocumentStore, FieldFilter, FieldValue, Fields,
    InMemoryDocumentStore, StoreError, StoreResult, WriteBatch,
};
use job_alerts_service::{AppContext, Config};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Dispatcher that records every message; optionally fails some targets
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<PushMessage>>,
    failing_tokens: HashSet<String>,
    fail_all: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_for(tokens: &[&str]) -> Self {
        Self {
            failing_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Successfully delivered messages
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushDispatcher for RecordingDispatcher {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let rejected = match &message.target {
            PushTarget::Token(token) => self.failing_tokens.contains(token),
            PushTarget::Topic(_) => false,
        };
        if self.fail_all || rejected {
            return Err(PushError::Delivery("push service unavailable".to_string()));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(format!("projects/demo/messages/{}", sent.len()))
    }
}

/// In-memory store that records traffic and can fail a chosen commit
pub struct ObservedStore {
    pub inner: InMemoryDocumentStore,
    commits: Mutex<Vec<WriteBatch>>,
    queries: Mutex<Vec<String>>,
    commit_attempts: Mutex<usize>,
    fail_commit_at: Option<usize>,
}

impl ObservedStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            commits: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            commit_attempts: Mutex::new(0),
            fail_commit_at: None,
        }
    }

    /// Reject the commit with this zero-based attempt index
    pub fn failing_commit(index: usize) -> Self {
        Self {
            fail_commit_at: Some(index),
            ..Self::new()
        }
    }

    /// Successful commits, in order
    pub fn commits(&self) -> Vec<WriteBatch> {
        self.commits.lock().unwrap().clone()
    }

    /// Queried collection paths, in order
    pub fn queries_on(&self, collection: &str) -> usize {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == collection)
            .count()
    }
}

#[async_trait]
impl DocumentStore for ObservedStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        self.inner.get(path).await
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        self.queries.lock().unwrap().push(collection.to_string());
        self.inner.query(collection, filters, limit).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let attempt = {
            let mut attempts = self.commit_attempts.lock().unwrap();
            let attempt = *attempts;
            *attempts += 1;
            attempt
        };
        if self.fail_commit_at == Some(attempt) {
            return Err(StoreError::Backend("deadline exceeded".to_string()));
        }

        self.inner.commit(batch.clone()).await?;
        self.commits.lock().unwrap().push(batch);
        Ok(())
    }
}

pub fn context(store: Arc<dyn DocumentStore>, push: Arc<dyn PushDispatcher>) -> AppContext {
    AppContext::new(store, push, Config::local())
}

pub fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
        .collect()
}

pub fn expiring(mut job: Fields, at: DateTime<Utc>) -> Fields {
    job.insert("expiresAt".to_string(), FieldValue::from(at));
    job
}

pub async fn seed_job(store: &InMemoryDocumentStore, id: &str, job: Fields) {
    store.insert(job_path(id), job).await;
}

pub async fn seed_user(store: &InMemoryDocumentStore, id: &str, token: Option<&str>) {
    let mut user = fields(&[("name", id)]);
    if let Some(token) = token {
        user.insert(FCM_TOKEN_FIELD.to_string(), FieldValue::from(token));
    }
    store.insert(user_path(id), user).await;
}

pub fn clerk_job(poster: &str) -> Fields {
    fields(&[
        ("title", "Clerk"),
        ("company", "Acme"),
        ("district", "Pune"),
        ("state", "MH"),
        ("jobType", "Full-time"),
        ("posterId", poster),
    ])
}
