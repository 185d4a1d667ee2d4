//! Expired job cleanup.
//!
//! Repeatedly queries up to `batch_size` jobs whose `expiresAt` is at or
//! before the sweep's start time and deletes each one in its own atomic
//! batch together with all of its applications. The same filter is reused
//! on every pass: committed deletions shrink the result set, so an empty
//! query ends the loop.
//!
//! A failed commit aborts the run. Batches already committed stay deleted
//! and the next scheduled run picks up whatever is left.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::error::Result;
use crate::metrics;
use crate::models::{job_fields, jobs, APPLICATIONS_COLLECTION};
use crate::services::outcome::HandlerOutcome;
use crate::store::{DocumentStore, FieldFilter, FieldOperator, WriteBatch};
use crate::triggers::{Invocation, TriggerHandler};

/// Writes a single Firestore commit accepts
pub const MAX_BATCH_WRITES: usize = 500;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Totals of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub jobs_deleted: usize,
    pub applications_deleted: usize,
    /// Committed batches, one per job
    pub batches: usize,
    /// Expired-job queries issued, including the final empty one
    pub queries: usize,
}

pub struct ExpirySweeper {
    batch_size: usize,
}

impl Default for ExpirySweeper {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl ExpirySweeper {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Delete every job that expired at or before `now`, with its applications
    pub async fn sweep(&self, store: &dyn DocumentStore, now: DateTime<Utc>) -> Result<SweepReport> {
        let filters = [FieldFilter::new(
            job_fields::EXPIRES_AT,
            FieldOperator::LessThanOrEqual,
            now,
        )];
        let mut report = SweepReport::default();

        loop {
            let expired = store
                .query(&jobs(), &filters, Some(self.batch_size))
                .await?;
            report.queries += 1;

            if expired.is_empty() {
                break;
            }
            debug!(count = expired.len(), pass = report.queries, "Expired jobs found");

            for job in &expired {
                let applications = store
                    .query(&job.path.collection(APPLICATIONS_COLLECTION), &[], None)
                    .await?;

                let mut batch = WriteBatch::new();
                for application in &applications {
                    batch.delete(application.path.clone());
                }
                batch.delete(job.path.clone());

                if batch.len() > MAX_BATCH_WRITES {
                    warn!(
                        job_id = %job.id(),
                        writes = batch.len(),
                        limit = MAX_BATCH_WRITES,
                        "Batch exceeds commit write limit"
                    );
                }

                if let Err(e) = store.commit(batch).await {
                    error!(
                        job_id = %job.id(),
                        jobs_deleted = report.jobs_deleted,
                        error = %e,
                        "Sweep aborted on failed commit"
                    );
                    return Err(e.into());
                }

                metrics::record_swept(1, applications.len());
                report.jobs_deleted += 1;
                report.applications_deleted += applications.len();
                report.batches += 1;
            }
        }

        info!(
            applications_deleted = report.applications_deleted,
            batches = report.batches,
            "Deleted {} expired jobs.",
            report.jobs_deleted
        );
        Ok(report)
    }
}

#[async_trait]
impl TriggerHandler for ExpirySweeper {
    fn name(&self) -> &'static str {
        "expiry_sweeper"
    }

    async fn handle(&self, ctx: &AppContext, _invocation: &Invocation) -> HandlerOutcome {
        let result = self.sweep(ctx.store.as_ref(), Utc::now()).await.map(|report| {
            HandlerOutcome::Completed(format!(
                "deleted {} jobs and {} applications",
                report.jobs_deleted, report.applications_deleted
            ))
        });
        HandlerOutcome::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{applications_of, job_path};
    use crate::store::{FieldValue, Fields, InMemoryDocumentStore};
    use chrono::Duration;

    fn expiring_at(at: DateTime<Utc>) -> Fields {
        let mut fields = Fields::new();
        fields.insert(job_fields::EXPIRES_AT.to_string(), FieldValue::from(at));
        fields
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_jobs() {
        let now = Utc::now();
        let store = InMemoryDocumentStore::new();
        store.insert(job_path("old"), expiring_at(now - Duration::hours(1))).await;
        store.insert(job_path("edge"), expiring_at(now)).await;
        store.insert(job_path("live"), expiring_at(now + Duration::hours(1))).await;
        store
            .insert(applications_of("old").doc("a1"), Fields::new())
            .await;

        let report = ExpirySweeper::default().sweep(&store, now).await.unwrap();

        assert_eq!(report.jobs_deleted, 2);
        assert_eq!(report.applications_deleted, 1);
        assert!(store.contains(&job_path("live")).await);
        assert!(!store.contains(&job_path("edge")).await);
        assert!(!store.contains(&applications_of("old").doc("a1")).await);
    }

    #[tokio::test]
    async fn test_jobs_without_expiry_are_untouched() {
        let store = InMemoryDocumentStore::new();
        store.insert(job_path("no-expiry"), Fields::new()).await;

        let report = ExpirySweeper::new(10).sweep(&store, Utc::now()).await.unwrap();
        assert_eq!(report.jobs_deleted, 0);
        assert_eq!(report.queries, 1);
        assert!(store.contains(&job_path("no-expiry")).await);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        assert_eq!(ExpirySweeper::new(0).batch_size(), 1);
    }
}
