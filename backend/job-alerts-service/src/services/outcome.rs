//! Handler results and the boundary adapter that reports them.

use serde::Serialize;
use tracing::{error, info};

use crate::error::Result;
use crate::metrics;

/// Why a handler did nothing. These are expected conditions, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The created document carried no data
    MissingDocumentData,
    /// The application's parent job no longer exists
    ParentJobMissing,
    /// The job has no poster id
    OwnerMissing,
    /// The poster's user record does not exist
    UserMissing,
    /// The poster has no delivery token
    TokenMissing,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingDocumentData => "missing_document_data",
            SkipReason::ParentJobMissing => "parent_job_missing",
            SkipReason::OwnerMissing => "owner_missing",
            SkipReason::UserMissing => "user_missing",
            SkipReason::TokenMissing => "token_missing",
        }
    }
}

/// Result of one handler invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum HandlerOutcome {
    Completed(String),
    Skipped(SkipReason),
    Failed(String),
}

impl HandlerOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            HandlerOutcome::Completed(_) => "completed",
            HandlerOutcome::Skipped(_) => "skipped",
            HandlerOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, HandlerOutcome::Failed(_))
    }

    /// Fold an internal error into `Failed`
    pub fn from_result(result: Result<HandlerOutcome>) -> Self {
        result.unwrap_or_else(|e| HandlerOutcome::Failed(e.to_string()))
    }
}

/// Emit the outcome to logs and metrics. Never fails: whatever happened,
/// the trigger is reported upward as done.
pub fn report(trigger: &str, resource: &str, outcome: &HandlerOutcome) {
    match outcome {
        HandlerOutcome::Completed(detail) => {
            info!(trigger = %trigger, resource = %resource, detail = %detail, "Trigger handled");
        }
        HandlerOutcome::Skipped(reason) => {
            info!(
                trigger = %trigger,
                resource = %resource,
                reason = reason.as_str(),
                "Trigger skipped"
            );
        }
        HandlerOutcome::Failed(cause) => {
            error!(trigger = %trigger, resource = %resource, error = %cause, "Trigger failed");
        }
    }

    metrics::record_handler_outcome(trigger, outcome.label());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::StoreError;

    #[test]
    fn test_from_result_folds_errors() {
        let failed = HandlerOutcome::from_result(Err(AppError::Store(StoreError::Backend(
            "unavailable".to_string(),
        ))));
        assert!(failed.is_failed());
        assert_eq!(failed.label(), "failed");

        let ok = HandlerOutcome::from_result(Ok(HandlerOutcome::Skipped(SkipReason::TokenMissing)));
        assert_eq!(ok, HandlerOutcome::Skipped(SkipReason::TokenMissing));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(HandlerOutcome::Skipped(SkipReason::ParentJobMissing)).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["detail"], "parent_job_missing");

        let json = serde_json::to_value(HandlerOutcome::Completed("sent".to_string())).unwrap();
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn test_report_never_panics() {
        report("job_created", "jobs/j1", &HandlerOutcome::Failed("boom".to_string()));
        report("job_created", "jobs/j1", &HandlerOutcome::Skipped(SkipReason::OwnerMissing));
    }
}
