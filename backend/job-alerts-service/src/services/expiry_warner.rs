//! Expiring job warnings.
//!
//! Finds jobs whose `expiresAt` falls on the UTC calendar day `days_ahead`
//! days from now and sends each poster one warning. All sends run
//! concurrently; one failing send does not affect the others.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{job_fields, jobs, JobRecord, NotificationCategory};
use crate::services::outcome::HandlerOutcome;
use crate::services::push_sender::PushMessage;
use crate::services::recipients::{deliver, resolve_owner_token, OwnerToken};
use crate::store::{FieldFilter, FieldOperator};
use crate::triggers::{Invocation, TriggerHandler};

pub const WARNING_TITLE: &str = "Job Expiring Soon";
pub const DEFAULT_DAYS_AHEAD: i64 = 2;
pub const MAX_DAYS_AHEAD: i64 = 365;

/// First and last millisecond of the UTC day `days_ahead` days after `now`.
/// `None` when that day is outside the representable calendar.
pub fn warning_window(
    now: DateTime<Utc>,
    days_ahead: i64,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let day = now
        .date_naive()
        .checked_add_signed(Duration::try_days(days_ahead)?)?;
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    let end = start.checked_add_signed(Duration::days(1) - Duration::milliseconds(1))?;
    Some((start, end))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarnReport {
    pub matched: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Sent,
    Skipped,
    Failed,
}

pub struct ExpiryWarner {
    days_ahead: i64,
}

impl Default for ExpiryWarner {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS_AHEAD)
    }
}

impl ExpiryWarner {
    pub fn new(days_ahead: i64) -> Self {
        Self { days_ahead }
    }

    pub fn message_for(&self, job: &JobRecord, token: &str) -> PushMessage {
        let unit = if self.days_ahead == 1 { "day" } else { "days" };
        let body = format!(
            "Your job \"{}\" expires in {} {}.",
            job.title.as_deref().unwrap_or("Untitled"),
            self.days_ahead,
            unit
        );
        PushMessage::to_token(token, WARNING_TITLE, body)
            .with_data("jobId", job.id.as_str())
            .with_data("type", NotificationCategory::ExpirationWarning.as_str())
    }

    pub async fn warn(&self, ctx: &AppContext, now: DateTime<Utc>) -> Result<WarnReport> {
        let (start, end) = warning_window(now, self.days_ahead).ok_or_else(|| {
            AppError::Config(format!("warning day {} days ahead is out of range", self.days_ahead))
        })?;
        let filters = [
            FieldFilter::new(
                job_fields::EXPIRES_AT,
                FieldOperator::GreaterThanOrEqual,
                start,
            ),
            FieldFilter::new(
                job_fields::EXPIRES_AT,
                FieldOperator::LessThanOrEqual,
                end,
            ),
        ];

        let expiring = ctx.store.query(&jobs(), &filters, None).await?;
        if expiring.is_empty() {
            info!(window_start = %start, "No jobs expiring soon.");
            return Ok(WarnReport::default());
        }

        let attempts = join_all(
            expiring
                .iter()
                .map(|doc| self.warn_owner(ctx, JobRecord::from_document(doc))),
        )
        .await;

        let mut report = WarnReport {
            matched: expiring.len(),
            ..WarnReport::default()
        };
        for attempt in attempts {
            match attempt {
                Attempt::Sent => report.sent += 1,
                Attempt::Skipped => report.skipped += 1,
                Attempt::Failed => report.failed += 1,
            }
        }

        info!(
            matched = report.matched,
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            "Expiration warnings dispatched"
        );
        Ok(report)
    }

    async fn warn_owner(&self, ctx: &AppContext, job: JobRecord) -> Attempt {
        let token = match resolve_owner_token(ctx.store.as_ref(), &job).await {
            Ok(OwnerToken::Found { token, .. }) => token,
            Ok(OwnerToken::Missing(_)) => return Attempt::Skipped,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Owner lookup failed");
                return Attempt::Failed;
            }
        };

        match deliver(ctx, NotificationCategory::ExpirationWarning, &self.message_for(&job, &token)).await {
            Ok(_) => Attempt::Sent,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Expiration warning failed");
                Attempt::Failed
            }
        }
    }
}

#[async_trait]
impl TriggerHandler for ExpiryWarner {
    fn name(&self) -> &'static str {
        "expiry_warner"
    }

    async fn handle(&self, ctx: &AppContext, _invocation: &Invocation) -> HandlerOutcome {
        let result = self.warn(ctx, Utc::now()).await.map(|report| {
            HandlerOutcome::Completed(format!(
                "{} expiring, {} warned, {} skipped, {} failed",
                report.matched, report.sent, report.skipped, report.failed
            ))
        });
        HandlerOutcome::from_result(result)
    }
}
