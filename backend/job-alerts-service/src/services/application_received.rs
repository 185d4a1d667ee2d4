/// Application Received Notification
///
/// Tells a job's poster that someone applied. Every missing link
/// (parent job, poster id, user record, token) is a skip, not an error.
use async_trait::async_trait;
use tracing::info;

use crate::context::AppContext;
use crate::error::Result;
use crate::models::{job_path, JobRecord, NotificationCategory};
use crate::services::job_created::CLICK_ACTION;
use crate::services::outcome::{HandlerOutcome, SkipReason};
use crate::services::push_sender::PushMessage;
use crate::services::recipients::{deliver, resolve_owner_token, OwnerToken};
use crate::triggers::{Invocation, TriggerHandler};

pub const APPLICATION_TITLE: &str = "New Job Application";

#[derive(Debug, Default)]
pub struct ApplicationReceivedNotifier;

impl ApplicationReceivedNotifier {
    pub fn message_for(job: &JobRecord, application_id: &str, token: &str) -> PushMessage {
        let title = job.title.as_deref().unwrap_or("your job");
        PushMessage::to_token(token, APPLICATION_TITLE, format!("Someone applied for {}", title))
            .with_data("jobId", job.id.as_str())
            .with_data("applicationId", application_id)
            .with_data("click_action", CLICK_ACTION)
            .with_data("type", NotificationCategory::Application.as_str())
    }

    pub async fn notify(
        &self,
        ctx: &AppContext,
        job_id: &str,
        application_id: &str,
    ) -> Result<HandlerOutcome> {
        let Some(doc) = ctx.store.get(&job_path(job_id)).await? else {
            info!(job_id = %job_id, application_id = %application_id, "Parent job not found, skipping");
            return Ok(HandlerOutcome::Skipped(SkipReason::ParentJobMissing));
        };
        let job = JobRecord::from_document(&doc);

        let (user_id, token) = match resolve_owner_token(ctx.store.as_ref(), &job).await? {
            OwnerToken::Found { user_id, token } => (user_id, token),
            OwnerToken::Missing(reason) => return Ok(HandlerOutcome::Skipped(reason)),
        };

        let message = Self::message_for(&job, application_id, &token);
        let message_id = deliver(ctx, NotificationCategory::Application, &message).await?;

        Ok(HandlerOutcome::Completed(format!(
            "notified poster {} ({})",
            user_id, message_id
        )))
    }
}

#[async_trait]
impl TriggerHandler for ApplicationReceivedNotifier {
    fn name(&self) -> &'static str {
        "application_received"
    }

    async fn handle(&self, ctx: &AppContext, invocation: &Invocation) -> HandlerOutcome {
        if invocation.event.document.is_none() {
            return HandlerOutcome::Skipped(SkipReason::MissingDocumentData);
        }

        let ids = invocation
            .param("jobId")
            .and_then(|job_id| Ok((job_id, invocation.param("applicationId")?)));
        let (job_id, application_id) = match ids {
            Ok(ids) => ids,
            Err(e) => return HandlerOutcome::Failed(e.to_string()),
        };

        HandlerOutcome::from_result(self.notify(ctx, job_id, application_id).await)
    }
}
