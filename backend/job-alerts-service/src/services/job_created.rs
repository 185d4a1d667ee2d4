/// New Job Broadcast
///
/// On every created job: broadcast a topic notification and write a
/// notification-history record. The two effects run concurrently and
/// neither waits on the other's success.
use async_trait::async_trait;
use tracing::error;

use crate::context::AppContext;
use crate::models::{notifications, JobRecord, NotificationCategory, NotificationHistoryRecord};
use crate::services::outcome::{HandlerOutcome, SkipReason};
use crate::services::push_sender::{DeliveryHints, PushMessage};
use crate::services::recipients::deliver;
use crate::triggers::{Invocation, TriggerHandler};

pub const JOB_DETAIL_SCREEN: &str = "job_detail";
pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

pub struct JobCreatedNotifier {
    topic: String,
}

impl JobCreatedNotifier {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn broadcast_for(&self, job: &JobRecord) -> PushMessage {
        PushMessage::to_topic(&self.topic, job.display_title(), job.summary())
            .with_data("jobId", job.id.as_str())
            .with_data("screen", JOB_DETAIL_SCREEN)
            .with_data("click_action", CLICK_ACTION)
            .with_data("type", NotificationCategory::NewJob.as_str())
            .with_hints(DeliveryHints::wake_devices())
    }

    pub async fn notify(&self, ctx: &AppContext, job: &JobRecord) -> HandlerOutcome {
        let history = NotificationHistoryRecord::for_new_job(job).into_fields();
        let message = self.broadcast_for(job);
        let collection = notifications();

        let (stored, sent) = tokio::join!(
            ctx.store.add(&collection, history),
            deliver(ctx, NotificationCategory::NewJob, &message)
        );

        if let Err(e) = &stored {
            error!(job_id = %job.id, error = %e, "Failed to write notification history");
        }

        match (stored, sent) {
            (Ok(record), Ok(message_id)) => HandlerOutcome::Completed(format!(
                "broadcast {} to topic {}, history {}",
                message_id, self.topic, record
            )),
            (Ok(_), Err(e)) => HandlerOutcome::Failed(format!("broadcast: {}", e)),
            (Err(e), Ok(_)) => HandlerOutcome::Failed(format!("history: {}", e)),
            (Err(store_err), Err(push_err)) => HandlerOutcome::Failed(format!(
                "history: {}; broadcast: {}",
                store_err, push_err
            )),
        }
    }
}

#[async_trait]
impl TriggerHandler for JobCreatedNotifier {
    fn name(&self) -> &'static str {
        "job_created"
    }

    async fn handle(&self, ctx: &AppContext, invocation: &Invocation) -> HandlerOutcome {
        let Some(fields) = invocation.event.document.as_ref() else {
            return HandlerOutcome::Skipped(SkipReason::MissingDocumentData);
        };
        let job_id = match invocation.param("jobId") {
            Ok(id) => id,
            Err(e) => return HandlerOutcome::Failed(e.to_string()),
        };

        let job = JobRecord::from_fields(job_id, fields);
        self.notify(ctx, &job).await
    }
}
