//! Owner token lookup and tracked delivery shared by the single-recipient
//! notifiers.

use tracing::{info, warn};

use crate::context::AppContext;
use crate::metrics;
use crate::models::{user_path, JobRecord, NotificationCategory, UserRecord};
use crate::services::outcome::SkipReason;
use crate::services::push_sender::{PushError, PushMessage};
use crate::store::{DocumentStore, StoreResult};

/// Result of resolving a job owner's delivery token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerToken {
    Found { user_id: String, token: String },
    Missing(SkipReason),
}

/// Resolve `job.posterId -> users/{id}.fcmToken`. Every missing link is an
/// expected skip, logged at info.
pub async fn resolve_owner_token(store: &dyn DocumentStore, job: &JobRecord) -> StoreResult<OwnerToken> {
    let Some(owner) = job.poster_id.as_deref() else {
        info!(job_id = %job.id, "Job has no poster id, skipping");
        return Ok(OwnerToken::Missing(SkipReason::OwnerMissing));
    };

    let Some(doc) = store.get(&user_path(owner)).await? else {
        info!(job_id = %job.id, user_id = %owner, "User record not found, skipping");
        return Ok(OwnerToken::Missing(SkipReason::UserMissing));
    };

    match UserRecord::from_document(&doc).fcm_token {
        Some(token) => Ok(OwnerToken::Found {
            user_id: owner.to_string(),
            token,
        }),
        None => {
            info!(job_id = %job.id, "No FCM token found for user {}", owner);
            Ok(OwnerToken::Missing(SkipReason::TokenMissing))
        }
    }
}

/// Send through the context's dispatcher and count the attempt
pub async fn deliver(
    ctx: &AppContext,
    category: NotificationCategory,
    message: &PushMessage,
) -> Result<String, PushError> {
    match ctx.push.send(message).await {
        Ok(message_id) => {
            metrics::record_push(category.as_str(), true);
            Ok(message_id)
        }
        Err(e) => {
            metrics::record_push(category.as_str(), false);
            warn!(category = category.as_str(), target = ?message.target, error = %e, "Push not delivered");
            Err(e)
        }
    }
}
