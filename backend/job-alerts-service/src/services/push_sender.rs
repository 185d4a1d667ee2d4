/// Push Notification Dispatch
///
/// Handlers build a [`PushMessage`] and hand it to a [`PushDispatcher`].
/// Production uses [`FcmDispatcher`]; without credentials the service falls
/// back to [`LogOnlyDispatcher`], which only logs what would have been sent.
use async_trait::async_trait;
use firebase_shared::{
    AndroidConfig, ApnsConfig, FCMClient, FcmMessageContent, FcmNotification, FirebaseError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Push dispatch errors
#[derive(Error, Debug)]
pub enum PushError {
    /// The push service refused the registration token (unregistered, malformed)
    #[error("Token rejected: {0}")]
    TokenRejected(String),

    /// Any other failure talking to the push service
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<FirebaseError> for PushError {
    fn from(err: FirebaseError) -> Self {
        let message = err.to_string();
        match err {
            FirebaseError::InvalidToken => PushError::TokenRejected(message),
            _ if is_token_invalid_error(&message) => PushError::TokenRejected(message),
            _ => PushError::Delivery(message),
        }
    }
}

/// Check if error indicates invalid token
fn is_token_invalid_error(error: &str) -> bool {
    let lower = error.to_lowercase();

    lower.contains("invalid") && (lower.contains("token") || lower.contains("registration"))
        || lower.contains("unregistered")
        || lower.contains("notregistered")
}

/// Where a message goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    /// Every subscriber of a topic
    Topic(String),
    /// One device registration token
    Token(String),
}

/// Platform-specific delivery options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryHints {
    /// Wake Android devices immediately
    pub android_high_priority: bool,
    /// Background content-available delivery on iOS
    pub apns_content_available: bool,
}

impl DeliveryHints {
    pub fn wake_devices() -> Self {
        Self {
            android_high_priority: true,
            apns_content_available: true,
        }
    }
}

/// Push notification request
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub target: PushTarget,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
    pub hints: DeliveryHints,
}

impl PushMessage {
    pub fn to_topic(topic: &str, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(PushTarget::Topic(topic.to_string()), title.into(), body.into())
    }

    pub fn to_token(token: &str, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(PushTarget::Token(token.to_string()), title.into(), body.into())
    }

    fn new(target: PushTarget, title: String, body: String) -> Self {
        Self {
            target,
            title,
            body,
            data: BTreeMap::new(),
            hints: DeliveryHints::default(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl Into<String>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_hints(mut self, hints: DeliveryHints) -> Self {
        self.hints = hints;
        self
    }

    /// FCM wire representation
    pub fn to_fcm(&self) -> FcmMessageContent {
        let (token, topic) = match &self.target {
            PushTarget::Token(token) => (Some(token.clone()), None),
            PushTarget::Topic(topic) => (None, Some(topic.clone())),
        };

        FcmMessageContent {
            token,
            topic,
            notification: FcmNotification {
                title: self.title.clone(),
                body: self.body.clone(),
            },
            data: self.data.clone(),
            android: self
                .hints
                .android_high_priority
                .then(AndroidConfig::high_priority),
            apns: self
                .hints
                .apns_content_available
                .then(ApnsConfig::content_available),
        }
    }
}

/// Sends push notifications; returns the provider's message id
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError>;
}

/// Dispatcher backed by Firebase Cloud Messaging
pub struct FcmDispatcher {
    fcm_client: Arc<FCMClient>,
}

impl FcmDispatcher {
    pub fn new(fcm_client: Arc<FCMClient>) -> Self {
        Self { fcm_client }
    }
}

#[async_trait]
impl PushDispatcher for FcmDispatcher {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let result = self.fcm_client.send_message(message.to_fcm()).await.map_err(|e| {
            let err = PushError::from(e);
            warn!(target = ?message.target, error = %err, "FCM delivery failed");
            err
        })?;

        debug!(message_id = %result.message_id, "FCM delivery successful");
        Ok(result.message_id)
    }
}

/// Dispatcher that logs instead of sending
#[derive(Debug, Default)]
pub struct LogOnlyDispatcher;

#[async_trait]
impl PushDispatcher for LogOnlyDispatcher {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        let message_id = format!("log-only/{}", Uuid::new_v4());
        info!(
            message_id = %message_id,
            target = ?message.target,
            title = %message.title,
            body = %message.body,
            data = ?message.data,
            "Push dispatch disabled, message logged only"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_token_invalid_error() {
        assert!(is_token_invalid_error("Invalid registration token provided"));
        assert!(is_token_invalid_error("FCM API error: 404 - UNREGISTERED"));
        assert!(is_token_invalid_error("NotRegistered"));

        assert!(!is_token_invalid_error("Network timeout"));
        assert!(!is_token_invalid_error("FCM API error: 500 - Internal"));
    }

    #[test]
    fn test_firebase_error_classification() {
        assert!(matches!(
            PushError::from(FirebaseError::InvalidToken),
            PushError::TokenRejected(_)
        ));
        assert!(matches!(
            PushError::from(FirebaseError::ApiError(
                "404 Not Found".to_string(),
                "UNREGISTERED".to_string()
            )),
            PushError::TokenRejected(_)
        ));
        assert!(matches!(
            PushError::from(FirebaseError::SendRequestError("connection reset".to_string())),
            PushError::Delivery(_)
        ));
    }

    #[test]
    fn test_topic_message_to_fcm_carries_hints() {
        let message = PushMessage::to_topic("all_users", "Clerk", "Pune, MH • Full-time")
            .with_data("jobId", "job-1")
            .with_hints(DeliveryHints::wake_devices());

        let content = message.to_fcm();
        assert_eq!(content.topic.as_deref(), Some("all_users"));
        assert!(content.token.is_none());
        assert_eq!(content.data["jobId"], "job-1");
        assert!(content.android.is_some());
        assert!(content.apns.is_some());
    }

    #[test]
    fn test_token_message_to_fcm_has_no_hints() {
        let content = PushMessage::to_token("device-token-123456", "t", "b").to_fcm();
        assert_eq!(content.token.as_deref(), Some("device-token-123456"));
        assert!(content.topic.is_none());
        assert!(content.android.is_none());
        assert!(content.apns.is_none());
    }

    #[tokio::test]
    async fn test_log_only_dispatcher_succeeds() {
        let id = LogOnlyDispatcher
            .send(&PushMessage::to_token("device-token-123456", "t", "b"))
            .await
            .unwrap();
        assert!(id.starts_with("log-only/"));
    }
}
