use uuid::Uuid;

use crate::auth::AccessTokenProvider;
use crate::errors::{FirebaseError, FirebaseResult};
use crate::models::*;

const FCM_BASE_URL: &str = "https://fcm.googleapis.com";

/// Firebase Cloud Messaging Client
///
/// Sends push notifications through the FCM HTTP v1 API, either to a
/// single registration token or to every subscriber of a topic.
pub struct FCMClient {
    pub project_id: String,
    tokens: AccessTokenProvider,
    base_url: String,
    http_client: reqwest::Client,
}

impl FCMClient {
    /// Create new FCM client
    ///
    /// # Arguments
    /// * `project_id` - Firebase project ID
    /// * `credentials` - Service account key with OAuth2 credentials
    pub fn new(project_id: String, credentials: ServiceAccountKey) -> Self {
        Self::with_token_provider(project_id, AccessTokenProvider::service_account(credentials))
    }

    pub fn with_token_provider(project_id: String, tokens: AccessTokenProvider) -> Self {
        Self {
            project_id,
            tokens,
            base_url: FCM_BASE_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Point the client at a different endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url.trim_end_matches('/'),
            self.project_id
        )
    }

    /// Send a fully built message, including any platform options
    pub async fn send_message(&self, content: FcmMessageContent) -> FirebaseResult<FCMSendResult> {
        if let Some(token) = &content.token {
            if !self.validate_token(token) {
                return Err(FirebaseError::InvalidToken);
            }
        }

        let access_token = self.tokens.access_token().await?;
        let message = FcmMessage { message: content };

        let response = self
            .http_client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&message)
            .send()
            .await
            .map_err(|e| FirebaseError::SendRequestError(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let fcm_response: FcmApiResponse = response
                    .json()
                    .await
                    .map_err(|e| FirebaseError::ResponseParseError(e.to_string()))?;

                Ok(FCMSendResult {
                    message_id: fcm_response
                        .name
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    success: true,
                    error: None,
                })
            }
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                Err(FirebaseError::ApiError(status.to_string(), error_text))
            }
        }
    }

    /// Validate device token format
    pub fn validate_token(&self, device_token: &str) -> bool {
        // FCM tokens are typically 100-200 characters
        !device_token.is_empty() && device_token.len() >= 10 && device_token.len() <= 1000
    }
}
