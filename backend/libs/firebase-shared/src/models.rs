use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{FirebaseError, FirebaseResult};

/// FCM Send Result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FCMSendResult {
    pub message_id: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Firebase Service Account Key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Load the JSON key file downloaded from the Google Cloud console
    pub fn from_file(path: impl AsRef<Path>) -> FirebaseResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FirebaseError::CredentialsError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> FirebaseResult<Self> {
        serde_json::from_str(raw).map_err(|e| FirebaseError::CredentialsError(e.to_string()))
    }
}

/// OAuth2 Token Cache
#[derive(Debug, Clone)]
pub struct TokenCache {
    pub access_token: String,
    pub expires_at: i64,
}

/// JWT Claims for Google OAuth2
#[derive(Debug, Serialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Google OAuth2 Token Response
#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// FCM Message Request
#[derive(Debug, Serialize)]
pub struct FcmMessage {
    pub message: FcmMessageContent,
}

/// FCM Message Content
///
/// Exactly one of `token` or `topic` must be set.
#[derive(Debug, Default, Serialize)]
pub struct FcmMessageContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub notification: FcmNotification,
    /// FCM only accepts string values in the data map
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

/// FCM Notification Payload
#[derive(Debug, Default, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

/// Android delivery options
#[derive(Debug, Serialize)]
pub struct AndroidConfig {
    /// "high" wakes the device immediately
    pub priority: String,
}

impl AndroidConfig {
    pub fn high_priority() -> Self {
        Self {
            priority: "high".to_string(),
        }
    }
}

/// APNs delivery options
#[derive(Debug, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Serialize)]
pub struct Aps {
    #[serde(rename = "content-available", skip_serializing_if = "Option::is_none")]
    pub content_available: Option<u8>,
}

impl ApnsConfig {
    /// Background content-available delivery on iOS
    pub fn content_available() -> Self {
        Self {
            payload: ApnsPayload {
                aps: Aps {
                    content_available: Some(1),
                },
            },
        }
    }
}

/// FCM API Response
#[derive(Debug, Deserialize)]
pub struct FcmApiResponse {
    pub name: Option<String>,
}
