use thiserror::Error;

/// Result alias used across the Firebase clients
pub type FirebaseResult<T> = Result<T, FirebaseError>;

/// Firebase Client Error Types
#[derive(Error, Debug)]
pub enum FirebaseError {
    #[error("Failed to load service account key: {0}")]
    CredentialsError(String),

    #[error("Failed to parse private key: {0}")]
    KeyParseError(String),

    #[error("Failed to encode JWT: {0}")]
    JwtEncodeError(String),

    #[error("Failed to get access token: {0}")]
    TokenError(String),

    #[error("Token request failed with status: {0}")]
    TokenRequestFailed(String),

    #[error("Failed to parse token response: {0}")]
    TokenParseError(String),

    #[error("FCM send request failed: {0}")]
    SendRequestError(String),

    #[error("Failed to parse FCM response: {0}")]
    ResponseParseError(String),

    #[error("FCM API error: {0} - {1}")]
    ApiError(String, String),

    #[error("Firestore request failed: {0}")]
    FirestoreRequestError(String),

    #[error("Firestore API error: {0} - {1}")]
    FirestoreApiError(String, String),

    #[error("Invalid Firestore value: {0}")]
    InvalidValue(String),

    #[error("Invalid device token")]
    InvalidToken,
}
