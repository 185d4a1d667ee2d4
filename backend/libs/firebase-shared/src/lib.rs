//! Firebase Shared Library
//!
//! Thin clients for the Firebase services the backend talks to, authenticated
//! with OAuth2 access tokens minted from a Google service account:
//! - Firebase Cloud Messaging (token and topic sends, platform options)
//! - Cloud Firestore REST (point reads, structured queries, atomic commits)

pub mod auth;
pub mod errors;
pub mod fcm;
pub mod firestore;
pub mod models;

pub use auth::AccessTokenProvider;
pub use errors::{FirebaseError, FirebaseResult};
pub use fcm::FCMClient;
pub use firestore::FirestoreClient;
pub use models::{AndroidConfig, ApnsConfig, FCMSendResult, FcmMessageContent, FcmNotification, ServiceAccountKey};
