use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::{FirebaseError, FirebaseResult};
use crate::models::{GoogleTokenResponse, JwtClaims, ServiceAccountKey, TokenCache};

/// Scope covering both FCM and Firestore
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Source of bearer tokens for Google APIs
///
/// The Firestore emulator accepts the fixed `owner` token, so local runs
/// use [`AccessTokenProvider::Static`].
#[derive(Clone)]
pub enum AccessTokenProvider {
    ServiceAccount(Arc<ServiceAccountTokens>),
    Static(String),
}

impl AccessTokenProvider {
    pub fn service_account(credentials: ServiceAccountKey) -> Self {
        Self::ServiceAccount(Arc::new(ServiceAccountTokens::new(credentials)))
    }

    pub fn emulator() -> Self {
        Self::Static("owner".to_string())
    }

    pub async fn access_token(&self) -> FirebaseResult<String> {
        match self {
            Self::ServiceAccount(tokens) => tokens.access_token().await,
            Self::Static(token) => Ok(token.clone()),
        }
    }
}

/// OAuth2 tokens minted from a service account key, cached until shortly
/// before they expire.
pub struct ServiceAccountTokens {
    credentials: ServiceAccountKey,
    token_cache: Mutex<Option<TokenCache>>,
    http_client: reqwest::Client,
}

impl ServiceAccountTokens {
    pub fn new(credentials: ServiceAccountKey) -> Self {
        Self {
            credentials,
            token_cache: Mutex::new(None),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    /// Get access token from service account (with caching)
    pub async fn access_token(&self) -> FirebaseResult<String> {
        // Holding the lock across the exchange keeps concurrent callers from
        // minting duplicate tokens.
        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            let now = Utc::now().timestamp();
            if cached.expires_at > now + 60 {
                return Ok(cached.access_token.clone());
            }
        }

        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| FirebaseError::KeyParseError(e.to_string()))?;

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| FirebaseError::JwtEncodeError(e.to_string()))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FirebaseError::TokenError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FirebaseError::TokenRequestFailed(
                response.status().to_string(),
            ));
        }

        let token_response: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| FirebaseError::TokenParseError(e.to_string()))?;

        debug!(
            client_email = %self.credentials.client_email,
            expires_in = token_response.expires_in,
            "Minted Google access token"
        );

        *cache = Some(TokenCache {
            access_token: token_response.access_token.clone(),
            expires_at: Utc::now().timestamp() + token_response.expires_in,
        });

        Ok(token_response.access_token)
    }
}
