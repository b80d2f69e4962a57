//! Firebase Auth REST client with pluggable session persistence.

use std::fmt;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::UserIdentity;
use crate::util::{compact_text, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }

    /// Identity that scopes remote access for this session.
    #[must_use]
    pub fn to_identity(&self) -> UserIdentity {
        UserIdentity::new(self.user.id.clone()).with_access_token(self.id_token.clone())
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Firebase auth is not configured for this profile.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Where an authenticated session survives between runs.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// REST roots for the two Firebase Auth services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub identity_toolkit: String,
    pub secure_token: String,
}

impl AuthEndpoints {
    #[must_use]
    pub fn production() -> Self {
        Self {
            identity_toolkit: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token: SECURE_TOKEN_URL.to_string(),
        }
    }

    /// Endpoints served by the auth emulator at `host`, e.g. `http://localhost:9099`.
    #[must_use]
    pub fn emulator(host: &str) -> Self {
        let host = host.trim().trim_end_matches('/');
        Self {
            identity_toolkit: format!("{host}/identitytoolkit.googleapis.com/v1"),
            secure_token: format!("{host}/securetoken.googleapis.com/v1"),
        }
    }
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self::production()
    }
}

#[derive(Clone)]
pub struct FirebaseAuthClient<S: SessionPersistence> {
    endpoints: AuthEndpoints,
    api_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> FirebaseAuthClient<S> {
    pub fn new(api_key: impl Into<String>, endpoints: AuthEndpoints, store: S) -> AuthResult<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Firebase API key must not be empty",
            ));
        }

        Ok(Self {
            endpoints,
            api_key,
            client: Client::builder().build()?,
            store,
        })
    }

    /// Load the persisted session, refreshing it when expired.
    ///
    /// A session that can no longer be refreshed is cleared.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("accounts:signUp", email, password)
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.password_request("accounts:signInWithPassword", email, password)
            .await
    }

    /// Exchange the session's refresh token for a fresh id token.
    pub async fn refresh_session(&self, session: &AuthSession) -> AuthResult<AuthSession> {
        if session.refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let request = self
            .client
            .post(format!("{}/token", self.endpoints.secure_token))
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ]);
        let response: RefreshTokenResponse = send_auth_request(request).await?;
        let refreshed = response.into_session(session.user.email.clone())?;

        self.store.save_session(&refreshed)?;
        Ok(refreshed)
    }

    /// Forget the persisted session. Firebase ID tokens expire on their own.
    pub fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()
    }

    async fn password_request(
        &self,
        operation: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
            "returnSecureToken": true,
        });
        let request = self
            .client
            .post(format!("{}/{operation}", self.endpoints.identity_toolkit))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload);

        let response: PasswordAuthResponse = send_auth_request(request).await?;
        let session = response.into_session()?;

        self.store.save_session(&session)?;
        Ok(session)
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

async fn send_auth_request<T: serde::de::DeserializeOwned>(
    request: RequestBuilder,
) -> AuthResult<T> {
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Api(parse_api_error(status, &body)));
    }
    Ok(response.json::<T>().await?)
}

fn parse_expires_in(raw: &str) -> AuthResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map(|seconds| unix_timestamp_now().saturating_add(seconds))
        .map_err(|_| AuthError::Api(format!("Invalid expiresIn value '{raw}'")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

impl PasswordAuthResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        Ok(AuthSession {
            expires_at: parse_expires_in(&self.expires_in)?,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            user: AuthUser {
                id: self.local_id,
                email: self.email.filter(|email| !email.trim().is_empty()),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

impl RefreshTokenResponse {
    fn into_session(self, email: Option<String>) -> AuthResult<AuthSession> {
        Ok(AuthSession {
            expires_at: parse_expires_in(&self.expires_in)?,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            user: AuthUser {
                id: self.user_id,
                email,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorResponse {
    error: FirebaseErrorBody,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    message: Option<String>,
}

fn parse_api_error(status: u16, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<FirebaseErrorResponse>(body) {
        if let Some(message) = payload.error.message {
            return format!("{} ({status})", message.trim());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("{trimmed} ({status})")
    }
}
