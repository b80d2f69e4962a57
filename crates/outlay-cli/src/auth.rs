//! CLI Firebase auth/session helpers with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use outlay_core::auth::{AuthResult, FirebaseAuthClient, SessionPersistence};
pub use outlay_core::auth::{AuthError, AuthSession};
use outlay_core::config::FirebaseProject;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "outlay-cli";

#[derive(Clone)]
struct SessionStore {
    username: String,
}

impl SessionStore {
    fn new(profile_name: &str) -> Self {
        Self {
            username: format!("firebase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?
            .insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?
            .remove(&self.username);
        Ok(())
    }
}

#[derive(Clone)]
pub struct FirebaseAuthService {
    inner: FirebaseAuthClient<SessionStore>,
}

impl FirebaseAuthService {
    pub fn new(profile_name: &str, project: &FirebaseProject) -> AuthResult<Self> {
        Ok(Self {
            inner: FirebaseAuthClient::new(
                project.api_key.clone(),
                project.auth_endpoints(),
                SessionStore::new(profile_name),
            )?,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_up(email, password).await
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.inner.restore_session().await
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.inner.sign_out()
    }
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<AuthSession>> {
    SessionStore::new(profile_name).load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
pub fn store_session_for_tests(profile_name: &str, session: &AuthSession) {
    SessionStore::new(profile_name)
        .save_session(session)
        .unwrap();
}
