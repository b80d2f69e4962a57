//! Current-user resolution gating every remote operation.

use std::fmt;
use std::sync::{Arc, RwLock};

/// The authenticated principal that scopes remote access.
#[derive(Clone, PartialEq, Eq)]
pub struct UserIdentity {
    user_id: String,
    access_token: Option<String>,
}

impl UserIdentity {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }

    /// Attach the bearer credential the remote transport presents for this user.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("UserIdentity")
            .field("user_id", &self.user_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Source of the currently signed-in user.
pub trait IdentityContext: Send + Sync {
    /// The signed-in user, or `None` in local-only mode.
    fn current_user(&self) -> Option<UserIdentity>;
}

/// Settable identity shared between the auth layer and the reconciler.
#[derive(Clone, Default)]
pub struct SessionIdentity {
    current: Arc<RwLock<Option<UserIdentity>>>,
}

impl SessionIdentity {
    /// Start without a signed-in user.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(identity: UserIdentity) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(identity))),
        }
    }

    pub fn sign_in(&self, identity: UserIdentity) {
        tracing::debug!("Identity set to user {}", identity.user_id());
        *self.write_guard() = Some(identity);
    }

    pub fn sign_out(&self) {
        tracing::debug!("Identity cleared");
        *self.write_guard() = None;
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<UserIdentity>> {
        // A poisoned lock still holds a valid Option, so keep using it
        self.current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl IdentityContext for SessionIdentity {
    fn current_user(&self) -> Option<UserIdentity> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
