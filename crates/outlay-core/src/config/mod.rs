//! Client configuration for the Firebase-backed remote collection.
//!
//! Holds the public project identifiers clients need to reach Firebase Auth
//! and Firestore. Secret credentials never belong here.

use serde::{Deserialize, Serialize};

use crate::auth::AuthEndpoints;
use crate::remote::{FirestoreConfig, RemoteResult};
use crate::sync::SyncPolicy;
use crate::util::{is_http_url, normalize_text_option};

/// Firebase project settings plus the reconciler policy for a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Firestore REST root, e.g. `http://localhost:8080/v1` for the emulator
    #[serde(default)]
    pub firestore_base_url: Option<String>,
    /// Auth emulator root, e.g. `http://localhost:9099`
    #[serde(default)]
    pub auth_emulator_url: Option<String>,
    #[serde(default)]
    pub sync: SyncPolicy,
}

/// A validated Firebase project: both identifiers present and non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseProject {
    pub project_id: String,
    pub api_key: String,
    pub firestore_base_url: Option<String>,
    pub auth_emulator_url: Option<String>,
}

impl ClientConfig {
    /// Resolve the configured Firebase project.
    ///
    /// Returns `Ok(None)` when neither identifier is set (local-only client),
    /// and an error when only one of them is.
    pub fn firebase_project(&self) -> Result<Option<FirebaseProject>, String> {
        let Some((project_id, api_key)) =
            resolve_optional_firebase_config(self.project_id.clone(), self.api_key.clone())?
        else {
            return Ok(None);
        };

        Ok(Some(FirebaseProject {
            project_id,
            api_key,
            firestore_base_url: normalize_optional_http_url(
                self.firestore_base_url.clone(),
                "firestore_base_url",
            )?,
            auth_emulator_url: normalize_optional_http_url(
                self.auth_emulator_url.clone(),
                "auth_emulator_url",
            )?,
        }))
    }
}

impl FirebaseProject {
    pub fn firestore_config(&self) -> RemoteResult<FirestoreConfig> {
        let config = FirestoreConfig::new(self.project_id.clone())?;
        match &self.firestore_base_url {
            Some(base_url) => config.with_base_url(base_url.clone()),
            None => Ok(config),
        }
    }

    #[must_use]
    pub fn auth_endpoints(&self) -> AuthEndpoints {
        self.auth_emulator_url
            .as_deref()
            .map_or_else(AuthEndpoints::production, AuthEndpoints::emulator)
    }
}

/// Pair up optional project id and API key; both or neither must be given.
pub fn resolve_optional_firebase_config(
    project_id: Option<String>,
    api_key: Option<String>,
) -> Result<Option<(String, String)>, String> {
    match (
        normalize_text_option(project_id),
        normalize_text_option(api_key),
    ) {
        (None, None) => Ok(None),
        (Some(project_id), Some(api_key)) => Ok(Some((project_id, api_key))),
        (Some(_), None) => Err("Firebase api_key is required when project_id is set".to_string()),
        (None, Some(_)) => Err("Firebase project_id is required when api_key is set".to_string()),
    }
}

fn normalize_optional_http_url(raw: Option<String>, field: &str) -> Result<Option<String>, String> {
    let Some(value) = normalize_text_option(raw) else {
        return Ok(None);
    };
    if is_http_url(&value) {
        Ok(Some(value.trim_end_matches('/').to_string()))
    } else {
        Err(format!("config field '{field}' must include http:// or https://"))
    }
}
