//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use outlay_core::config::ClientConfig;
use outlay_core::SyncPolicy;
use serde::{Deserialize, Serialize};

pub use outlay_core::util::{is_http_url, normalize_text_option};

const CONFIG_FILE_NAME: &str = "cli-config.json";
const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub firestore_base_url: Option<String>,
    #[serde(default)]
    pub auth_emulator_url: Option<String>,
    #[serde(default)]
    pub sync: SyncPolicy,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("outlay").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Pick the profile: explicit flag, then `OUTLAY_PROFILE`, then the active one.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) =
            normalize_profile_name(std::env::var("OUTLAY_PROFILE").ok().as_deref())
        {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        DEFAULT_PROFILE.to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            project_id: self.project_id.clone(),
            api_key: self.api_key.clone(),
            firestore_base_url: self.firestore_base_url.clone(),
            auth_emulator_url: self.auth_emulator_url.clone(),
            sync: self.sync,
        }
    }

    /// Names of the settings still needed before the profile can sync.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if normalize_text_option(self.project_id.clone()).is_none() {
            missing.push("project_id");
        }
        if normalize_text_option(self.api_key.clone()).is_none() {
            missing.push("api_key");
        }
        missing
    }

    fn normalize(&mut self) {
        self.project_id = normalize_text_option(self.project_id.take());
        self.api_key = normalize_text_option(self.api_key.take());
        self.firestore_base_url = normalize_text_option(self.firestore_base_url.take());
        self.auth_emulator_url = normalize_text_option(self.auth_emulator_url.take());
    }
}

#[cfg(test)]
mod tests {
    use outlay_core::sync::EditMode;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
        assert_eq!(normalize_profile_name(Some(" work ")), Some("work".to_string()));
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                project_id: Some(" expenses-demo ".to_string()),
                api_key: Some(" web-key ".to_string()),
                firestore_base_url: Some("  ".to_string()),
                auth_emulator_url: None,
                sync: SyncPolicy::legacy(),
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        assert_eq!(profile.project_id.as_deref(), Some("expenses-demo"));
        assert_eq!(profile.api_key.as_deref(), Some("web-key"));
        assert_eq!(profile.firestore_base_url, None);
        assert_eq!(profile.sync.edit_mode, EditMode::AlwaysCreate);
    }

    #[test]
    fn missing_file_loads_empty_config() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&tmp.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name(Some("phone")), "phone");
        if std::env::var_os("OUTLAY_PROFILE").is_none() {
            assert_eq!(config.resolve_profile_name(None), "work");
        }
    }

    #[test]
    fn missing_fields_lists_firebase_identifiers() {
        let profile = CliProfile {
            project_id: Some("demo".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.missing_fields(), vec!["api_key"]);
        assert!(profile.client_config().firebase_project().is_err());
    }
}
