use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use outlay_core::remote::{FirestoreRemoteStore, MemoryRemoteStore, RemoteStore};
use outlay_core::sync::{Reconciler, SyncFacade, UpsertOutcome};
use outlay_core::{
    Category, ExpenseRecord, IdentityContext, ListItem, LocalId, LocalStore, SessionIdentity,
    SyncPolicy,
};
use serde::Serialize;

use crate::auth::FirebaseAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Everything a command needs to read and change expenses.
pub struct CommandContext {
    pub store: LocalStore,
    pub facade: SyncFacade,
    pub profile_name: String,
    pub signed_in_as: Option<String>,
}

impl CommandContext {
    pub fn reconciler(&self) -> &Reconciler {
        self.facade.reconciler()
    }

    pub fn require_sign_in(&self) -> Result<(), CliError> {
        if self.signed_in_as.is_some() {
            Ok(())
        } else {
            Err(CliError::SyncNotConfigured)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseListItem {
    pub id: Option<LocalId>,
    pub remote_id: Option<String>,
    pub title: String,
    pub amount: f64,
    pub date: i64,
    pub date_label: String,
    pub category: String,
    pub status: &'static str,
}

pub async fn open_context(
    db_path: &Path,
    global_profile: Option<&str>,
) -> Result<CommandContext, CliError> {
    let store = LocalStore::open_path(db_path).await?;

    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let client_config = profile.client_config();
    let project = client_config
        .firebase_project()
        .map_err(CliError::Config)?;

    let identity = SessionIdentity::signed_out();
    let mut signed_in_as = None;
    let remote: Arc<dyn RemoteStore> = if let Some(project) = project {
        let auth = FirebaseAuthService::new(&profile_name, &project)
            .map_err(|error| CliError::Auth(error.to_string()))?;
        match auth.restore_session().await {
            Ok(Some(session)) => {
                signed_in_as = Some(
                    session
                        .user
                        .email
                        .clone()
                        .unwrap_or_else(|| session.user.id.clone()),
                );
                identity.sign_in(session.to_identity());
            }
            Ok(None) => tracing::debug!("Profile '{profile_name}' has no stored session"),
            Err(error) => {
                tracing::warn!("Could not restore session for '{profile_name}': {error}");
            }
        }

        let firestore = project
            .firestore_config()
            .and_then(FirestoreRemoteStore::new)
            .map_err(|error| CliError::Config(error.to_string()))?;
        Arc::new(firestore)
    } else {
        // Never called: the identity stays signed out without a project.
        Arc::new(MemoryRemoteStore::new())
    };

    let facade = build_facade(store.clone(), remote, Arc::new(identity), client_config.sync);
    Ok(CommandContext {
        store,
        facade,
        profile_name,
        signed_in_as,
    })
}

pub fn build_facade(
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityContext>,
    policy: SyncPolicy,
) -> SyncFacade {
    SyncFacade::new(Reconciler::new(store, remote, identity).with_policy(policy))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("OUTLAY_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("outlay").join("outlay.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub fn normalize_title(title: &str) -> Result<String, CliError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_amount(raw: &str) -> Result<f64, CliError> {
    let amount = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| CliError::InvalidAmount(raw.to_string()))?;
    if amount.is_finite() && amount >= 0.0 {
        Ok(amount)
    } else {
        Err(CliError::InvalidAmount(raw.to_string()))
    }
}

/// Parse `YYYY-MM-DD` into Unix milliseconds at UTC midnight.
pub fn parse_date(raw: &str) -> Result<i64, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc().timestamp_millis())
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))
}

pub fn parse_category(raw: &str) -> Result<String, CliError> {
    raw.parse::<Category>()
        .map(|category| category.as_str().to_string())
        .map_err(CliError::InvalidCategory)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn format_date(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d").to_string(),
    )
}

pub const fn sync_status(record: &ExpenseRecord) -> &'static str {
    if record.pending_sync {
        "pending"
    } else if record.remote_id.is_some() {
        "synced"
    } else {
        "local"
    }
}

pub const fn outcome_label(outcome: &UpsertOutcome) -> &'static str {
    match outcome {
        UpsertOutcome::LocalOnly { .. } => "local",
        UpsertOutcome::Synced { .. } => "synced",
        UpsertOutcome::PendingSync { .. } => "pending",
    }
}

pub fn expense_to_list_item(record: &ExpenseRecord) -> ExpenseListItem {
    ExpenseListItem {
        id: record.local_id,
        remote_id: record.remote_id.as_ref().map(ToString::to_string),
        title: record.title.clone(),
        amount: record.amount,
        date: record.date,
        date_label: format_date(record.date),
        category: record.category.clone(),
        status: sync_status(record),
    }
}

pub fn format_expense_line(record: &ExpenseRecord) -> String {
    let id = record
        .local_id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    format!(
        "{id:>5}  {}  {:<13}  {:>10.2}  {:<7}  {}",
        format_date(record.date),
        record.category,
        record.amount,
        sync_status(record),
        record.title
    )
}

pub fn format_grouped_lines(items: &[ListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            ListItem::CategoryHeader { category, total } => {
                format!("{category} (total {total:.2})")
            }
            ListItem::ExpenseRow(record) => format!("  {}", format_expense_line(record)),
        })
        .collect()
}
