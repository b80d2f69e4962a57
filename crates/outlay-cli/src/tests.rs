use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use outlay_core::models::group_by_category;
use outlay_core::remote::MemoryRemoteStore;
use outlay_core::{
    ExpenseRecord, LocalId, LocalStore, RemoteId, SessionIdentity, SyncPolicy, UserIdentity,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::cli::{Cli, Commands, CompletionShell};
use crate::commands::add::run_add;
use crate::commands::common::{
    build_facade, expense_to_list_item, format_date, format_expense_line, format_grouped_lines,
    parse_amount, parse_category, parse_date, resolve_db_path, CommandContext,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{merge_profile_input, validate_profile_urls, ProfileInput};
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, ExpenseEdits};
use crate::commands::sync::{run_push, run_sync};
use crate::config_profiles::CliProfile;
use crate::error::CliError;

const USER: &str = "cli-user";

async fn context(signed_in: bool) -> (TempDir, CommandContext, Arc<MemoryRemoteStore>) {
    let tmp = tempfile::tempdir().unwrap();
    let store = LocalStore::open_path(tmp.path().join("outlay.db"))
        .await
        .unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let identity = if signed_in {
        SessionIdentity::signed_in(UserIdentity::new(USER))
    } else {
        SessionIdentity::signed_out()
    };
    let facade = build_facade(
        store.clone(),
        remote.clone(),
        Arc::new(identity),
        SyncPolicy::default(),
    );

    let context = CommandContext {
        store,
        facade,
        profile_name: "test".to_string(),
        signed_in_as: signed_in.then(|| USER.to_string()),
    };
    (tmp, context, remote)
}

#[test]
fn parse_amount_rejects_negative_and_garbage() {
    assert_eq!(parse_amount(" 12.50 ").unwrap(), 12.5);
    assert_eq!(parse_amount("0").unwrap(), 0.0);
    assert!(matches!(parse_amount("-3"), Err(CliError::InvalidAmount(_))));
    assert!(matches!(parse_amount("ten"), Err(CliError::InvalidAmount(_))));
    assert!(matches!(parse_amount("NaN"), Err(CliError::InvalidAmount(_))));
}

#[test]
fn parse_date_uses_utc_midnight_millis() {
    assert_eq!(parse_date("1970-01-02").unwrap(), 86_400_000);
    assert_eq!(format_date(parse_date("2024-03-09").unwrap()), "2024-03-09");
    assert!(matches!(parse_date("09/03/2024"), Err(CliError::InvalidDate(_))));
}

#[test]
fn parse_category_normalizes_case() {
    assert_eq!(parse_category("food").unwrap(), "Food");
    let error = parse_category("rent").unwrap_err();
    assert!(error.to_string().contains("Utilities"));
}

#[test]
fn resolve_db_path_prefers_explicit_flag() {
    let explicit = PathBuf::from("/tmp/outlay-explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())).unwrap(), explicit);
}

#[test]
fn expense_lines_show_sync_status() {
    let local =
        ExpenseRecord::new("Bus", 2.5, 0, "Transport").with_local_id(LocalId::new(3).unwrap());
    let synced = local.clone().with_remote_id(RemoteId::new("doc-1"));
    let mut pending = local.clone();
    pending.pending_sync = true;

    assert!(format_expense_line(&local).contains("local"));
    assert!(format_expense_line(&synced).contains("synced"));
    assert!(format_expense_line(&pending).contains("pending"));
    assert!(format_expense_line(&local).contains("1970-01-01"));

    let item = expense_to_list_item(&synced);
    assert_eq!(item.remote_id.as_deref(), Some("doc-1"));
    assert_eq!(item.status, "synced");
}

#[test]
fn grouped_lines_put_headers_before_rows() {
    let records = vec![
        ExpenseRecord::new("Lunch", 10.0, 2, "Food"),
        ExpenseRecord::new("Taxi", 20.0, 1, "Transport"),
        ExpenseRecord::new("Dinner", 5.5, 1, "Food"),
    ];

    let lines = format_grouped_lines(&group_by_category(&records));

    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Food (total 15.50)");
    assert!(lines[1].ends_with("Dinner"));
    assert!(lines[2].ends_with("Lunch"));
    assert_eq!(lines[3], "Transport (total 20.00)");
}

#[test]
fn merge_profile_input_prefers_flags_then_env_then_existing() {
    let mut profile = CliProfile {
        project_id: Some("stored-project".to_string()),
        api_key: Some("stored-key".to_string()),
        ..Default::default()
    };
    let input = ProfileInput {
        api_key: Some(" flag-key ".to_string()),
        ..Default::default()
    };

    merge_profile_input(&mut profile, input, |name| {
        (name == "OUTLAY_FIRESTORE_URL").then(|| "http://localhost:8080/v1".to_string())
    });

    assert_eq!(profile.project_id.as_deref(), Some("stored-project"));
    assert_eq!(profile.api_key.as_deref(), Some("flag-key"));
    assert_eq!(
        profile.firestore_base_url.as_deref(),
        Some("http://localhost:8080/v1")
    );
    assert_eq!(profile.auth_emulator_url, None);
}

#[test]
fn validate_profile_urls_requires_scheme() {
    let profile = CliProfile {
        auth_emulator_url: Some("localhost:9099".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        validate_profile_urls(&profile),
        Err(CliError::Config(message)) if message.contains("auth_emulator_url")
    ));
}

#[test]
fn completions_use_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("outlay"));
}

#[test]
fn cli_parses_add_with_global_flags() {
    let cli = Cli::try_parse_from([
        "outlay",
        "add",
        "Coffee",
        "4.20",
        "--category",
        "food",
        "--profile",
        "work",
    ])
    .unwrap();

    assert_eq!(cli.profile.as_deref(), Some("work"));
    let Some(Commands::Add {
        title,
        amount,
        category,
        date,
    }) = cli.command
    else {
        panic!("expected add command");
    };
    assert_eq!(title, "Coffee");
    assert_eq!(amount, "4.20");
    assert_eq!(category, "food");
    assert_eq!(date, None);
}

#[test]
fn cli_rejects_non_positive_ids() {
    assert!(Cli::try_parse_from(["outlay", "delete", "0"]).is_err());
    assert!(Cli::try_parse_from(["outlay", "edit", "abc"]).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn add_edit_delete_round_trip_while_signed_in() {
    let (_tmp, context, remote) = context(true).await;

    run_add(&context, "Coffee", "4.20", Some("2024-05-01"), "food")
        .await
        .unwrap();
    let added = context.store.list().await.unwrap();
    assert_eq!(added.len(), 1);
    assert!(added[0].is_synced());
    let id = added[0].local_id.unwrap();

    let edits = ExpenseEdits {
        amount: Some("5".to_string()),
        ..Default::default()
    };
    run_edit(&context, id, edits).await.unwrap();
    assert_eq!(context.store.get(id).await.unwrap().unwrap().amount, 5.0);
    assert_eq!(remote.document_count(USER), 1);

    run_delete(&context, id).await.unwrap();
    assert!(context.store.list().await.unwrap().is_empty());
    assert_eq!(remote.document_count(USER), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_out_commands_stay_local() {
    let (_tmp, context, remote) = context(false).await;

    run_add(&context, "Snack", "1.5", None, "Other").await.unwrap();

    let records = context.store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_synced());
    assert_eq!(remote.create_calls(), 0);
    assert!(matches!(
        run_sync(&context).await,
        Err(CliError::SyncNotConfigured)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_and_delete_report_missing_expense() {
    let (_tmp, context, _remote) = context(false).await;
    let missing = LocalId::new(42).unwrap();

    assert!(matches!(
        run_edit(&context, missing, ExpenseEdits::default()).await,
        Err(CliError::ExpenseNotFound(id)) if id == missing
    ));
    assert!(matches!(
        run_delete(&context, missing).await,
        Err(CliError::ExpenseNotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_and_push_recover_offline_adds() {
    let (_tmp, context, remote) = context(true).await;
    remote.set_offline(true);
    run_add(&context, "Groceries", "61.30", None, "Food")
        .await
        .unwrap();
    assert_eq!(context.store.list_pending().await.unwrap().len(), 1);

    assert!(matches!(run_sync(&context).await, Err(CliError::SyncFailed)));
    assert_eq!(context.store.list().await.unwrap().len(), 1);

    remote.set_offline(false);
    run_push(&context).await.unwrap();
    assert!(context.store.list_pending().await.unwrap().is_empty());

    run_sync(&context).await.unwrap();
    let records = context.store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_synced());
}
