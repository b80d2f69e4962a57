use outlay_core::SyncState;

use crate::commands::common::CommandContext;
use crate::error::CliError;

pub async fn run_sync(context: &CommandContext) -> Result<(), CliError> {
    context.require_sign_in()?;

    context.facade.resync_from_remote().await?;

    let state = *context.facade.sync_state().borrow();
    match state {
        SyncState::Synced => {
            let count = context.facade.list_live().borrow().len();
            println!("Synced {count} expenses");
            Ok(())
        }
        SyncState::Offline => Err(CliError::SyncNotConfigured),
        SyncState::Syncing | SyncState::Error => Err(CliError::SyncFailed),
    }
}

pub async fn run_push(context: &CommandContext) -> Result<(), CliError> {
    context.require_sign_in()?;

    let pushed = context.reconciler().push_pending().await?;
    if pushed == 0 {
        println!("No pending expenses");
    } else {
        println!("Pushed {pushed} pending expenses");
    }
    Ok(())
}
