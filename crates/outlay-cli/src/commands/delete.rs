use outlay_core::sync::RemoveOutcome;
use outlay_core::LocalId;

use crate::commands::common::CommandContext;
use crate::error::CliError;

pub async fn run_delete(context: &CommandContext, id: LocalId) -> Result<(), CliError> {
    let record = context
        .store
        .get(id)
        .await?
        .ok_or(CliError::ExpenseNotFound(id))?;

    match context.reconciler().remove(&record).await? {
        RemoveOutcome::RemoteFailed { reason } => {
            eprintln!("Deleted locally; the remote copy may remain: {reason}");
        }
        RemoveOutcome::LocalOnly | RemoveOutcome::RemoteDeleted => {}
    }

    println!("{id}");
    Ok(())
}
