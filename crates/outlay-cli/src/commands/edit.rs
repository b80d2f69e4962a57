use outlay_core::LocalId;

use crate::commands::common::{
    normalize_title, outcome_label, parse_amount, parse_category, parse_date, CommandContext,
};
use crate::error::CliError;

/// Field overrides given on the command line.
#[derive(Debug, Default)]
pub struct ExpenseEdits {
    pub title: Option<String>,
    pub amount: Option<String>,
    pub date: Option<String>,
    pub category: Option<String>,
}

pub async fn run_edit(
    context: &CommandContext,
    id: LocalId,
    edits: ExpenseEdits,
) -> Result<(), CliError> {
    let original = context
        .store
        .get(id)
        .await?
        .ok_or(CliError::ExpenseNotFound(id))?;

    let mut edited = original.clone();
    if let Some(title) = edits.title.as_deref() {
        edited.title = normalize_title(title)?;
    }
    if let Some(amount) = edits.amount.as_deref() {
        edited.amount = parse_amount(amount)?;
    }
    if let Some(date) = edits.date.as_deref() {
        edited.date = parse_date(date)?;
    }
    if let Some(category) = edits.category.as_deref() {
        edited.category = parse_category(category)?;
    }

    if edited == original {
        println!("{id}");
        return Ok(());
    }

    let outcome = context.reconciler().upsert(edited).await?;
    println!("{} ({})", outcome.local_id(), outcome_label(&outcome));
    Ok(())
}
