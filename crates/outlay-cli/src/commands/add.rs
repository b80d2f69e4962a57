use outlay_core::ExpenseRecord;

use crate::commands::common::{
    normalize_title, now_millis, outcome_label, parse_amount, parse_category, parse_date,
    CommandContext,
};
use crate::error::CliError;

pub async fn run_add(
    context: &CommandContext,
    title: &str,
    amount: &str,
    date: Option<&str>,
    category: &str,
) -> Result<(), CliError> {
    let title = normalize_title(title)?;
    let amount = parse_amount(amount)?;
    let date = date.map_or_else(|| Ok(now_millis()), parse_date)?;
    let category = parse_category(category)?;

    let record = ExpenseRecord::new(title, amount, date, category);
    let outcome = context.reconciler().upsert(record).await?;

    println!("{} ({})", outcome.local_id(), outcome_label(&outcome));
    Ok(())
}
