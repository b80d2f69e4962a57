use outlay_core::models::group_by_category;

use crate::commands::common::{
    expense_to_list_item, format_expense_line, format_grouped_lines, CommandContext,
    ExpenseListItem,
};
use crate::error::CliError;

pub fn run_list(context: &CommandContext, grouped: bool, as_json: bool) -> Result<(), CliError> {
    let expenses = context.facade.list_live().borrow().clone();

    match (grouped, as_json) {
        (true, true) => {
            let items = group_by_category(&expenses);
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        (false, true) => {
            let items = expenses
                .iter()
                .map(expense_to_list_item)
                .collect::<Vec<ExpenseListItem>>();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        (true, false) => {
            for line in format_grouped_lines(&group_by_category(&expenses)) {
                println!("{line}");
            }
        }
        (false, false) => {
            if expenses.is_empty() {
                println!("No expenses recorded.");
            }
            for record in &expenses {
                println!("{}", format_expense_line(record));
            }
        }
    }

    Ok(())
}
