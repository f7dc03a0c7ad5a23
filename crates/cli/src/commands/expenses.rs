use expensy_core::{ApprovalError, ExpenseCategory, ExpenseFilter, ExpenseStatus};

use crate::commands::{CommandResult, RuntimeOptions, Session};

#[derive(Debug, Clone, Default)]
pub struct ExpensesArgs {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ExpensesArgs {
    fn filter(&self) -> Result<ExpenseFilter, CommandResult> {
        let invalid = |error: ApprovalError| CommandResult::rejected("expenses", &error);
        let status =
            self.status.as_deref().map(str::parse::<ExpenseStatus>).transpose().map_err(invalid)?;
        let category = self
            .category
            .as_deref()
            .map(str::parse::<ExpenseCategory>)
            .transpose()
            .map_err(invalid)?;

        Ok(ExpenseFilter { status, category, text: self.search.clone() })
    }
}

pub fn run(options: &RuntimeOptions, args: &ExpensesArgs) -> CommandResult {
    let filter = match args.filter() {
        Ok(filter) => filter,
        Err(result) => return result,
    };
    let session = match Session::open("expenses", options) {
        Ok(session) => session,
        Err(result) => return result,
    };

    let expenses = session.service.list_expenses(&filter);
    let lines: Vec<String> = expenses
        .iter()
        .map(|expense| {
            format!(
                "  - {} {:?} {} {} {} ({}, {})",
                expense.id,
                expense.status,
                expense.amount,
                expense.currency,
                expense.description,
                expense.submitter,
                expense.category.as_str()
            )
        })
        .collect();

    let mut message = format!("{} matching expenses", expenses.len());
    if !lines.is_empty() {
        message.push('\n');
        message.push_str(&lines.join("\n"));
    }
    CommandResult::success_with_data("expenses", message, expenses)
}
