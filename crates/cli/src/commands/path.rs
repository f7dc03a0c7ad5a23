use expensy_core::ExpenseId;
use serde::Serialize;

use crate::commands::{CommandResult, RuntimeOptions, Session};

#[derive(Debug, Serialize)]
struct ApprovalStep {
    approver: String,
    vote: Option<String>,
}

pub fn run(options: &RuntimeOptions, expense: &str) -> CommandResult {
    let session = match Session::open("path", options) {
        Ok(session) => session,
        Err(result) => return result,
    };

    let expense_id = ExpenseId(expense.trim().to_string());
    let chain = match session.service.get_approval_path(&expense_id) {
        Ok(chain) => chain,
        Err(error) => return CommandResult::rejected("path", &error),
    };
    let expense = match session.service.get_expense(&expense_id) {
        Ok(expense) => expense,
        Err(error) => return CommandResult::rejected("path", &error),
    };

    let steps: Vec<ApprovalStep> = chain
        .iter()
        .map(|approver| ApprovalStep {
            approver: approver.to_string(),
            vote: expense.votes.get(approver).map(|decision| format!("{decision:?}")),
        })
        .collect();
    let rendered: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(position, step)| {
            format!(
                "  {}. {} ({})",
                position + 1,
                step.approver,
                step.vote.as_deref().unwrap_or("awaiting vote")
            )
        })
        .collect();
    let message = format!(
        "approval path for {expense_id} ({:?}, {}% required)\n{}",
        expense.status,
        expense.policy.min_approval_pct,
        rendered.join("\n")
    );

    CommandResult::success_with_data("path", message, steps)
}
