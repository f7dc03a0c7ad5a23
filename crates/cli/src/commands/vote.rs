use expensy_core::{Decision, EmployeeId, ExpenseId};

use crate::commands::{CommandResult, RuntimeOptions, Session};

#[derive(Debug, Clone)]
pub struct VoteArgs {
    pub expense: String,
    pub approver: String,
    pub decision: String,
}

pub fn run(options: &RuntimeOptions, args: &VoteArgs) -> CommandResult {
    let decision = match args.decision.parse::<Decision>() {
        Ok(decision) => decision,
        Err(error) => return CommandResult::rejected("vote", &error),
    };
    let session = match Session::open("vote", options) {
        Ok(session) => session,
        Err(result) => return result,
    };

    let expense_id = ExpenseId(args.expense.trim().to_string());
    let approver = EmployeeId::new(&args.approver);
    match session.service.cast_vote(&expense_id, &approver, decision) {
        Ok(expense) => {
            let message = format!(
                "{approver} voted {decision:?} on {expense_id}; status is now {:?}",
                expense.status
            );
            CommandResult::success_with_data("vote", message, expense)
        }
        Err(error) => CommandResult::rejected("vote", &error),
    }
}
