use chrono::Utc;
use expensy_core::fixtures::SeedReport;
use expensy_core::ExpenseOverview;
use serde::Serialize;

use crate::commands::{CommandResult, RuntimeOptions, Session};

#[derive(Debug, Serialize)]
struct SeedOutput {
    loaded: SeedReport,
    overview: ExpenseOverview,
    audit_events: usize,
}

pub fn run(options: &RuntimeOptions) -> CommandResult {
    let session = match Session::open("seed", options) {
        Ok(session) => session,
        Err(result) => return result,
    };

    let report = session.report;
    let overview = session.service.overview(Utc::now());
    let message = format!(
        "seeded {} employees, {} rules, {} expenses and {} votes\n  - pending: {}\n  - approved: {}\n  - rejected: {}\n  - high value pending: {}",
        report.employees,
        report.rules,
        report.expenses,
        report.votes,
        overview.pending,
        overview.approved,
        overview.rejected,
        overview.high_value_pending,
    );

    let output = SeedOutput {
        loaded: report,
        overview,
        audit_events: session.service.audit().events().len(),
    };
    CommandResult::success_with_data("seed", message, output)
}
