use crate::commands::{CommandResult, RuntimeOptions, Session};

pub fn run(options: &RuntimeOptions) -> CommandResult {
    let session = match Session::open("rules", options) {
        Ok(session) => session,
        Err(result) => return result,
    };

    let rules = session.service.list_rules();
    let lines: Vec<String> = rules
        .iter()
        .map(|rule| {
            let voters = rule.voters();
            let names: Vec<&str> = voters.iter().map(|voter| voter.as_str()).collect();
            format!("  - {}: {} at {}%", rule.manager, names.join(", "), rule.min_approval_pct)
        })
        .collect();

    let mut message = format!("{} approval rules", rules.len());
    if !lines.is_empty() {
        message.push('\n');
        message.push_str(&lines.join("\n"));
    }
    CommandResult::success_with_data("rules", message, rules)
}
