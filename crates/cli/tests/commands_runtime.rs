use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use expensy_cli::commands::expenses::ExpensesArgs;
use expensy_cli::commands::vote::VoteArgs;
use expensy_cli::commands::{config, expenses, path, rules, seed, vote, RuntimeOptions};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn seed_replays_demo_dataset() {
    with_env(&[], || {
        let result = seed::run(&RuntimeOptions::default());
        assert_eq!(result.exit_code, 0, "expected demo seed to succeed");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["loaded"]["expenses"], 8);
        assert_eq!(payload["data"]["loaded"]["votes"], 7);
        assert_eq!(payload["data"]["overview"]["pending"], 4);
        assert_eq!(payload["data"]["overview"]["approved"], 3);
        assert_eq!(payload["data"]["overview"]["rejected"], 1);
        assert_eq!(payload["data"]["overview"]["high_value_pending"], 2);
    });
}

#[test]
fn seed_is_deterministic_across_runs() {
    with_env(&[], || {
        let first = parse_payload(&seed::run(&RuntimeOptions::default()).output);
        let second = parse_payload(&seed::run(&RuntimeOptions::default()).output);

        assert_eq!(first["message"], second["message"]);
        assert_eq!(first["data"]["loaded"], second["data"]["loaded"]);
    });
}

#[test]
fn expenses_filters_by_status_and_text() {
    with_env(&[], || {
        let pending = expenses::run(
            &RuntimeOptions::default(),
            &ExpensesArgs { status: Some("pending".to_string()), ..ExpensesArgs::default() },
        );
        assert_eq!(pending.exit_code, 0);
        let payload = parse_payload(&pending.output);
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(4));
        assert_eq!(payload["data"][0]["id"], "EXP-1008");

        let conference = expenses::run(
            &RuntimeOptions::default(),
            &ExpensesArgs { search: Some("CONFERENCE".to_string()), ..ExpensesArgs::default() },
        );
        let payload = parse_payload(&conference.output);
        let ids: Vec<&str> = payload["data"]
            .as_array()
            .map(|items| items.iter().filter_map(|item| item["id"].as_str()).collect())
            .unwrap_or_default();
        assert_eq!(ids, vec!["EXP-1004", "EXP-1007"]);
    });
}

#[test]
fn expenses_rejects_unknown_status() {
    with_env(&[], || {
        let result = expenses::run(
            &RuntimeOptions::default(),
            &ExpensesArgs { status: Some("archived".to_string()), ..ExpensesArgs::default() },
        );
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
    });
}

#[test]
fn vote_reaching_threshold_approves_expense() {
    with_env(&[], || {
        let result = vote::run(
            &RuntimeOptions::default(),
            &vote_args("EXP-1001", "Sarah Johnson", "approve"),
        );
        assert_eq!(result.exit_code, 0, "expected vote to be accepted");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "vote");
        assert_eq!(payload["data"]["status"], "Approved");
        assert_eq!(payload["data"]["votes"]["Sarah Johnson"], "Approve");
    });
}

#[test]
fn vote_reports_domain_failures_with_error_class() {
    with_env(&[], || {
        let outsider = vote::run(
            &RuntimeOptions::default(),
            &vote_args("EXP-1001", "Emily Davis", "approve"),
        );
        assert_eq!(outsider.exit_code, 1);
        let outsider = parse_payload(&outsider.output);
        assert_eq!(outsider["error_class"], "unauthorized_voter");
        assert_eq!(outsider["user_message"], "You are not an approver for this expense.");
        assert!(outsider["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));

        let finalized = vote::run(
            &RuntimeOptions::default(),
            &vote_args("EXP-1004", "David Wilson", "reject"),
        );
        assert_eq!(finalized.exit_code, 1);
        assert_eq!(parse_payload(&finalized.output)["error_class"], "already_finalized");

        let unknown =
            vote::run(&RuntimeOptions::default(), &vote_args("EXP-9999", "John Smith", "approve"));
        assert_eq!(parse_payload(&unknown.output)["error_class"], "not_found");

        let bad_decision =
            vote::run(&RuntimeOptions::default(), &vote_args("EXP-1001", "John Smith", "maybe"));
        assert_eq!(parse_payload(&bad_decision.output)["error_class"], "validation");
    });
}

#[test]
fn path_lists_chain_with_recorded_votes() {
    with_env(&[], || {
        let result = path::run(&RuntimeOptions::default(), "EXP-1001");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let steps = payload["data"].as_array().cloned().unwrap_or_default();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["approver"], "John Smith");
        assert_eq!(steps[0]["vote"], "Approve");
        assert_eq!(steps[1]["approver"], "Sarah Johnson");
        assert!(steps[1]["vote"].is_null());

        let missing = path::run(&RuntimeOptions::default(), "EXP-0000");
        assert_eq!(missing.exit_code, 1);
        assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");
    });
}

#[test]
fn rules_are_listed_by_manager() {
    with_env(&[], || {
        let result = rules::run(&RuntimeOptions::default());
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"][0]["manager"], "David Wilson");
        assert_eq!(payload["data"][1]["manager"], "John Smith");
        assert_eq!(payload["data"][1]["min_approval_pct"], 60);
    });
}

#[test]
fn config_reports_env_and_file_sources() {
    with_env(&[("EXPENSY_APPROVALS_DEFAULT_MIN_APPROVAL_PCT", "80")], || {
        let dir = TempDir::new().expect("temp dir");
        let config_path = dir.path().join("expensy.toml");
        fs::write(&config_path, "[logging]\nlevel = \"debug\"\n").expect("write config");

        let options = RuntimeOptions { config_path: Some(config_path), dataset_path: None };
        let result = config::run(&options);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let entries = payload["data"].as_array().cloned().unwrap_or_default();
        let entry = |key: &str| {
            entries.iter().find(|entry| entry["key"] == key).cloned().unwrap_or(Value::Null)
        };
        assert_eq!(entry("approvals.default_min_approval_pct")["value"], "80");
        assert_eq!(
            entry("approvals.default_min_approval_pct")["source"],
            "env (EXPENSY_APPROVALS_DEFAULT_MIN_APPROVAL_PCT)"
        );
        assert_eq!(entry("logging.level")["value"], "debug");
        assert!(entry("logging.level")["source"].as_str().unwrap_or("").starts_with("file ("));
        assert_eq!(entry("approvals.fallback_to_manager")["source"], "default");
    });
}

#[test]
fn invalid_env_override_is_a_config_failure() {
    with_env(&[("EXPENSY_APPROVALS_FALLBACK_TO_MANAGER", "sometimes")], || {
        let result = seed::run(&RuntimeOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert_eq!(
            payload["user_message"],
            "An internal error occurred. Check the service configuration."
        );
        assert!(payload["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    });
}

#[test]
fn custom_dataset_with_zero_threshold_rule_is_rejected_when_disallowed() {
    with_env(&[("EXPENSY_APPROVALS_ALLOW_ZERO_THRESHOLD", "false")], || {
        let dir = TempDir::new().expect("temp dir");
        let dataset_path = dir.path().join("dataset.json");
        fs::write(
            &dataset_path,
            r#"{
              "employees": [
                { "id": "Bo Chen", "name": "Bo Chen", "email": "bo.chen@company.com", "role": "Manager", "manager": null }
              ],
              "rules": [
                { "manager": "Bo Chen", "approvers": [], "manager_is_approver": true, "min_approval_pct": 0 }
              ]
            }"#,
        )
        .expect("write dataset");

        let options = RuntimeOptions { config_path: None, dataset_path: Some(dataset_path) };
        let result = rules::run(&options);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "dataset");
        assert!(payload["message"].as_str().unwrap_or("").contains("0%"));
    });
}

fn vote_args(expense: &str, approver: &str, decision: &str) -> VoteArgs {
    VoteArgs {
        expense: expense.to_string(),
        approver: approver.to_string(),
        decision: decision.to_string(),
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "EXPENSY_APPROVALS_FALLBACK_TO_MANAGER",
        "EXPENSY_APPROVALS_DEFAULT_CHAIN",
        "EXPENSY_APPROVALS_DEFAULT_MIN_APPROVAL_PCT",
        "EXPENSY_APPROVALS_ALLOW_ZERO_THRESHOLD",
        "EXPENSY_APPROVALS_HIGH_VALUE_THRESHOLD",
        "EXPENSY_LOGGING_LEVEL",
        "EXPENSY_LOGGING_FORMAT",
        "EXPENSY_LOG_LEVEL",
        "EXPENSY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
