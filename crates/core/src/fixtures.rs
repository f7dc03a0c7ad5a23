use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::AuditSink;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::expense::{Decision, ExpenseCategory, ExpenseDraft, ExpenseId};
use crate::domain::rule::ApprovalRule;
use crate::errors::ApprovalError;
use crate::service::ApprovalService;

const DEMO_DATASET: &str = r#"{
  "employees": [
    { "id": "Sarah Johnson", "name": "Sarah Johnson", "email": "sarah.johnson@company.com", "role": "Admin", "manager": null },
    { "id": "John Smith", "name": "John Smith", "email": "john.smith@company.com", "role": "Manager", "manager": "Sarah Johnson" },
    { "id": "David Wilson", "name": "David Wilson", "email": "david.wilson@company.com", "role": "Manager", "manager": "Sarah Johnson" },
    { "id": "Emily Davis", "name": "Emily Davis", "email": "emily.davis@company.com", "role": "Employee", "manager": "John Smith" },
    { "id": "Michael Brown", "name": "Michael Brown", "email": "michael.brown@company.com", "role": "Employee", "manager": "John Smith" }
  ],
  "rules": [
    { "manager": "John Smith", "approvers": ["Sarah Johnson", "David Wilson"], "manager_is_approver": true, "min_approval_pct": 60 },
    { "manager": "David Wilson", "approvers": ["Sarah Johnson"], "manager_is_approver": false, "min_approval_pct": 100 }
  ],
  "expenses": [
    {
      "id": "EXP-1001", "submitter": "Emily Davis", "description": "Flight tickets to NYC for client meeting",
      "category": "Travel", "amount": "1250.00", "currency": "USD", "submitted_at": "2025-10-01T09:00:00Z",
      "votes": [{ "approver": "John Smith", "decision": "Approve" }]
    },
    {
      "id": "EXP-1002", "submitter": "Michael Brown", "description": "Team lunch with vendors",
      "category": "Food", "amount": "234.50", "currency": "USD", "submitted_at": "2025-10-02T12:30:00Z"
    },
    {
      "id": "EXP-1003", "submitter": "John Smith", "description": "Office supplies and stationery",
      "category": "Supplies", "amount": "89.99", "currency": "USD", "submitted_at": "2025-09-28T10:15:00Z",
      "votes": [{ "approver": "Sarah Johnson", "decision": "Approve" }]
    },
    {
      "id": "EXP-1004", "submitter": "Emily Davis", "description": "Hotel stay - Conference in Boston",
      "category": "Accommodation", "amount": "450.00", "currency": "USD", "submitted_at": "2025-09-25T16:45:00Z",
      "votes": [
        { "approver": "John Smith", "decision": "Approve" },
        { "approver": "Sarah Johnson", "decision": "Approve" }
      ]
    },
    {
      "id": "EXP-1005", "submitter": "Michael Brown", "description": "Uber rides for client visits",
      "category": "Travel", "amount": "67.80", "currency": "USD", "submitted_at": "2025-09-30T08:20:00Z",
      "votes": [{ "approver": "John Smith", "decision": "Reject" }]
    },
    {
      "id": "EXP-1006", "submitter": "David Wilson", "description": "Client dinner - Annual review meeting",
      "category": "Food", "amount": "3200.00", "currency": "USD", "submitted_at": "2025-10-03T19:00:00Z"
    },
    {
      "id": "EXP-1007", "submitter": "Emily Davis", "description": "Conference registration fee",
      "category": "Misc", "amount": "599.00", "currency": "USD", "submitted_at": "2025-09-20T11:00:00Z",
      "votes": [
        { "approver": "John Smith", "decision": "Approve" },
        { "approver": "Sarah Johnson", "decision": "Approve" }
      ]
    },
    {
      "id": "EXP-1008", "submitter": "Michael Brown", "description": "Laptop accessories and peripherals",
      "category": "Supplies", "amount": "156.75", "currency": "USD", "submitted_at": "2025-10-04T14:10:00Z"
    }
  ]
}"#;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to load dataset: {0}")]
    Load(#[from] ApprovalError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedVote {
    pub approver: EmployeeId,
    pub decision: Decision,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedExpense {
    pub id: ExpenseId,
    pub submitter: EmployeeId,
    pub description: String,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: Vec<SeedVote>,
}

impl SeedExpense {
    fn draft(&self) -> ExpenseDraft {
        ExpenseDraft {
            id: self.id.clone(),
            submitter: self.submitter.clone(),
            description: self.description.clone(),
            category: self.category,
            amount: self.amount,
            currency: self.currency.clone(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Employees, rules and expenses (with replayed votes) used to stand up a
/// populated service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub rules: Vec<ApprovalRule>,
    #[serde(default)]
    pub expenses: Vec<SeedExpense>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub employees: usize,
    pub rules: usize,
    pub expenses: usize,
    pub votes: usize,
}

impl Dataset {
    pub fn demo() -> Result<Self, FixtureError> {
        Self::from_json(DEMO_DATASET)
    }

    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Loads the dataset through the service so every record goes through
    /// normal validation, chain resolution and vote evaluation.
    pub fn load_into<S: AuditSink>(
        &self,
        service: &ApprovalService<S>,
    ) -> Result<SeedReport, FixtureError> {
        let mut report = SeedReport::default();

        for employee in &self.employees {
            service.upsert_employee(employee.clone())?;
            report.employees += 1;
        }
        for rule in &self.rules {
            service.upsert_rule(rule.clone())?;
            report.rules += 1;
        }
        for expense in &self.expenses {
            service.submit_expense(expense.draft())?;
            report.expenses += 1;
            for vote in &expense.votes {
                service.cast_vote(&expense.id, &vote.approver, vote.decision)?;
                report.votes += 1;
            }
        }

        Ok(report)
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Dataset, FixtureError, SeedReport};
    use crate::audit::InMemoryAuditSink;
    use crate::config::AppConfig;
    use crate::directory::OrgDirectory;
    use crate::domain::employee::EmployeeId;
    use crate::domain::expense::{Decision, ExpenseId, ExpenseStatus, PolicySource};
    use crate::errors::ApprovalError;
    use crate::filter::ExpenseFilter;
    use crate::service::ApprovalService;

    fn empty_service() -> ApprovalService {
        ApprovalService::new(
            &AppConfig::default(),
            OrgDirectory::default(),
            InMemoryAuditSink::default(),
        )
    }

    fn status_of(service: &ApprovalService, id: &str) -> ExpenseStatus {
        service.get_expense(&ExpenseId(id.to_string())).expect("seeded expense").status
    }

    #[test]
    fn demo_dataset_replays_votes_into_expected_statuses() {
        let service = empty_service();

        let report = Dataset::demo().expect("demo parses").load_into(&service).expect("demo loads");

        assert_eq!(report, SeedReport { employees: 5, rules: 2, expenses: 8, votes: 7 });
        assert_eq!(status_of(&service, "EXP-1001"), ExpenseStatus::Pending);
        assert_eq!(status_of(&service, "EXP-1002"), ExpenseStatus::Pending);
        assert_eq!(status_of(&service, "EXP-1003"), ExpenseStatus::Approved);
        assert_eq!(status_of(&service, "EXP-1004"), ExpenseStatus::Approved);
        assert_eq!(status_of(&service, "EXP-1005"), ExpenseStatus::Rejected);
        assert_eq!(status_of(&service, "EXP-1006"), ExpenseStatus::Pending);
        assert_eq!(status_of(&service, "EXP-1007"), ExpenseStatus::Approved);
        assert_eq!(status_of(&service, "EXP-1008"), ExpenseStatus::Pending);
        assert_eq!(service.list_expenses(&ExpenseFilter::default()).len(), 8);
    }

    #[test]
    fn manager_without_rule_falls_back_to_their_own_manager() {
        let service = empty_service();
        Dataset::demo().expect("demo parses").load_into(&service).expect("demo loads");

        let expense = service.get_expense(&ExpenseId("EXP-1006".to_string())).expect("seeded");

        assert_eq!(expense.policy.chain, vec![EmployeeId::new("Sarah Johnson")]);
        assert_eq!(
            expense.policy.source,
            PolicySource::ManagerFallback { manager: EmployeeId::new("Sarah Johnson") }
        );
    }

    #[test]
    fn malformed_json_and_invalid_records_are_reported() {
        let parse = Dataset::from_json("{ \"employees\": [").expect_err("truncated json");
        assert!(matches!(parse, FixtureError::Parse(_)));

        let dataset = Dataset::from_json(
            r#"{
              "employees": [
                { "id": "Ann Lee", "name": "Ann Lee", "email": "not-an-email", "role": "Employee", "manager": null }
              ]
            }"#,
        )
        .expect("well-formed json");
        let load = dataset.load_into(&empty_service()).expect_err("invalid email");
        assert!(matches!(load, FixtureError::Load(ApprovalError::Validation(_))));
    }

    #[test]
    fn padded_ids_in_json_are_trimmed_before_matching() {
        let dataset = Dataset::from_json(
            r#"{
              "employees": [
                { "id": " Ann Lee ", "name": "Ann Lee", "email": "ann.lee@company.com", "role": "Employee", "manager": "Bo Chen  " },
                { "id": "Bo Chen", "name": "Bo Chen", "email": "bo.chen@company.com", "role": "Manager", "manager": null }
              ],
              "rules": [
                { "manager": " Bo Chen", "approvers": [" Sarah Johnson "], "manager_is_approver": false, "min_approval_pct": 100 }
              ],
              "expenses": [
                {
                  "id": "EXP-1", "submitter": "Ann Lee ", "description": "Train tickets",
                  "category": "Travel", "amount": "42.00", "submitted_at": "2025-10-01T09:00:00Z"
                }
              ]
            }"#,
        )
        .expect("well-formed json");
        let service = empty_service();
        dataset.load_into(&service).expect("dataset loads");

        let expense_id = ExpenseId("EXP-1".to_string());
        assert_eq!(
            service.get_approval_path(&expense_id).expect("path"),
            vec![EmployeeId::new("Sarah Johnson")]
        );
        let approved = service
            .cast_vote(&expense_id, &EmployeeId::new("Sarah Johnson"), Decision::Approve)
            .expect("trimmed approver is in the chain");
        assert_eq!(approved.status, ExpenseStatus::Approved);
    }
}
