use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::{ApprovalError, DomainError};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpenseId(pub String);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseStatus {
    Pending,
    Approved,
    Rejected,
}

impl ExpenseStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for ExpenseStatus {
    type Err = ApprovalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ApprovalError::Validation(format!(
                "unsupported status `{other}` (expected pending|approved|rejected)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Travel,
    Food,
    Accommodation,
    Misc,
    Supplies,
}

impl ExpenseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Travel => "Travel",
            Self::Food => "Food",
            Self::Accommodation => "Accommodation",
            Self::Misc => "Misc",
            Self::Supplies => "Supplies",
        }
    }
}

impl std::str::FromStr for ExpenseCategory {
    type Err = ApprovalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "travel" => Ok(Self::Travel),
            "food" => Ok(Self::Food),
            "accommodation" => Ok(Self::Accommodation),
            "misc" => Ok(Self::Misc),
            "supplies" => Ok(Self::Supplies),
            other => Err(ApprovalError::Validation(format!(
                "unsupported category `{other}` (expected travel|food|accommodation|misc|supplies)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = ApprovalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(Self::Approve),
            "reject" | "rejected" => Ok(Self::Reject),
            other => Err(ApprovalError::Validation(format!(
                "unsupported decision `{other}` (expected approve|reject)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySource {
    Rule { manager: EmployeeId },
    ManagerFallback { manager: EmployeeId },
    DefaultChain,
}

/// Chain and threshold snapshotted when the expense is submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    pub chain: Vec<EmployeeId>,
    pub min_approval_pct: u8,
    pub source: PolicySource,
}

impl ApprovalPolicy {
    pub fn contains(&self, approver: &EmployeeId) -> bool {
        self.chain.contains(approver)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub id: ExpenseId,
    pub submitter: EmployeeId,
    pub description: String,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub currency: String,
    pub submitted_at: DateTime<Utc>,
}

impl ExpenseDraft {
    pub fn validate(&self) -> Result<(), ApprovalError> {
        if self.id.0.trim().is_empty() {
            return Err(ApprovalError::Validation("expense id must not be blank".to_string()));
        }
        if self.submitter.is_blank() {
            return Err(ApprovalError::Validation(format!(
                "expense `{}` has no submitter",
                self.id
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ApprovalError::Validation(format!(
                "expense `{}` amount must be positive, got {}",
                self.id, self.amount
            )));
        }
        let currency_ok =
            self.currency.len() == 3 && self.currency.chars().all(|ch| ch.is_ascii_uppercase());
        if !currency_ok {
            return Err(ApprovalError::Validation(format!(
                "expense `{}` currency `{}` must be a 3-letter upper-case ISO code",
                self.id, self.currency
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub submitter: EmployeeId,
    pub description: String,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub currency: String,
    pub submitted_at: DateTime<Utc>,
    pub status: ExpenseStatus,
    pub policy: ApprovalPolicy,
    pub votes: BTreeMap<EmployeeId, Decision>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn from_draft(draft: ExpenseDraft, policy: ApprovalPolicy) -> Self {
        Self {
            id: draft.id,
            submitter: draft.submitter,
            description: draft.description,
            category: draft.category,
            amount: draft.amount,
            currency: draft.currency,
            submitted_at: draft.submitted_at,
            status: ExpenseStatus::Pending,
            policy,
            votes: BTreeMap::new(),
            decided_at: None,
        }
    }

    pub fn approval_chain(&self) -> &[EmployeeId] {
        &self.policy.chain
    }

    pub fn can_transition_to(&self, next: ExpenseStatus) -> bool {
        matches!(
            (self.status, next),
            (ExpenseStatus::Pending, ExpenseStatus::Pending)
                | (ExpenseStatus::Pending, ExpenseStatus::Approved)
                | (ExpenseStatus::Pending, ExpenseStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: ExpenseStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidExpenseTransition { from: self.status, to: next });
        }
        if next.is_terminal() {
            self.decided_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        ApprovalPolicy, Expense, ExpenseCategory, ExpenseDraft, ExpenseId, ExpenseStatus,
        PolicySource,
    };
    use crate::domain::employee::EmployeeId;
    use crate::errors::{ApprovalError, DomainError};

    fn draft() -> ExpenseDraft {
        ExpenseDraft {
            id: ExpenseId("EXP-1".to_string()),
            submitter: EmployeeId::new("Emily Davis"),
            description: "Flight tickets".to_string(),
            category: ExpenseCategory::Travel,
            amount: Decimal::new(125_000, 2),
            currency: "USD".to_string(),
            submitted_at: Utc::now(),
        }
    }

    fn expense() -> Expense {
        Expense::from_draft(
            draft(),
            ApprovalPolicy {
                chain: vec![EmployeeId::new("John Smith")],
                min_approval_pct: 100,
                source: PolicySource::ManagerFallback { manager: EmployeeId::new("John Smith") },
            },
        )
    }

    #[test]
    fn terminal_status_cannot_be_left() {
        let mut expense = expense();
        expense.transition_to(ExpenseStatus::Rejected).expect("pending -> rejected");
        assert!(expense.decided_at.is_some());

        let error = expense.transition_to(ExpenseStatus::Approved).expect_err("rejected is final");
        assert_eq!(
            error,
            DomainError::InvalidExpenseTransition {
                from: ExpenseStatus::Rejected,
                to: ExpenseStatus::Approved,
            }
        );
    }

    #[test]
    fn draft_rejects_non_positive_amount_and_bad_currency() {
        let mut zero = draft();
        zero.amount = Decimal::ZERO;
        assert!(matches!(zero.validate(), Err(ApprovalError::Validation(_))));

        let mut currency = draft();
        currency.currency = "usd".to_string();
        assert!(matches!(currency.validate(), Err(ApprovalError::Validation(message)) if message.contains("ISO")));
    }

    #[test]
    fn categories_parse_case_insensitively() {
        let category: ExpenseCategory = "ACCOMMODATION".parse().expect("category parses");
        assert_eq!(category, ExpenseCategory::Accommodation);
        assert!("lodging".parse::<ExpenseCategory>().is_err());
    }
}
