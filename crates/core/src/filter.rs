use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::expense::{Expense, ExpenseCategory, ExpenseStatus};

/// Read-only predicate over stored expenses. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub status: Option<ExpenseStatus>,
    pub category: Option<ExpenseCategory>,
    pub text: Option<String>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if self.status.is_some_and(|status| status != expense.status) {
            return false;
        }
        if self.category.is_some_and(|category| category != expense.category) {
            return false;
        }

        let needle = match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_lowercase(),
            _ => return true,
        };
        [expense.description.as_str(), expense.submitter.as_str(), expense.category.as_str()]
            .iter()
            .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseOverview {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub high_value_pending: usize,
    /// Totals per currency for expenses submitted in the current month.
    pub month_totals: BTreeMap<String, Decimal>,
}

impl ExpenseOverview {
    pub fn from_expenses<'a>(
        expenses: impl IntoIterator<Item = &'a Expense>,
        now: DateTime<Utc>,
        high_value_threshold: Decimal,
    ) -> Self {
        let mut overview = Self::default();
        for expense in expenses {
            match expense.status {
                ExpenseStatus::Pending => {
                    overview.pending += 1;
                    if expense.amount >= high_value_threshold {
                        overview.high_value_pending += 1;
                    }
                }
                ExpenseStatus::Approved => overview.approved += 1,
                ExpenseStatus::Rejected => overview.rejected += 1,
            }

            let same_month = expense.submitted_at.year() == now.year()
                && expense.submitted_at.month() == now.month();
            if same_month {
                *overview.month_totals.entry(expense.currency.clone()).or_default() +=
                    expense.amount;
            }
        }
        overview
    }
}
