use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::approvals::{ApprovalEvaluator, VoteOutcome};
use crate::domain::employee::EmployeeId;
use crate::domain::expense::{ApprovalPolicy, Decision, Expense, ExpenseDraft, ExpenseId};
use crate::errors::{ApprovalError, DomainError};
use crate::filter::{ExpenseFilter, ExpenseOverview};

#[derive(Clone, Debug, PartialEq)]
pub struct VoteReceipt {
    pub expense: Expense,
    pub outcome: VoteOutcome,
}

/// Owner of every expense record and the only writer of status and votes.
///
/// Each record sits behind its own mutex so votes on one expense are applied
/// one at a time while different expenses proceed in parallel. The outer map
/// lock is held for writing only while inserting.
#[derive(Default)]
pub struct ExpenseRegistry {
    expenses: RwLock<HashMap<ExpenseId, Arc<Mutex<Expense>>>>,
    evaluator: ApprovalEvaluator,
}

impl ExpenseRegistry {
    pub fn submit(
        &self,
        draft: ExpenseDraft,
        policy: ApprovalPolicy,
    ) -> Result<Expense, ApprovalError> {
        draft.validate()?;
        if policy.chain.is_empty() {
            return Err(DomainError::InvariantViolation(format!(
                "expense `{}` submitted with an empty approval chain",
                draft.id
            ))
            .into());
        }

        let mut expense = Expense::from_draft(draft, policy);
        let initial = self.evaluator.evaluate(&expense.policy, &expense.votes);
        expense.transition_to(initial)?;

        let mut expenses = write(&self.expenses);
        match expenses.entry(expense.id.clone()) {
            Entry::Occupied(_) => Err(ApprovalError::DuplicateId { expense_id: expense.id }),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(expense.clone())));
                Ok(expense)
            }
        }
    }

    pub fn vote(
        &self,
        expense_id: &ExpenseId,
        voter: &EmployeeId,
        decision: Decision,
    ) -> Result<VoteReceipt, ApprovalError> {
        let record = self.record(expense_id)?;
        let mut expense = lock(&record);
        let outcome = self.evaluator.apply_vote(&mut expense, voter, decision)?;
        Ok(VoteReceipt { expense: expense.clone(), outcome })
    }

    pub fn get(&self, expense_id: &ExpenseId) -> Result<Expense, ApprovalError> {
        let record = self.record(expense_id)?;
        let expense = lock(&record).clone();
        Ok(expense)
    }

    /// Matching expenses, newest submission first.
    pub fn list(&self, filter: &ExpenseFilter) -> Vec<Expense> {
        let mut matched: Vec<Expense> =
            self.snapshot().into_iter().filter(|expense| filter.matches(expense)).collect();
        matched.sort_by(|left, right| {
            right.submitted_at.cmp(&left.submitted_at).then_with(|| left.id.cmp(&right.id))
        });
        matched
    }

    pub fn overview(&self, now: DateTime<Utc>, high_value_threshold: Decimal) -> ExpenseOverview {
        ExpenseOverview::from_expenses(&self.snapshot(), now, high_value_threshold)
    }

    pub fn len(&self) -> usize {
        read(&self.expenses).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, expense_id: &ExpenseId) -> Result<Arc<Mutex<Expense>>, ApprovalError> {
        read(&self.expenses)
            .get(expense_id)
            .cloned()
            .ok_or_else(|| ApprovalError::expense_not_found(expense_id))
    }

    fn snapshot(&self) -> Vec<Expense> {
        let records: Vec<Arc<Mutex<Expense>>> = read(&self.expenses).values().cloned().collect();
        records.iter().map(|record| lock(record).clone()).collect()
    }
}

// Records are only ever replaced wholesale, so a poisoned lock still guards a
// consistent value.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
