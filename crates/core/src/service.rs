use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::approvals::{ChainBuilder, ChainPolicy, VoteOutcome};
use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
use crate::config::AppConfig;
use crate::directory::OrgDirectory;
use crate::domain::employee::{Employee, EmployeeId, Role};
use crate::domain::expense::{
    ApprovalPolicy, Decision, Expense, ExpenseDraft, ExpenseId, ExpenseStatus,
};
use crate::domain::rule::ApprovalRule;
use crate::errors::ApprovalError;
use crate::filter::{ExpenseFilter, ExpenseOverview};
use crate::registry::ExpenseRegistry;
use crate::rules::{RuleStore, RuleUpsert};

/// Entry point for the presentation layer.
///
/// Rule and directory changes are serialized among themselves; they are only
/// read while a submission snapshots its chain, never while a vote is
/// evaluated.
pub struct ApprovalService<S = InMemoryAuditSink> {
    rules: RwLock<RuleStore>,
    directory: RwLock<OrgDirectory>,
    registry: ExpenseRegistry,
    chain_policy: ChainPolicy,
    high_value_threshold: Decimal,
    audit: S,
}

impl<S> ApprovalService<S>
where
    S: AuditSink,
{
    pub fn new(config: &AppConfig, directory: OrgDirectory, audit: S) -> Self {
        Self {
            rules: RwLock::new(RuleStore::new(config.approvals.allow_zero_threshold)),
            directory: RwLock::new(directory),
            registry: ExpenseRegistry::default(),
            chain_policy: config.chain_policy(),
            high_value_threshold: config.approvals.high_value_threshold,
            audit,
        }
    }

    pub fn audit(&self) -> &S {
        &self.audit
    }

    pub fn submit_expense(&self, draft: ExpenseDraft) -> Result<Expense, ApprovalError> {
        let correlation_id = new_correlation_id();
        let expense_id = draft.id.clone();
        let submitter = draft.submitter.clone();

        let result =
            self.resolve_policy(&submitter).and_then(|policy| self.registry.submit(draft, policy));
        let expense = match result {
            Ok(expense) => expense,
            Err(error) => {
                warn!(
                    event_name = "expense.submit_rejected",
                    correlation_id = %correlation_id,
                    expense_id = %expense_id,
                    submitter = %submitter,
                    error_class = error.class(),
                    "expense submission rejected: {error}"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(expense_id),
                        correlation_id,
                        "expense.submit_rejected",
                        AuditCategory::Submission,
                        submitter.0,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        info!(
            event_name = "expense.submitted",
            correlation_id = %correlation_id,
            expense_id = %expense.id,
            submitter = %expense.submitter,
            chain_size = expense.policy.chain.len(),
            min_approval_pct = expense.policy.min_approval_pct,
            "expense submitted"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(expense.id.clone()),
                correlation_id.clone(),
                "expense.submitted",
                AuditCategory::Submission,
                expense.submitter.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("chain", join_ids(&expense.policy.chain))
            .with_metadata("min_approval_pct", expense.policy.min_approval_pct.to_string())
            .with_metadata("source", format!("{:?}", expense.policy.source)),
        );

        if expense.status == ExpenseStatus::Approved {
            warn!(
                event_name = "expense.auto_approved",
                correlation_id = %correlation_id,
                expense_id = %expense.id,
                "expense approved without votes because its threshold is 0%; check the approval rule"
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(expense.id.clone()),
                    correlation_id,
                    "expense.finalized",
                    AuditCategory::Submission,
                    "approval-engine",
                    AuditOutcome::Flagged,
                )
                .with_metadata("status", "Approved")
                .with_metadata("reason", "zero_threshold"),
            );
        }

        Ok(expense)
    }

    pub fn cast_vote(
        &self,
        expense_id: &ExpenseId,
        approver: &EmployeeId,
        decision: Decision,
    ) -> Result<Expense, ApprovalError> {
        let correlation_id = new_correlation_id();

        let receipt = match self.registry.vote(expense_id, approver, decision) {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(
                    event_name = "expense.vote_rejected",
                    correlation_id = %correlation_id,
                    expense_id = %expense_id,
                    approver = %approver,
                    error_class = error.class(),
                    "vote rejected: {error}"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(expense_id.clone()),
                        correlation_id,
                        "expense.vote_rejected",
                        AuditCategory::Vote,
                        approver.0.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("decision", format!("{decision:?}"))
                    .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        self.record_vote(&correlation_id, expense_id, &receipt.outcome);
        Ok(receipt.expense)
    }

    /// Stores `rule` and returns the normalized copy that was saved.
    pub fn upsert_rule(&self, rule: ApprovalRule) -> Result<ApprovalRule, ApprovalError> {
        let correlation_id = new_correlation_id();
        let RuleUpsert { stored, replaced } = write(&self.rules).upsert(rule)?;
        let manager = stored.manager.clone();

        info!(
            event_name = "rule.upserted",
            correlation_id = %correlation_id,
            manager = %manager,
            replaced = replaced.is_some(),
            "approval rule saved"
        );
        self.audit.emit(
            AuditEvent::new(
                None,
                correlation_id.clone(),
                "rule.upserted",
                AuditCategory::Rule,
                manager.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("voters", join_ids(&stored.voters()))
            .with_metadata("min_approval_pct", stored.min_approval_pct.to_string()),
        );

        if stored.min_approval_pct == 0 {
            warn!(
                event_name = "rule.zero_threshold_flagged",
                correlation_id = %correlation_id,
                manager = %manager,
                "approval rule has a 0% threshold and will auto-approve every expense it covers"
            );
            self.audit.emit(AuditEvent::new(
                None,
                correlation_id,
                "rule.zero_threshold_flagged",
                AuditCategory::Rule,
                manager.0,
                AuditOutcome::Flagged,
            ));
        }

        Ok(stored)
    }

    /// Removes the rule for `manager`. In-flight expenses keep the chain they
    /// were submitted with.
    pub fn delete_rule(&self, manager: &EmployeeId) -> Option<ApprovalRule> {
        let removed = write(&self.rules).remove(manager);
        if removed.is_some() {
            let correlation_id = new_correlation_id();
            info!(
                event_name = "rule.deleted",
                correlation_id = %correlation_id,
                manager = %manager,
                "approval rule deleted"
            );
            self.audit.emit(AuditEvent::new(
                None,
                correlation_id,
                "rule.deleted",
                AuditCategory::Rule,
                manager.0.clone(),
                AuditOutcome::Success,
            ));
        }
        removed
    }

    pub fn list_rules(&self) -> Vec<ApprovalRule> {
        read(&self.rules).list()
    }

    pub fn list_expenses(&self, filter: &ExpenseFilter) -> Vec<Expense> {
        self.registry.list(filter)
    }

    pub fn get_expense(&self, expense_id: &ExpenseId) -> Result<Expense, ApprovalError> {
        self.registry.get(expense_id)
    }

    pub fn get_approval_path(&self, expense_id: &ExpenseId) -> Result<Vec<EmployeeId>, ApprovalError> {
        self.registry.get(expense_id).map(|expense| expense.approval_chain().to_vec())
    }

    pub fn overview(&self, now: DateTime<Utc>) -> ExpenseOverview {
        self.registry.overview(now, self.high_value_threshold)
    }

    pub fn upsert_employee(&self, employee: Employee) -> Result<(), ApprovalError> {
        let id = employee.id.clone();
        write(&self.directory).upsert(employee)?;
        self.audit.emit(AuditEvent::new(
            None,
            new_correlation_id(),
            "employee.upserted",
            AuditCategory::Directory,
            id.0,
            AuditOutcome::Success,
        ));
        Ok(())
    }

    pub fn remove_employee(&self, id: &EmployeeId) -> Result<Employee, ApprovalError> {
        let removed = write(&self.directory).remove(id)?;
        self.audit.emit(AuditEvent::new(
            None,
            new_correlation_id(),
            "employee.removed",
            AuditCategory::Directory,
            id.0.clone(),
            AuditOutcome::Success,
        ));
        Ok(removed)
    }

    pub fn set_employee_role(&self, id: &EmployeeId, role: Role) -> Result<Employee, ApprovalError> {
        let mut directory = write(&self.directory);
        let updated = directory.set_role(id, role)?.clone();
        drop(directory);
        self.audit.emit(
            AuditEvent::new(
                None,
                new_correlation_id(),
                "employee.role_changed",
                AuditCategory::Directory,
                id.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("role", format!("{role:?}")),
        );
        Ok(updated)
    }

    pub fn list_employees(&self) -> Vec<Employee> {
        read(&self.directory).list()
    }

    fn resolve_policy(&self, submitter: &EmployeeId) -> Result<ApprovalPolicy, ApprovalError> {
        let rules = read(&self.rules);
        let directory = read(&self.directory);
        ChainBuilder::new(&rules, &directory, &self.chain_policy).resolve(submitter)
    }

    fn record_vote(&self, correlation_id: &str, expense_id: &ExpenseId, outcome: &VoteOutcome) {
        info!(
            event_name = "expense.vote_recorded",
            correlation_id = %correlation_id,
            expense_id = %expense_id,
            approver = %outcome.voter,
            decision = ?outcome.decision,
            replaced = outcome.replaced.is_some(),
            approvals = outcome.tally.approvals,
            required_approvals = outcome.tally.required_approvals,
            outstanding = outcome.tally.outstanding(),
            status = ?outcome.status,
            "vote recorded"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(expense_id.clone()),
                correlation_id,
                "expense.vote_recorded",
                AuditCategory::Vote,
                outcome.voter.0.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("decision", format!("{:?}", outcome.decision))
            .with_metadata("status", format!("{:?}", outcome.status)),
        );

        if outcome.finalized() {
            info!(
                event_name = "expense.finalized",
                correlation_id = %correlation_id,
                expense_id = %expense_id,
                status = ?outcome.status,
                "expense finalized"
            );
            self.audit.emit(
                AuditEvent::new(
                    Some(expense_id.clone()),
                    correlation_id,
                    "expense.finalized",
                    AuditCategory::Vote,
                    "approval-engine",
                    AuditOutcome::Success,
                )
                .with_metadata("status", format!("{:?}", outcome.status))
                .with_metadata("approvals", outcome.tally.approvals.to_string())
                .with_metadata("rejections", outcome.tally.rejections.to_string()),
            );
        }
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn join_ids(ids: &[EmployeeId]) -> String {
    ids.iter().map(EmployeeId::as_str).collect::<Vec<_>>().join(", ")
}

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
