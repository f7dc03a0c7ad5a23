use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::domain::expense::{ApprovalPolicy, Decision, Expense, ExpenseStatus};
use crate::errors::ApprovalError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub chain_size: usize,
    pub approvals: usize,
    pub rejections: usize,
    pub required_approvals: usize,
}

impl Tally {
    pub fn outstanding(&self) -> usize {
        self.chain_size.saturating_sub(self.approvals + self.rejections)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub previous: ExpenseStatus,
    pub status: ExpenseStatus,
    pub voter: EmployeeId,
    pub decision: Decision,
    pub replaced: Option<Decision>,
    pub tally: Tally,
}

impl VoteOutcome {
    pub fn finalized(&self) -> bool {
        !self.previous.is_terminal() && self.status.is_terminal()
    }
}

/// Vote aggregation for a single expense.
///
/// Any `Reject` from a chain member vetoes the expense. Otherwise it is
/// approved once `approvals * 100 >= min_approval_pct * chain_size`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApprovalEvaluator;

impl ApprovalEvaluator {
    pub fn tally(&self, policy: &ApprovalPolicy, votes: &BTreeMap<EmployeeId, Decision>) -> Tally {
        let mut approvals = 0;
        let mut rejections = 0;
        for member in &policy.chain {
            match votes.get(member) {
                Some(Decision::Approve) => approvals += 1,
                Some(Decision::Reject) => rejections += 1,
                None => {}
            }
        }

        let chain_size = policy.chain.len();
        let required = usize::from(policy.min_approval_pct) * chain_size;
        Tally { chain_size, approvals, rejections, required_approvals: required.div_ceil(100) }
    }

    pub fn evaluate(
        &self,
        policy: &ApprovalPolicy,
        votes: &BTreeMap<EmployeeId, Decision>,
    ) -> ExpenseStatus {
        let tally = self.tally(policy, votes);
        if tally.chain_size == 0 {
            return ExpenseStatus::Pending;
        }
        if tally.rejections > 0 {
            return ExpenseStatus::Rejected;
        }
        if tally.approvals * 100 >= usize::from(policy.min_approval_pct) * tally.chain_size {
            return ExpenseStatus::Approved;
        }
        ExpenseStatus::Pending
    }

    /// Records `decision` from `voter` and re-evaluates the expense.
    ///
    /// Either the vote and the resulting status are both committed, or the
    /// expense is left untouched.
    pub fn apply_vote(
        &self,
        expense: &mut Expense,
        voter: &EmployeeId,
        decision: Decision,
    ) -> Result<VoteOutcome, ApprovalError> {
        if expense.status.is_terminal() {
            return Err(ApprovalError::AlreadyFinalized {
                expense_id: expense.id.clone(),
                status: expense.status,
            });
        }
        if !expense.policy.contains(voter) {
            return Err(ApprovalError::UnauthorizedVoter {
                expense_id: expense.id.clone(),
                voter: voter.clone(),
            });
        }

        let previous = expense.status;
        let mut votes = expense.votes.clone();
        let replaced = votes.insert(voter.clone(), decision);
        let status = self.evaluate(&expense.policy, &votes);
        let tally = self.tally(&expense.policy, &votes);

        expense.transition_to(status)?;
        expense.votes = votes;

        Ok(VoteOutcome { previous, status, voter: voter.clone(), decision, replaced, tally })
    }
}
