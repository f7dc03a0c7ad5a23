use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::ApprovalError;

/// Manager-scoped approval configuration.
///
/// The effective voter set is `approvers` plus the manager when
/// `manager_is_approver` is set. It must never be empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub manager: EmployeeId,
    pub approvers: Vec<EmployeeId>,
    pub manager_is_approver: bool,
    pub min_approval_pct: u8,
}

impl ApprovalRule {
    pub fn new(
        manager: impl Into<EmployeeId>,
        approvers: Vec<EmployeeId>,
        manager_is_approver: bool,
        min_approval_pct: u8,
    ) -> Self {
        Self { manager: manager.into(), approvers, manager_is_approver, min_approval_pct }
    }

    /// Collapses duplicate approvers (first occurrence wins) and drops the
    /// manager from the additional approver list.
    pub fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.approvers.len());
        for approver in self.approvers.drain(..) {
            if approver.is_blank() || approver == self.manager || seen.contains(&approver) {
                continue;
            }
            seen.push(approver);
        }
        self.approvers = seen;
        self
    }

    pub fn validate(&self) -> Result<(), ApprovalError> {
        if self.manager.is_blank() {
            return Err(ApprovalError::Validation("rule manager must not be blank".to_string()));
        }
        if self.min_approval_pct > 100 {
            return Err(ApprovalError::Validation(format!(
                "rule for `{}` has min_approval_pct {} outside 0..=100",
                self.manager, self.min_approval_pct
            )));
        }
        if self.voters().is_empty() {
            return Err(ApprovalError::Validation(format!(
                "rule for `{}` has no eligible voters",
                self.manager
            )));
        }
        Ok(())
    }

    /// Ordered chain: the manager first when they vote, then the configured approvers.
    pub fn voters(&self) -> Vec<EmployeeId> {
        let mut voters = Vec::with_capacity(self.approvers.len() + 1);
        if self.manager_is_approver {
            voters.push(self.manager.clone());
        }
        voters.extend(self.approvers.iter().filter(|id| **id != self.manager).cloned());
        voters
    }
}
