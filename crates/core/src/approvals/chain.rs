use serde::{Deserialize, Serialize};

use crate::directory::OrgDirectory;
use crate::domain::employee::EmployeeId;
use crate::domain::expense::{ApprovalPolicy, PolicySource};
use crate::errors::ApprovalError;
use crate::rules::RuleStore;

/// Threshold applied to the single-manager fallback chain.
pub const MANAGER_FALLBACK_PCT: u8 = 100;

/// How chains are derived when no rule covers the submitter's manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPolicy {
    pub fallback_to_manager: bool,
    pub default_chain: Vec<EmployeeId>,
    pub default_min_approval_pct: u8,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self { fallback_to_manager: true, default_chain: Vec::new(), default_min_approval_pct: 100 }
    }
}

pub struct ChainBuilder<'a> {
    rules: &'a RuleStore,
    directory: &'a OrgDirectory,
    policy: &'a ChainPolicy,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(rules: &'a RuleStore, directory: &'a OrgDirectory, policy: &'a ChainPolicy) -> Self {
        Self { rules, directory, policy }
    }

    /// Resolves the approval chain for `submitter`.
    ///
    /// Resolution order: the rule of the direct manager, then the direct
    /// manager alone (when `fallback_to_manager` is set), then the configured
    /// default chain. A submitter never approves their own expense, so they
    /// are dropped from every candidate chain; an emptied chain falls through
    /// to the next step. The rule's percentage then applies to the shortened
    /// chain, so dropping the submitter lowers the approvals required.
    pub fn resolve(&self, submitter: &EmployeeId) -> Result<ApprovalPolicy, ApprovalError> {
        let manager = self.directory.manager_of(submitter);

        if let Some(manager) = manager {
            if let Some(rule) = self.rules.get(manager) {
                let chain = without(rule.voters(), submitter);
                if !chain.is_empty() {
                    return Ok(ApprovalPolicy {
                        chain,
                        min_approval_pct: rule.min_approval_pct,
                        source: PolicySource::Rule { manager: manager.clone() },
                    });
                }
            }

            if self.policy.fallback_to_manager && manager != submitter {
                return Ok(ApprovalPolicy {
                    chain: vec![manager.clone()],
                    min_approval_pct: MANAGER_FALLBACK_PCT,
                    source: PolicySource::ManagerFallback { manager: manager.clone() },
                });
            }
        }

        let chain = without(self.policy.default_chain.clone(), submitter);
        if !chain.is_empty() {
            return Ok(ApprovalPolicy {
                chain,
                min_approval_pct: self.policy.default_min_approval_pct,
                source: PolicySource::DefaultChain,
            });
        }

        Err(ApprovalError::UnresolvedManager { submitter: submitter.clone() })
    }
}

fn without(chain: Vec<EmployeeId>, submitter: &EmployeeId) -> Vec<EmployeeId> {
    let mut resolved: Vec<EmployeeId> = Vec::with_capacity(chain.len());
    for approver in chain {
        if approver != *submitter && !resolved.contains(&approver) {
            resolved.push(approver);
        }
    }
    resolved
}
