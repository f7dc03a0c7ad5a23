use std::collections::HashMap;

use crate::domain::employee::EmployeeId;
use crate::domain::rule::ApprovalRule;
use crate::errors::ApprovalError;

/// Approval rules keyed by manager. Pure data container.
#[derive(Clone, Debug)]
pub struct RuleStore {
    rules: HashMap<EmployeeId, ApprovalRule>,
    allow_zero_threshold: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleUpsert {
    pub stored: ApprovalRule,
    pub replaced: Option<ApprovalRule>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self { rules: HashMap::new(), allow_zero_threshold: true }
    }
}

impl RuleStore {
    pub fn new(allow_zero_threshold: bool) -> Self {
        Self { rules: HashMap::new(), allow_zero_threshold }
    }

    /// Validates and stores `rule`, returning the normalized copy that was
    /// stored alongside the rule it replaced.
    pub fn upsert(&mut self, rule: ApprovalRule) -> Result<RuleUpsert, ApprovalError> {
        let rule = rule.normalized();
        rule.validate()?;
        if rule.min_approval_pct == 0 && !self.allow_zero_threshold {
            return Err(ApprovalError::Validation(format!(
                "rule for `{}` has a 0% threshold, which auto-approves every expense",
                rule.manager
            )));
        }
        let replaced = self.rules.insert(rule.manager.clone(), rule.clone());
        Ok(RuleUpsert { stored: rule, replaced })
    }

    pub fn get(&self, manager: &EmployeeId) -> Option<&ApprovalRule> {
        self.rules.get(manager)
    }

    pub fn remove(&mut self, manager: &EmployeeId) -> Option<ApprovalRule> {
        self.rules.remove(manager)
    }

    pub fn list(&self) -> Vec<ApprovalRule> {
        let mut rules: Vec<ApprovalRule> = self.rules.values().cloned().collect();
        rules.sort_by(|left, right| left.manager.cmp(&right.manager));
        rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::RuleStore;
    use crate::domain::employee::EmployeeId;
    use crate::domain::rule::ApprovalRule;
    use crate::errors::ApprovalError;

    fn rule(manager: &str, pct: u8) -> ApprovalRule {
        ApprovalRule::new(manager, vec![EmployeeId::new("Sarah Johnson")], true, pct)
    }

    #[test]
    fn upsert_replaces_rule_for_same_manager() {
        let mut store = RuleStore::default();
        let first = store.upsert(rule("John Smith", 60)).expect("first upsert");
        assert_eq!(first.replaced, None);

        let second = store.upsert(rule("John Smith", 100)).expect("second upsert");

        assert_eq!(second.replaced.map(|rule| rule.min_approval_pct), Some(60));
        assert_eq!(second.stored.min_approval_pct, 100);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&EmployeeId::new("John Smith")).map(|rule| rule.min_approval_pct),
            Some(100)
        );
    }

    #[test]
    fn upsert_returns_the_normalized_rule_it_stored() {
        let mut store = RuleStore::default();
        let padded = ApprovalRule::new(
            " John Smith ",
            vec![EmployeeId::new("Sarah Johnson"), EmployeeId::new("Sarah Johnson")],
            true,
            60,
        );

        let upserted = store.upsert(padded).expect("upsert");

        assert_eq!(upserted.stored.manager, EmployeeId::new("John Smith"));
        assert_eq!(upserted.stored.approvers, vec![EmployeeId::new("Sarah Johnson")]);
        assert_eq!(store.get(&EmployeeId::new("John Smith")), Some(&upserted.stored));
    }

    #[test]
    fn out_of_range_threshold_is_rejected_without_storing() {
        let mut store = RuleStore::default();

        let error = store.upsert(rule("John Smith", 150)).expect_err("150% is invalid");

        assert!(matches!(error, ApprovalError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn rule_whose_only_voter_is_excluded_manager_is_rejected() {
        let mut store = RuleStore::default();
        let only_self = ApprovalRule::new("John Smith", vec![EmployeeId::new("John Smith")], false, 50);

        assert!(matches!(store.upsert(only_self), Err(ApprovalError::Validation(_))));
    }

    #[test]
    fn zero_threshold_is_configurable() {
        let mut permissive = RuleStore::new(true);
        assert!(permissive.upsert(rule("John Smith", 0)).is_ok());

        let mut strict = RuleStore::new(false);
        let error = strict.upsert(rule("John Smith", 0)).expect_err("0% rejected when disallowed");
        assert!(matches!(error, ApprovalError::Validation(message) if message.contains("0%")));
    }

    #[test]
    fn remove_and_list_are_stable() {
        let mut store = RuleStore::default();
        store.upsert(rule("John Smith", 60)).expect("john");
        store.upsert(rule("David Wilson", 100)).expect("david");

        let managers: Vec<String> = store.list().into_iter().map(|rule| rule.manager.0).collect();
        assert_eq!(managers, vec!["David Wilson".to_string(), "John Smith".to_string()]);

        assert!(store.remove(&EmployeeId::new("John Smith")).is_some());
        assert!(store.remove(&EmployeeId::new("John Smith")).is_none());
        assert_eq!(store.len(), 1);
    }
}
