//! Rule reconciler
//!
//! Compares the desired state (current IP) with what the provider reports
//! and rewrites the address of every rule whose description is one of the
//! configured tags.
//!
//! A rule is rewritten if and only if its description equals a configured
//! tag exactly (case-sensitive, whole string) and its address differs from
//! the current IP. Every other rule is returned untouched and in place,
//! because the security group update replaces the whole set.

use crate::traits::RuleSet;

/// Result of reconciling one rule set
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The full rule set, with matching rules rewritten
    pub rules: RuleSet,

    /// Number of rules whose address was rewritten
    pub updated: usize,
}

impl Reconciliation {
    /// Whether an update call is needed
    pub fn changed(&self) -> bool {
        self.updated > 0
    }
}

/// Point every rule tagged with one of `tags` at `current_ip`
pub fn reconcile(mut rules: RuleSet, current_ip: &str, tags: &[String]) -> Reconciliation {
    let mut updated = 0;

    for rule in rules.rules.iter_mut() {
        if !tags.iter().any(|tag| *tag == rule.description) {
            continue;
        }
        if rule.address == current_ip {
            continue;
        }

        tracing::debug!(
            "Rule '{}': {} -> {}",
            rule.description,
            rule.address,
            current_ip
        );
        rule.address = current_ip.to_string();
        updated += 1;
    }

    Reconciliation { rules, updated }
}
