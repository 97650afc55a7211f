//! Access-control roles
//!
//! Privileged operations (reserve creation, liquidation start, pausing) are
//! gated on a role registry. The registry is a capability interface so a
//! deployment can plug in its own source of truth; the static implementation
//! is what the CLI and tests use.

use crate::AccountId;
use std::collections::HashSet;

/// Boolean role checks gating privileged operations
pub trait RoleRegistry: Send + Sync {
    fn is_governance(&self, who: &AccountId) -> bool;
    fn is_liquidation_operator(&self, who: &AccountId) -> bool;
    fn is_emergency_admin(&self, who: &AccountId) -> bool;
}

/// In-memory role registry
#[derive(Debug, Default)]
pub struct StaticRoleRegistry {
    governance: HashSet<AccountId>,
    liquidation_operators: HashSet<AccountId>,
    emergency_admins: HashSet<AccountId>,
}

impl StaticRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_governance(&mut self, who: AccountId) {
        self.governance.insert(who);
    }

    pub fn grant_liquidation_operator(&mut self, who: AccountId) {
        self.liquidation_operators.insert(who);
    }

    pub fn grant_emergency_admin(&mut self, who: AccountId) {
        self.emergency_admins.insert(who);
    }
}

impl RoleRegistry for StaticRoleRegistry {
    fn is_governance(&self, who: &AccountId) -> bool {
        self.governance.contains(who)
    }

    fn is_liquidation_operator(&self, who: &AccountId) -> bool {
        self.liquidation_operators.contains(who)
    }

    fn is_emergency_admin(&self, who: &AccountId) -> bool {
        self.emergency_admins.contains(who)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_independent() {
        let mut registry = StaticRoleRegistry::new();
        let alice = AccountId::new("alice");

        registry.grant_liquidation_operator(alice.clone());

        assert!(registry.is_liquidation_operator(&alice));
        assert!(!registry.is_governance(&alice));
        assert!(!registry.is_emergency_admin(&alice));
    }
}
