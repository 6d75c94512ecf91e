use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use mostrador_core::OperatorId;

use crate::authorize::authorize;
use crate::permissions::Permission;
use crate::principal::Principal;

/// Boolean capability query the register makes before privileged actions.
///
/// A denial surfaces to the caller as a permission error, never as a core
/// invariant violation.
pub trait CapabilityGate: Send + Sync {
    fn allows(&self, operator: OperatorId, capability: &Permission) -> bool;
}

/// Gate backed by a static operator-to-grant table.
#[derive(Debug, Default)]
pub struct StaticCapabilityGate {
    grants: RwLock<HashMap<OperatorId, HashSet<Permission>>>,
}

impl StaticCapabilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, operator: OperatorId, permission: Permission) {
        if let Ok(mut grants) = self.grants.write() {
            grants.entry(operator).or_default().insert(permission);
        }
    }

    pub fn grant_all(&self, operator: OperatorId) {
        self.grant(operator, Permission::new("*"));
    }
}

impl CapabilityGate for StaticCapabilityGate {
    fn allows(&self, operator: OperatorId, capability: &Permission) -> bool {
        let Ok(grants) = self.grants.read() else {
            return false;
        };
        let Some(permissions) = grants.get(&operator) else {
            return false;
        };
        let principal = Principal {
            operator_id: operator,
            permissions: permissions.clone(),
        };
        authorize(&principal, capability).is_ok()
    }
}
