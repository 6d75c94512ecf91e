use std::collections::HashSet;

use mostrador_core::OperatorId;

use crate::permissions::Permission;

/// A fully resolved operator for authorization decisions.
///
/// Construction is intentionally decoupled from storage and transport:
/// callers derive the permission set from whatever policy source they use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub operator_id: OperatorId,
    pub permissions: HashSet<Permission>,
}

impl Principal {
    pub fn new(operator_id: OperatorId) -> Self {
        Self {
            operator_id,
            permissions: HashSet::new(),
        }
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }
}
