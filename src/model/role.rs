use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Manager,
    Admin,
}

impl Role {
    /// Managers and admins may review leave requests.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

/// The authenticated caller, threaded explicitly into every leave operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Principal {
    pub user_id: u64,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_lowercase_roles() {
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::Admin.as_ref(), "admin");
        assert!(Role::from_str("hr").is_err());
    }

    #[test]
    fn only_managers_and_admins_review() {
        assert!(!Role::Employee.can_review());
        assert!(Role::Manager.can_review());
        assert!(Role::Admin.can_review());
    }
}
