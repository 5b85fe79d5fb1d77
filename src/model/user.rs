use crate::model::leave_request::LeaveType;
use crate::model::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use utoipa::ToSchema;

/// The credential a user is created with. Exactly one per new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Argon2 PHC string
    Password(String),
    /// Subject id issued by the external identity provider
    External(String),
}

/// Credentials held by a stored account.
///
/// Accounts start as `Password` or `External`; a password account that later signs
/// in through the identity provider with the same email becomes `Linked`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { hash: String },
    External { subject: String },
    Linked { hash: String, subject: String },
}

impl Credentials {
    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Credentials::Password { hash } | Credentials::Linked { hash, .. } => Some(hash),
            Credentials::External { .. } => None,
        }
    }

    pub fn external_subject(&self) -> Option<&str> {
        match self {
            Credentials::External { subject } | Credentials::Linked { subject, .. } => Some(subject),
            Credentials::Password { .. } => None,
        }
    }

    /// Rebuilds credentials from nullable storage columns.
    pub fn from_parts(hash: Option<String>, subject: Option<String>) -> Option<Self> {
        match (hash, subject) {
            (Some(hash), Some(subject)) => Some(Credentials::Linked { hash, subject }),
            (Some(hash), None) => Some(Credentials::Password { hash }),
            (None, Some(subject)) => Some(Credentials::External { subject }),
            (None, None) => None,
        }
    }

    pub fn with_subject(self, subject: String) -> Self {
        match self {
            Credentials::Password { hash } | Credentials::Linked { hash, .. } => {
                Credentials::Linked { hash, subject }
            }
            Credentials::External { .. } => Credentials::External { subject },
        }
    }

    pub fn with_password(self, hash: String) -> Self {
        match self {
            Credentials::Password { .. } => Credentials::Password { hash },
            Credentials::External { subject } | Credentials::Linked { subject, .. } => {
                Credentials::Linked { hash, subject }
            }
        }
    }
}

impl From<Credential> for Credentials {
    fn from(credential: Credential) -> Self {
        match credential {
            Credential::Password(hash) => Credentials::Password { hash },
            Credential::External(subject) => Credentials::External { subject },
        }
    }
}

/// Live per-type remaining-day counters. Decremented only on approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalances(BTreeMap<LeaveType, i64>);

impl LeaveBalances {
    pub fn new(balances: BTreeMap<LeaveType, i64>) -> Self {
        Self(balances)
    }

    /// Counter for `leave_type`, 0 when the entry is missing.
    pub fn get(&self, leave_type: LeaveType) -> i64 {
        self.0.get(&leave_type).copied().unwrap_or(0)
    }

    pub fn set(&mut self, leave_type: LeaveType, days: i64) {
        self.0.insert(leave_type, days);
    }
}

impl Default for LeaveBalances {
    /// Seeded from the allocation table.
    fn default() -> Self {
        Self(LeaveType::iter().map(|t| (t, t.allocation())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    #[serde(skip)]
    pub credentials: Credentials,
    #[schema(example = "employee")]
    pub role: Role,
    #[schema(value_type = Object, example = json!({"sick": 7, "casual": 8, "paid": 3, "vacation": 2}))]
    pub leave_balances: LeaveBalances,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub credential: Credential,
}

/// The owning employee as shown to managers next to a leave request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[schema(value_type = Object)]
    pub leave_balances: LeaveBalances,
}

impl From<&User> for EmployeeSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            leave_balances: user.leave_balances.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_default_to_allocation() {
        let balances = LeaveBalances::default();
        assert_eq!(balances.get(LeaveType::Sick), 7);
        assert_eq!(balances.get(LeaveType::Vacation), 2);
        assert_eq!(
            serde_json::to_value(&balances).unwrap(),
            serde_json::json!({"sick": 7, "casual": 8, "paid": 3, "vacation": 2})
        );
    }

    #[test]
    fn missing_balance_reads_zero() {
        let balances = LeaveBalances::new(BTreeMap::new());
        assert_eq!(balances.get(LeaveType::Paid), 0);
    }

    #[test]
    fn linking_keeps_password() {
        let creds = Credentials::Password { hash: "h".into() }.with_subject("g-1".into());
        assert_eq!(creds.password_hash(), Some("h"));
        assert_eq!(creds.external_subject(), Some("g-1"));
        assert_eq!(Credentials::from_parts(None, None), None);
    }
}
