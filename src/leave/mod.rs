//! Leave accounting and approval.
//!
//! Two views of an employee's remaining days coexist:
//!
//! - quota view ([`balance`], [`validator`]): allocation table minus the re-aggregated
//!   inclusive spans of stored requests;
//! - live counter ([`approval`]): `User::leave_balances`, seeded from the allocation
//!   table and decremented on each approval.
//!
//! Neither is derived from the other. [`balance::reconcile`] reports where they
//! disagree and the balance query logs it; nothing corrects either side.
use crate::error::AppError;
use crate::model::leave_request::LeaveRequest;
use crate::model::user::User;
use crate::store::Store;
use std::collections::HashMap;

pub mod approval;
pub mod balance;
pub mod calendar;
pub mod validator;

/// Loads the distinct owners of `leaves`, keyed by user id.
pub async fn load_owners<S: Store>(store: &S, leaves: &[LeaveRequest]) -> Result<HashMap<u64, User>, AppError> {
    let mut ids: Vec<u64> = leaves.iter().map(|l| l.employee_id).collect();
    ids.sort_unstable();
    ids.dedup();

    Ok(store
        .find_users(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect())
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::model::leave_request::{LeaveStatus, LeaveType, NewLeave};
    use crate::model::role::{Principal, Role};
    use crate::model::user::{Credential, NewUser, User};
    use crate::store::Store;
    use crate::store::memory::MemoryStore;
    use chrono::{Days, Local, NaiveDate};

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// `n` days from today.
    pub fn day(n: u64) -> NaiveDate {
        today() + Days::new(n)
    }

    pub async fn employee(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                role: Role::Employee,
                credential: Credential::External(format!("sub-{name}")),
            })
            .await
            .unwrap()
    }

    pub fn principal(user: &User) -> Principal {
        Principal {
            user_id: user.id,
            role: user.role,
        }
    }

    pub fn manager() -> Principal {
        Principal {
            user_id: 999,
            role: Role::Manager,
        }
    }

    pub fn seed(
        store: &MemoryStore,
        user: &User,
        leave_type: LeaveType,
        start: NaiveDate,
        end: NaiveDate,
        status: LeaveStatus,
    ) -> crate::model::leave_request::LeaveRequest {
        store.seed_leave(
            NewLeave {
                employee_id: user.id,
                leave_type,
                start_date: start,
                end_date: end,
                reason: None,
            },
            status,
        )
    }
}
