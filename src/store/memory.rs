use super::{DayTotal, LeaveFilter, Page, Review, Store};
use crate::error::AppError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeave};
use crate::model::role::Role;
use crate::model::user::{Credentials, LeaveBalances, NewUser, User};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Single-mutex store used by tests; the lock stands in for row locks.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: BTreeMap<u64, User>,
    leaves: BTreeMap<u64, LeaveRequest>,
    next_user_id: u64,
    next_leave_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts a request in any status, bypassing validation.
    pub fn seed_leave(&self, leave: NewLeave, status: LeaveStatus) -> LeaveRequest {
        let mut state = self.lock();
        let created = state.insert_leave(leave);
        let stored = state.leaves.get_mut(&created.id).map(|l| {
            l.status = status;
            l.clone()
        });
        stored.unwrap_or(created)
    }

    /// Overwrites one live counter.
    pub fn set_balance(&self, user_id: u64, leave_type: LeaveType, days: i64) {
        if let Some(user) = self.lock().users.get_mut(&user_id) {
            user.leave_balances.set(leave_type, days);
        }
    }
}

impl State {
    fn insert_leave(&mut self, leave: NewLeave) -> LeaveRequest {
        self.next_leave_id += 1;
        let now = Utc::now();
        let created = LeaveRequest {
            id: self.next_leave_id,
            employee_id: leave.employee_id,
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            status: LeaveStatus::Pending,
            manager_comment: None,
            created_at: now,
            updated_at: now,
        };
        self.leaves.insert(created.id, created.clone());
        created
    }

    fn matching(&self, filter: &LeaveFilter) -> Vec<LeaveRequest> {
        let mut leaves: Vec<_> = self
            .leaves
            .values()
            .filter(|l| filter.employee_id.is_none_or(|id| l.employee_id == id))
            .filter(|l| filter.status.is_none_or(|s| l.status == s))
            .cloned()
            .collect();
        leaves.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        leaves
    }
}

impl Store for MemoryStore {
    async fn find_user(&self, id: u64) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[u64]) -> Result<Vec<User>, AppError> {
        let state = self.lock();
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_external_id(&self, subject: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.credentials.external_subject() == Some(subject))
            .cloned())
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        let mut users: Vec<_> = self.lock().users.values().filter(|u| u.role == role).cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut state = self.lock();
        let credentials = Credentials::from(user.credential);

        let taken = state.users.values().any(|u| {
            u.email == user.email
                || (credentials.external_subject().is_some()
                    && u.credentials.external_subject() == credentials.external_subject())
        });
        if taken {
            return Err(AppError::validation("User already exists"));
        }

        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            name: user.name,
            email: user.email,
            credentials,
            role: user.role,
            leave_balances: LeaveBalances::default(),
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn link_external_identity(&self, user_id: u64, subject: &str) -> Result<User, AppError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.credentials = user.credentials.clone().with_subject(subject.to_string());
        Ok(user.clone())
    }

    async fn update_password(&self, user_id: u64, hash: &str) -> Result<(), AppError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        user.credentials = user.credentials.clone().with_password(hash.to_string());
        Ok(())
    }

    async fn leaves_for_employee(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, AppError> {
        let filter = LeaveFilter {
            employee_id: Some(employee_id),
            status: None,
        };
        Ok(self.lock().matching(&filter))
    }

    async fn list_leaves(&self, filter: &LeaveFilter, page: Option<Page>) -> Result<Vec<LeaveRequest>, AppError> {
        let leaves = self.lock().matching(filter);
        Ok(match page {
            Some(page) => leaves
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect(),
            None => leaves,
        })
    }

    async fn count_leaves(&self, filter: &LeaveFilter) -> Result<i64, AppError> {
        Ok(self.lock().matching(filter).len() as i64)
    }

    async fn leave_day_totals(&self, employee_id: u64) -> Result<Vec<DayTotal>, AppError> {
        let state = self.lock();
        let mut totals: HashMap<(LeaveType, LeaveStatus), i64> = HashMap::new();
        for leave in state.leaves.values().filter(|l| l.employee_id == employee_id) {
            *totals.entry((leave.leave_type, leave.status)).or_default() += leave.requested_days();
        }
        Ok(totals
            .into_iter()
            .map(|((leave_type, status), days)| DayTotal {
                leave_type,
                status,
                days,
            })
            .collect())
    }

    async fn submit_leave<F>(&self, employee_id: u64, check: F) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&[LeaveRequest]) -> Result<NewLeave, AppError> + Send,
    {
        let mut state = self.lock();
        if !state.users.contains_key(&employee_id) {
            return Err(AppError::not_found("User not found"));
        }

        let committed: Vec<_> = state
            .leaves
            .values()
            .filter(|l| l.employee_id == employee_id && l.status.is_committed())
            .cloned()
            .collect();

        let new_leave = check(&committed)?;
        Ok(state.insert_leave(new_leave))
    }

    async fn review_leave<F>(&self, leave_id: u64, decide: F) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&LeaveRequest, Option<&User>) -> Result<Review, AppError> + Send,
    {
        let mut state = self.lock();
        let leave = state
            .leaves
            .get(&leave_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Leave not found"))?;
        let owner = state.users.get(&leave.employee_id).cloned();

        let review = decide(&leave, owner.as_ref())?;

        if let Some(days) = review.deduct_days {
            let user = state
                .users
                .get_mut(&leave.employee_id)
                .ok_or_else(|| AppError::not_found("User not found"))?;
            let current = user.leave_balances.get(leave.leave_type);
            if current < days {
                return Err(AppError::validation(format!(
                    "Cannot approve {days} days. Only {current} days available for {} leave.",
                    leave.leave_type
                )));
            }
            user.leave_balances.set(leave.leave_type, current - days);
        }

        let stored = state
            .leaves
            .get_mut(&leave_id)
            .ok_or_else(|| AppError::not_found("Leave not found"))?;
        stored.status = review.status;
        stored.manager_comment = Some(review.manager_comment);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}
