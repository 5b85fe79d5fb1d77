//! Persistence seam for users and leave requests.
//!
//! The leave core only talks to [`Store`]. Multi-step writes are expressed as
//! closures that the implementation runs while holding the employee's lock, so the
//! check and the write observe the same snapshot.
use crate::error::AppError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeave};
use crate::model::role::Role;
use crate::model::user::{NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaveFilter {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

/// Σ inclusive days of one employee's requests, grouped by type and status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayTotal {
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub days: i64,
}

/// Outcome of a manager review, applied atomically by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub status: LeaveStatus,
    /// Days to take from the owner's live counter for the request's leave type.
    pub deduct_days: Option<i64>,
    pub manager_comment: String,
}

#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync + 'static {
    async fn find_user(&self, id: u64) -> Result<Option<User>, AppError>;

    async fn find_users(&self, ids: &[u64]) -> Result<Vec<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_external_id(&self, subject: &str) -> Result<Option<User>, AppError>;

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError>;

    /// Creates the account and seeds its balances from the allocation table.
    /// A taken email or subject yields `Validation("User already exists")`.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn link_external_identity(&self, user_id: u64, subject: &str) -> Result<User, AppError>;

    async fn update_password(&self, user_id: u64, hash: &str) -> Result<(), AppError>;

    /// Newest first.
    async fn leaves_for_employee(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, AppError>;

    /// Newest first; all matching rows when `page` is `None`.
    async fn list_leaves(
        &self,
        filter: &LeaveFilter,
        page: Option<Page>,
    ) -> Result<Vec<LeaveRequest>, AppError>;

    async fn count_leaves(&self, filter: &LeaveFilter) -> Result<i64, AppError>;

    async fn leave_day_totals(&self, employee_id: u64) -> Result<Vec<DayTotal>, AppError>;

    /// Locks the employee, hands `check` the employee's pending and approved
    /// requests, and inserts whatever it returns as a pending request.
    async fn submit_leave<F>(&self, employee_id: u64, check: F) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&[LeaveRequest]) -> Result<NewLeave, AppError> + Send;

    /// Locks the request and its owner, lets `decide` pick the transition and applies
    /// it: counter deduction first, then the status and comment.
    async fn review_leave<F>(&self, leave_id: u64, decide: F) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&LeaveRequest, Option<&User>) -> Result<Review, AppError> + Send;
}
