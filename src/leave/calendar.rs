use crate::error::AppError;
use crate::leave::load_owners;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Principal;
use crate::model::user::User;
use crate::store::{LeaveFilter, Store};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use utoipa::ToSchema;

const UNKNOWN_EMPLOYEE: &str = "Unknown employee";

/// An all-day calendar entry. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CalendarEvent {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Jane Doe (sick)")]
    pub title: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start: NaiveDate,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub end: NaiveDate,
    pub status: LeaveStatus,
    #[schema(example = "Jane Doe")]
    pub employee: String,
    pub reason: Option<String>,
}

pub fn project(leaves: &[LeaveRequest], owners: &HashMap<u64, User>) -> Vec<CalendarEvent> {
    leaves
        .iter()
        .filter_map(|leave| {
            let end = leave.end_date.succ_opt()?;
            let employee = owners
                .get(&leave.employee_id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| UNKNOWN_EMPLOYEE.to_string());

            Some(CalendarEvent {
                id: leave.id,
                title: format!("{employee} ({})", leave.leave_type),
                start: leave.start_date,
                end,
                status: leave.status,
                employee,
                reason: leave.reason.clone(),
            })
        })
        .collect()
}

pub async fn leave_calendar<S: Store>(
    store: &S,
    principal: &Principal,
    filter: &LeaveFilter,
) -> Result<Vec<CalendarEvent>, AppError> {
    let leaves = store.list_leaves(filter, None).await?;
    let owners = load_owners(store, &leaves).await?;
    let events = project(&leaves, &owners);

    debug!(viewer_id = principal.user_id, events = events.len(), "Leave calendar projected");
    Ok(events)
}
