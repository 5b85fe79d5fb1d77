use crate::error::AppError;
use crate::model::leave_request::{LeaveRequest, LeaveType, NewLeave, inclusive_days};
use crate::model::role::Principal;
use crate::store::Store;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;
use utoipa::ToSchema;

/// Raw create payload. Fields stay optional so that missing or malformed values get
/// the same rejection as bad date ordering.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveApplication {
    #[schema(example = "sick")]
    pub leave_type: Option<String>,
    #[schema(example = "2026-01-01", format = "date")]
    pub start_date: Option<String>,
    #[schema(example = "2026-01-02", format = "date")]
    pub end_date: Option<String>,
    #[schema(example = "Family event")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Proposal {
    leave_type: LeaveType,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 instant (taken at its UTC date).
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.naive_utc().date()))
}

fn parse(application: &LeaveApplication) -> Result<Proposal, AppError> {
    let invalid = || AppError::validation("Invalid leave data");

    let leave_type = non_empty(&application.leave_type)
        .and_then(|t| LeaveType::from_str(t).ok())
        .ok_or_else(invalid)?;
    let start_date = non_empty(&application.start_date).and_then(parse_date).ok_or_else(invalid)?;
    let end_date = non_empty(&application.end_date).and_then(parse_date).ok_or_else(invalid)?;

    if start_date > end_date {
        return Err(invalid());
    }

    Ok(Proposal {
        leave_type,
        start_date,
        end_date,
        reason: application.reason.clone(),
    })
}

fn check_not_past(proposal: &Proposal, today: NaiveDate) -> Result<(), AppError> {
    if proposal.start_date < today || proposal.end_date < today {
        return Err(AppError::validation("Past dates not allowed"));
    }
    Ok(())
}

/// Overlap and quota checks against the employee's pending and approved requests.
fn check_committed(proposal: Proposal, employee_id: u64, committed: &[LeaveRequest]) -> Result<NewLeave, AppError> {
    let committed = committed.iter().filter(|l| l.status.is_committed());

    if committed
        .clone()
        .any(|l| l.overlaps(proposal.start_date, proposal.end_date))
    {
        return Err(AppError::validation("You already have a leave in this date range"));
    }

    let requested_days = inclusive_days(proposal.start_date, proposal.end_date);
    let used_days: i64 = committed
        .filter(|l| l.leave_type == proposal.leave_type)
        .map(LeaveRequest::requested_days)
        .sum();
    let available = proposal.leave_type.allocation() - used_days;

    if requested_days > available {
        return Err(AppError::validation(format!(
            "Only {available} {} leave days available",
            proposal.leave_type
        )));
    }

    Ok(NewLeave {
        employee_id,
        leave_type: proposal.leave_type,
        start_date: proposal.start_date,
        end_date: proposal.end_date,
        reason: proposal.reason,
    })
}

/// Validates an application for `principal` and stores it as pending.
///
/// `today` is the server's local calendar day; both dates must be on or after it.
pub async fn submit_leave<S: Store>(
    store: &S,
    principal: &Principal,
    application: LeaveApplication,
    today: NaiveDate,
) -> Result<LeaveRequest, AppError> {
    let proposal = parse(&application)?;
    check_not_past(&proposal, today)?;

    let employee_id = principal.user_id;
    let leave = store
        .submit_leave(employee_id, move |committed| {
            check_committed(proposal, employee_id, committed)
        })
        .await?;

    info!(
        employee_id,
        leave_id = leave.id,
        leave_type = %leave.leave_type,
        days = leave.requested_days(),
        "Leave request submitted"
    );
    Ok(leave)
}
