use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::leave::approval::{self, ReviewRequest};
use crate::leave::calendar;
use crate::leave::load_owners;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;
use crate::model::user::{EmployeeSummary, LeaveBalances, User};
use crate::store::{LeaveFilter, Page, Store};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LeaveQuery {
    /// Only requests of this employee
    pub employee_id: Option<u64>,
    /// `pending`, `approved` or `rejected`
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl LeaveQuery {
    fn filter(&self) -> Result<LeaveFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(LeaveStatus::from_str(raw).map_err(|_| AppError::validation("Invalid status"))?),
            None => None,
        };

        Ok(LeaveFilter {
            employee_id: self.employee_id,
            status,
        })
    }
}

/// A leave request with its owner populated.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveWithEmployee {
    pub id: u64,
    /// null when the owning account no longer exists
    pub employee: Option<EmployeeSummary>,
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub manager_comment: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveWithEmployee {
    fn new(leave: LeaveRequest, owner: Option<&User>) -> Self {
        Self {
            id: leave.id,
            employee: owner.map(EmployeeSummary::from),
            leave_type: leave.leave_type,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            status: leave.status,
            manager_comment: leave.manager_comment,
            created_at: leave.created_at,
            updated_at: leave.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveListResponse {
    pub data: Vec<LeaveWithEmployee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeBalances {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[schema(value_type = Object, example = json!({"sick": 7, "casual": 8, "paid": 3, "vacation": 2}))]
    pub leave_balances: LeaveBalances,
}

// -------------------- Handlers --------------------

#[utoipa::path(
    get,
    path = "/api/manager/requests",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave requests", body = LeaveListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn list_requests<S: Store>(
    auth: AuthUser,
    store: web::Data<S>,
    query: web::Query<LeaveQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let filter = query.filter()?;
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let offset = (page - 1) as u64 * per_page as u64;

    let leaves = store
        .list_leaves(
            &filter,
            Some(Page {
                limit: per_page as u64,
                offset,
            }),
        )
        .await?;
    let total = store.count_leaves(&filter).await?;
    let owners = load_owners(store.get_ref(), &leaves).await?;

    debug!(manager_id = auth.user_id, page, per_page, total, "Listing leave requests");

    let data = leaves
        .into_iter()
        .map(|leave| {
            let owner = owners.get(&leave.employee_id);
            LeaveWithEmployee::new(leave, owner)
        })
        .collect();

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Approve or reject a pending request
#[utoipa::path(
    put,
    path = "/api/manager/requests/{id}",
    params(
        ("id" = u64, Path, description = "Leave request id")
    ),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Request reviewed", body = Object, example = json!({
            "leave": {"id": 1, "status": "approved", "managerComment": "Get well soon"}
        })),
        (status = 400, description = "Already processed, unknown action or balance too low", body = Object, example = json!({
            "message": "Leave request already processed"
        })),
        (status = 403, description = "Manager only"),
        (status = 404, description = "Leave not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn update_leave_status<S: Store>(
    auth: AuthUser,
    store: web::Data<S>,
    path: web::Path<u64>,
    payload: web::Json<ReviewRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let leave = approval::process_leave(store.get_ref(), &auth.principal(), path.into_inner(), payload.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "leave": leave })))
}

/// Employees with their live leave counters
#[utoipa::path(
    get,
    path = "/api/manager/employees",
    responses(
        (status = 200, description = "Employees", body = [EmployeeBalances]),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn list_employees<S: Store>(auth: AuthUser, store: web::Data<S>) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let employees: Vec<EmployeeBalances> = store
        .list_users_by_role(Role::Employee)
        .await?
        .into_iter()
        .map(|user| EmployeeBalances {
            id: user.id,
            name: user.name,
            email: user.email,
            leave_balances: user.leave_balances,
        })
        .collect();

    Ok(HttpResponse::Ok().json(employees))
}

#[utoipa::path(
    get,
    path = "/api/manager/leave-calendar",
    params(
        ("employeeId" = Option<u64>, Query, description = "Only this employee's requests"),
        ("status" = Option<String>, Query, description = "pending, approved or rejected")
    ),
    responses(
        (status = 200, description = "Calendar events, end date exclusive", body = [crate::leave::calendar::CalendarEvent]),
        (status = 403, description = "Manager only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Manager"
)]
pub async fn leave_calendar<S: Store>(
    auth: AuthUser,
    store: web::Data<S>,
    query: web::Query<LeaveQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let events = calendar::leave_calendar(store.get_ref(), &auth.principal(), &query.filter()?).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_status_means_no_filter() {
        let query = LeaveQuery {
            employee_id: Some(3),
            status: Some("  ".into()),
            ..Default::default()
        };

        assert_eq!(
            query.filter().unwrap(),
            LeaveFilter {
                employee_id: Some(3),
                status: None
            }
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        let query = LeaveQuery {
            status: Some("archived".into()),
            ..Default::default()
        };

        assert!(matches!(query.filter(), Err(AppError::Validation(m)) if m == "Invalid status"));
    }
}
