use crate::auth::auth::AuthUser;
use crate::leave::balance;
use crate::leave::validator::{self, LeaveApplication};
use crate::store::Store;
use actix_web::{HttpResponse, Responder, web};
use chrono::Local;

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leaves/request",
    request_body(
        content = LeaveApplication,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = crate::model::leave_request::LeaveRequest),
        (status = 400, description = "Rejected by validation", body = Object, example = json!({
            "message": "Only 5 casual leave days available"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave<S: Store>(
    auth: AuthUser,
    store: web::Data<S>,
    payload: web::Json<LeaveApplication>,
) -> actix_web::Result<impl Responder> {
    let today = Local::now().date_naive();

    let leave = validator::submit_leave(store.get_ref(), &auth.principal(), payload.into_inner(), today).await?;

    Ok(HttpResponse::Created().json(leave))
}

/// Caller's own leave requests, newest first
#[utoipa::path(
    get,
    path = "/api/leaves/requests",
    responses(
        (status = 200, description = "Own leave requests", body = [crate::model::leave_request::LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves<S: Store>(auth: AuthUser, store: web::Data<S>) -> actix_web::Result<impl Responder> {
    let leaves = store.leaves_for_employee(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(leaves))
}

/// Quota-based leave balance of the caller
#[utoipa::path(
    get,
    path = "/api/leaves/balance",
    responses(
        (status = 200, description = "Leave balance", body = crate::leave::balance::BalanceReport),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found", body = Object, example = json!({
            "message": "User not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_balance<S: Store>(auth: AuthUser, store: web::Data<S>) -> actix_web::Result<impl Responder> {
    let report = balance::leave_balance(store.get_ref(), &auth.principal()).await?;
    Ok(HttpResponse::Ok().json(report))
}
