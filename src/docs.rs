use crate::api::manager::{EmployeeBalances, LeaveListResponse, LeaveWithEmployee};
use crate::leave::approval::ReviewRequest;
use crate::leave::balance::{BalanceReport, TypeBalance};
use crate::leave::calendar::CalendarEvent;
use crate::leave::validator::LeaveApplication;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;
use crate::model::user::{EmployeeSummary, User};
use crate::models::{AuthResponse, LoginReqDto, SignupReq, UpdatePasswordReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Desk API",
        version = "1.0.0",
        description = r#"
## Employee Leave Management

Employees request time off against a fixed yearly allocation per leave type;
managers approve or reject the requests and see them on a shared calendar.

### 🔹 Key Features
- **Leave Requests**
  - Submit sick, casual, paid or vacation leave, validated against overlap and quota
- **Balances**
  - Allocation, used, pending and available days per leave type
- **Approvals**
  - Pending requests move to approved or rejected exactly once
- **Calendar**
  - Requests projected as all-day events with an exclusive end date

### 🔐 Security
Everything except signup, login and Google sign-in needs a **JWT Bearer** token.
Manager endpoints accept the **manager** and **admin** roles.

### 📦 Response Format
- camelCase JSON
- Errors are `{"message": "..."}`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::update_password,
        crate::auth::google::google_login,
        crate::auth::google::google_callback,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::leave_balance,

        crate::api::manager::list_requests,
        crate::api::manager::update_leave_status,
        crate::api::manager::list_employees,
        crate::api::manager::leave_calendar
    ),
    components(
        schemas(
            SignupReq,
            LoginReqDto,
            UpdatePasswordReq,
            AuthResponse,
            User,
            Role,
            LeaveType,
            LeaveStatus,
            LeaveApplication,
            LeaveRequest,
            BalanceReport,
            TypeBalance,
            ReviewRequest,
            EmployeeSummary,
            LeaveWithEmployee,
            LeaveListResponse,
            EmployeeBalances,
            CalendarEvent
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Account and token APIs"),
        (name = "Leave", description = "Employee leave APIs"),
        (name = "Manager", description = "Review, roster and calendar APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
