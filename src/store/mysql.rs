use super::{DayTotal, LeaveFilter, Page, Review, Store};
use crate::error::AppError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType, NewLeave};
use crate::model::role::Role;
use crate::model::user::{Credential, Credentials, LeaveBalances, NewUser, User};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlConnection, MySqlPool};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use strum::IntoEnumIterator;

const USER_COLUMNS: &str = "id, name, email, password_hash, google_id, role, created_at";
const LEAVE_COLUMNS: &str = "id, employee_id, leave_type, start_date, end_date, reason, status, \
                             manager_comment, created_at, updated_at";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: u64,
    name: String,
    email: String,
    password_hash: Option<String>,
    google_id: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct BalanceRow {
    user_id: u64,
    leave_type: String,
    remaining_days: i64,
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: Option<String>,
    status: String,
    manager_comment: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct DayTotalRow {
    leave_type: String,
    status: String,
    days: i64,
}

fn parse_leave_type(value: &str) -> Result<LeaveType, AppError> {
    LeaveType::from_str(value).map_err(|_| AppError::Internal(format!("unknown leave type {value:?}")))
}

fn parse_status(value: &str) -> Result<LeaveStatus, AppError> {
    LeaveStatus::from_str(value).map_err(|_| AppError::Internal(format!("unknown leave status {value:?}")))
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = AppError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: parse_leave_type(&row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: parse_status(&row.status)?,
            manager_comment: row.manager_comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_leaves(rows: Vec<LeaveRow>) -> Result<Vec<LeaveRequest>, AppError> {
    rows.into_iter().map(LeaveRequest::try_from).collect()
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

// Typed binding for dynamically built WHERE clauses
enum FilterValue {
    U64(u64),
    Str(String),
}

fn leave_where(filter: &LeaveFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }

    if let Some(status) = filter.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    (where_sql, args)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Attaches balances to user rows. Rows with no credential column set are corrupt.
async fn hydrate_users(conn: &mut MySqlConnection, rows: Vec<UserRow>) -> Result<Vec<User>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT user_id, leave_type, remaining_days FROM leave_balances WHERE user_id IN ({})",
        placeholders(rows.len())
    );
    let mut query = sqlx::query_as::<_, BalanceRow>(&sql);
    for row in &rows {
        query = query.bind(row.id);
    }
    let balance_rows = query.fetch_all(&mut *conn).await?;

    let mut balances: HashMap<u64, BTreeMap<LeaveType, i64>> = HashMap::new();
    for b in balance_rows {
        balances
            .entry(b.user_id)
            .or_default()
            .insert(parse_leave_type(&b.leave_type)?, b.remaining_days);
    }

    rows.into_iter()
        .map(|row| {
            let credentials = Credentials::from_parts(row.password_hash, row.google_id)
                .ok_or_else(|| AppError::Internal(format!("user {} has no credentials", row.id)))?;
            let role = Role::from_str(&row.role)
                .map_err(|_| AppError::Internal(format!("unknown role {:?}", row.role)))?;
            Ok(User {
                id: row.id,
                name: row.name,
                email: row.email,
                credentials,
                role,
                leave_balances: LeaveBalances::new(balances.remove(&row.id).unwrap_or_default()),
                created_at: row.created_at,
            })
        })
        .collect()
}

async fn fetch_user(conn: &mut MySqlConnection, id: u64, for_update: bool) -> Result<Option<User>, AppError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?{lock}");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(hydrate_users(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn fetch_user_by(conn: &mut MySqlConnection, column: &str, value: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(value)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(hydrate_users(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn fetch_leave(conn: &mut MySqlConnection, id: u64, for_update: bool) -> Result<Option<LeaveRequest>, AppError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?{lock}");
    sqlx::query_as::<_, LeaveRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(LeaveRequest::try_from)
        .transpose()
}

/// Re-check of a leave row read again under lock, after its owner was locked.
fn locked_leave(employee_id: u64, leave: Option<LeaveRequest>) -> Result<LeaveRequest, AppError> {
    match leave {
        Some(leave) if leave.employee_id == employee_id => Ok(leave),
        Some(leave) => Err(AppError::Internal(format!(
            "leave {} changed owner from {employee_id} to {}",
            leave.id, leave.employee_id
        ))),
        None => Err(AppError::not_found("Leave not found")),
    }
}

impl Store for MySqlStore {
    async fn find_user(&self, id: u64) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_user(&mut conn, id, false).await
    }

    async fn find_users(&self, ids: &[u64]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ({})", placeholders(ids.len()));
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        hydrate_users(&mut conn, rows).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_user_by(&mut conn, "email", email).await
    }

    async fn find_user_by_external_id(&self, subject: &str) -> Result<Option<User>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_user_by(&mut conn, "google_id", subject).await
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY name");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(role.as_ref())
            .fetch_all(&mut *conn)
            .await?;
        hydrate_users(&mut conn, rows).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let (password_hash, google_id) = match &user.credential {
            Credential::Password(hash) => (Some(hash.as_str()), None),
            Credential::External(subject) => (None, Some(subject.as_str())),
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, google_id, role)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(password_hash)
        .bind(google_id)
        .bind(user.role.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::validation("User already exists")
            } else {
                AppError::Database(e)
            }
        })?;

        let user_id = result.last_insert_id();

        for leave_type in LeaveType::iter() {
            sqlx::query("INSERT INTO leave_balances (user_id, leave_type, remaining_days) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(leave_type.as_ref())
                .bind(leave_type.allocation())
                .execute(&mut *tx)
                .await?;
        }

        let created = fetch_user(&mut tx, user_id, false)
            .await?
            .ok_or_else(|| AppError::Internal(format!("user {user_id} vanished after insert")))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn link_external_identity(&self, user_id: u64, subject: &str) -> Result<User, AppError> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("UPDATE users SET google_id = ? WHERE id = ?")
            .bind(subject)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::validation("User already exists")
                } else {
                    AppError::Database(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }

        fetch_user(&mut conn, user_id, false)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn update_password(&self, user_id: u64, hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn leaves_for_employee(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, AppError> {
        let filter = LeaveFilter {
            employee_id: Some(employee_id),
            status: None,
        };
        self.list_leaves(&filter, None).await
    }

    async fn list_leaves(&self, filter: &LeaveFilter, page: Option<Page>) -> Result<Vec<LeaveRequest>, AppError> {
        let (where_sql, args) = leave_where(filter);
        let limit_sql = if page.is_some() { " LIMIT ? OFFSET ?" } else { "" };
        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC, id DESC{limit_sql}"
        );

        let mut query = sqlx::query_as::<_, LeaveRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }
        if let Some(page) = page {
            query = query.bind(page.limit).bind(page.offset);
        }

        into_leaves(query.fetch_all(&self.pool).await?)
    }

    async fn count_leaves(&self, filter: &LeaveFilter) -> Result<i64, AppError> {
        let (where_sql, args) = leave_where(filter);
        let sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn leave_day_totals(&self, employee_id: u64) -> Result<Vec<DayTotal>, AppError> {
        let rows = sqlx::query_as::<_, DayTotalRow>(
            r#"
            SELECT
                leave_type,
                status,
                CAST(SUM(DATEDIFF(end_date, start_date) + 1) AS SIGNED) AS days
            FROM leave_requests
            WHERE employee_id = ?
            GROUP BY leave_type, status
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DayTotal {
                    leave_type: parse_leave_type(&row.leave_type)?,
                    status: parse_status(&row.status)?,
                    days: row.days,
                })
            })
            .collect()
    }

    async fn submit_leave<F>(&self, employee_id: u64, check: F) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&[LeaveRequest]) -> Result<NewLeave, AppError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE id = ? FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests \
             WHERE employee_id = ? AND status IN ('pending', 'approved') FOR UPDATE"
        );
        let committed = into_leaves(
            sqlx::query_as::<_, LeaveRow>(&sql)
                .bind(employee_id)
                .fetch_all(&mut *tx)
                .await?,
        )?;

        let new_leave = check(&committed)?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, start_date, end_date, reason, status)
            VALUES (?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(new_leave.employee_id)
        .bind(new_leave.leave_type.as_ref())
        .bind(new_leave.start_date)
        .bind(new_leave.end_date)
        .bind(&new_leave.reason)
        .execute(&mut *tx)
        .await?;

        let leave_id = result.last_insert_id();
        let created = fetch_leave(&mut tx, leave_id, false)
            .await?
            .ok_or_else(|| AppError::Internal(format!("leave {leave_id} vanished after insert")))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn review_leave<F>(&self, leave_id: u64, decide: F) -> Result<LeaveRequest, AppError>
    where
        F: FnOnce(&LeaveRequest, Option<&User>) -> Result<Review, AppError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        // same lock order as submit_leave: employee row, then leave rows
        let employee_id = sqlx::query_scalar::<_, u64>("SELECT employee_id FROM leave_requests WHERE id = ?")
            .bind(leave_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Leave not found"))?;
        let owner = fetch_user(&mut tx, employee_id, true).await?;
        let leave = locked_leave(employee_id, fetch_leave(&mut tx, leave_id, true).await?)?;

        let review = decide(&leave, owner.as_ref())?;

        if let Some(days) = review.deduct_days {
            let result = sqlx::query(
                r#"
                UPDATE leave_balances
                SET remaining_days = remaining_days - ?
                WHERE user_id = ? AND leave_type = ? AND remaining_days >= ?
                "#,
            )
            .bind(days)
            .bind(leave.employee_id)
            .bind(leave.leave_type.as_ref())
            .bind(days)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::validation(format!(
                    "Cannot approve {days} days. Only {} days available for {} leave.",
                    owner.as_ref().map(|u| u.leave_balances.get(leave.leave_type)).unwrap_or(0),
                    leave.leave_type
                )));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, manager_comment = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(review.status.as_ref())
        .bind(&review.manager_comment)
        .bind(leave_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict("Leave request already processed"));
        }

        let updated = fetch_leave(&mut tx, leave_id, false)
            .await?
            .ok_or_else(|| AppError::not_found("Leave not found"))?;

        tx.commit().await?;
        Ok(updated)
    }
}
