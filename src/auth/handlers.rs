use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::AppError,
    model::{
        role::Role,
        user::{Credential, NewUser},
    },
    models::{AuthResponse, LoginReqDto, SignupReq, UpdatePasswordReq},
    store::Store,
    utils::email_registry,
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use std::str::FromStr;
use tracing::{debug, info, instrument};

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available<S: Store>(email: &str, store: &S) -> Result<bool, AppError> {
    // cuckoo filter: fast negative
    if !email_registry::might_exist(email) {
        return Ok(true);
    }

    // cache: fast positive
    if email_registry::is_taken(email).await {
        return Ok(false);
    }

    Ok(store.find_user_by_email(email).await?.is_none())
}

/// Account registration
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupReq,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing fields or email taken", body = Object, example = json!({
            "message": "User already exists"
        }))
    ),
    tag = "Auth"
)]
pub async fn signup<S: Store>(
    payload: web::Json<SignupReq>,
    store: web::Data<S>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let (Some(name), Some(email), Some(password)) = (
        filled(&payload.name),
        filled(&payload.email),
        filled(&payload.password),
    ) else {
        return Err(AppError::validation("Please provide name, email and password").into());
    };
    let email = email.to_lowercase();

    let role = match filled(&payload.role) {
        Some(role) => Role::from_str(role).map_err(|_| AppError::validation("Invalid role"))?,
        None => Role::Employee,
    };

    if !is_email_available(&email, store.get_ref()).await? {
        return Err(AppError::validation("User already exists").into());
    }

    let user = store
        .insert_user(NewUser {
            name: name.to_string(),
            email,
            role,
            credential: Credential::Password(hash_password(password)?),
        })
        .await?;
    email_registry::record(&user.email).await;

    let token = generate_token(&user, &config.jwt_secret, config.token_ttl)?;
    info!(user_id = user.id, role = %user.role, "User registered");

    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Password login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = Object, example = json!({
            "message": "Invalid credentials"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip_all)]
pub async fn login<S: Store>(
    payload: web::Json<LoginReqDto>,
    store: web::Data<S>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let (Some(email), Some(password)) = (filled(&payload.email), filled(&payload.password)) else {
        return Err(AppError::validation("Please provide email and password").into());
    };

    debug!("Fetching user from store");
    let invalid = || AppError::validation("Invalid credentials");

    let user = store
        .find_user_by_email(&email.to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    // external-only accounts have nothing to verify against
    let hash = user.credentials.password_hash().ok_or_else(invalid)?;
    if !verify_password(password, hash) {
        info!(user_id = user.id, "Invalid credentials: password mismatch");
        return Err(invalid().into());
    }

    let token = generate_token(&user, &config.jwt_secret, config.token_ttl)?;
    info!(user_id = user.id, "Login successful");

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/auth/update-password",
    request_body = UpdatePasswordReq,
    responses(
        (status = 200, description = "Password updated", body = Object, example = json!({
            "message": "Password updated successfully"
        })),
        (status = 400, description = "Missing or mismatched passwords"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn update_password<S: Store>(
    auth: AuthUser,
    payload: web::Json<UpdatePasswordReq>,
    store: web::Data<S>,
) -> actix_web::Result<HttpResponse> {
    let (Some(password), Some(confirm)) = (filled(&payload.password), filled(&payload.confirm_password)) else {
        return Err(AppError::validation("Please provide password and confirmPassword").into());
    };

    if password != confirm {
        return Err(AppError::validation("Passwords do not match").into());
    }

    store.update_password(auth.user_id, &hash_password(password)?).await?;
    info!(user_id = auth.user_id, "Password updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password updated successfully"
    })))
}
