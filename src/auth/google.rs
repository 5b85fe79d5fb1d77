//! Google sign-in via the OAuth 2.0 authorization code flow.
//!
//! `/google` redirects to the consent screen with a single-use `state`; the callback
//! trades the code for the user's OpenID profile and hands it to
//! [`resolve_external_login`].
use crate::auth::jwt::generate_token;
use crate::auth::oauth::{ExternalProfile, resolve_external_login};
use crate::config::Config;
use crate::error::AppError;
use crate::models::AuthResponse;
use crate::store::Store;
use actix_web::{HttpResponse, http::header, web};
use moka::future::Cache;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use utoipa::IntoParams;
use uuid::Uuid;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";
const STATE_TTL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct GoogleOAuth {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    http: reqwest::Client,
    /// issued `state` values still waiting for their callback
    states: Cache<String, ()>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
}

impl UserInfo {
    /// Accounts are keyed by email, so an unverified or missing one is refused.
    fn into_profile(self) -> Option<ExternalProfile> {
        if self.email_verified == Some(false) {
            return None;
        }
        let email = self.email.filter(|e| !e.trim().is_empty())?;
        let display_name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        Some(ExternalProfile {
            subject: self.sub,
            email,
            display_name,
        })
    }
}

impl GoogleOAuth {
    /// `None` unless client id, secret and redirect URL are all configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        Some(Self::new(
            config.google_client_id.clone()?,
            config.google_client_secret.clone()?,
            config.google_redirect_url.clone()?,
        ))
    }

    pub fn new(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_url,
            http: reqwest::Client::new(),
            states: Cache::builder().max_capacity(10_000).time_to_live(STATE_TTL).build(),
        }
    }

    pub async fn authorize_url(&self) -> Result<Url, AppError> {
        let state = Uuid::new_v4().to_string();
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(format!("invalid authorize url: {e}")))?;

        self.states.insert(state, ()).await;
        Ok(url)
    }

    /// True once per issued state.
    async fn take_state(&self, state: &str) -> bool {
        self.states.remove(state).await.is_some()
    }

    async fn exchange(&self, code: &str) -> Result<UserInfo, reqwest::Error> {
        let token = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<TokenResponse>()
            .await?;

        self.http
            .get(USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<UserInfo>()
            .await
    }
}

fn not_configured() -> AppError {
    AppError::not_found("Google sign-in is not configured")
}

fn failed() -> AppError {
    AppError::Unauthorized("Google authentication failed".into())
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// set by Google when the user declines consent
    pub error: Option<String>,
}

/// Redirect to Google's consent screen
#[utoipa::path(
    get,
    path = "/api/auth/google",
    responses(
        (status = 302, description = "Redirect to Google"),
        (status = 404, description = "Google sign-in is not configured")
    ),
    tag = "Auth"
)]
pub async fn google_login(google: Option<web::Data<GoogleOAuth>>) -> actix_web::Result<HttpResponse> {
    let google = google.ok_or_else(not_configured)?;
    let url = google.authorize_url().await?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, url.as_str()))
        .finish())
}

/// Complete Google sign-in
#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Logged in", body = crate::models::AuthResponse),
        (status = 401, description = "Google authentication failed", body = Object, example = json!({
            "message": "Google authentication failed"
        })),
        (status = 404, description = "Google sign-in is not configured")
    ),
    tag = "Auth"
)]
pub async fn google_callback<S: Store>(
    google: Option<web::Data<GoogleOAuth>>,
    query: web::Query<CallbackQuery>,
    store: web::Data<S>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let google = google.ok_or_else(not_configured)?;

    if let Some(error) = &query.error {
        info!(error = %error, "Google sign-in declined");
        return Err(failed().into());
    }

    let (Some(code), Some(state)) = (query.code.as_deref(), query.state.as_deref()) else {
        return Err(failed().into());
    };

    if !google.take_state(state).await {
        warn!("Google callback with unknown or expired state");
        return Err(failed().into());
    }

    let profile = google
        .exchange(code)
        .await
        .map_err(|e| {
            warn!(error = %e, "Google code exchange failed");
            failed()
        })?
        .into_profile()
        .ok_or_else(failed)?;

    let user = resolve_external_login(store.get_ref(), profile).await?;
    let token = generate_token(&user, &config.jwt_secret, config.token_ttl)?;
    info!(user_id = user.id, "Google login successful");

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}
