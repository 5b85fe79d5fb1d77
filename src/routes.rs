use crate::{
    api::{leave_request, manager},
    auth::{google, handlers, middleware::auth_middleware},
    config::Config,
    error::{json_error, leave_json_error, path_error, query_error},
    store::Store,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter state. Built once at startup and cloned into every worker so
/// all workers count against the same buckets.
#[derive(Clone)]
pub struct RateLimits {
    login: LimiterConfig,
    signup: LimiterConfig,
    password: LimiterConfig,
    protected: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min).context("invalid login rate limit")?,
            signup: build_limiter(config.rate_signup_per_min).context("invalid signup rate limit")?,
            password: build_limiter(config.rate_password_per_min).context("invalid password rate limit")?,
            protected: build_limiter(config.rate_protected_per_min)
                .context("invalid protected rate limit")?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Option<LimiterConfig> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
}

pub fn configure<S: Store>(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    let prefix = config.api_prefix.trim_end_matches('/');

    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .app_data(web::QueryConfig::default().error_handler(query_error));

    // Public routes
    cfg.service(
        web::scope(&format!("{prefix}/auth"))
            .service(
                web::resource("/signup")
                    .wrap(Governor::new(&limits.signup))
                    .route(web::post().to(handlers::signup::<S>)),
            )
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::login::<S>)),
            )
            // Google sign-in counts against the login bucket
            .service(
                web::resource("/google")
                    .wrap(Governor::new(&limits.login))
                    .route(web::get().to(google::google_login)),
            )
            .service(
                web::resource("/google/callback")
                    .wrap(Governor::new(&limits.login))
                    .route(web::get().to(google::google_callback::<S>)),
            )
            // bearer checked by the AuthUser extractor
            .service(
                web::resource("/update-password")
                    .wrap(Governor::new(&limits.password))
                    .route(web::post().to(handlers::update_password::<S>)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .service(
                web::scope("/leaves")
                    .service(
                        web::resource("/request")
                            .app_data(web::JsonConfig::default().error_handler(leave_json_error))
                            .route(web::post().to(leave_request::create_leave::<S>)),
                    )
                    .service(web::resource("/requests").route(web::get().to(leave_request::my_leaves::<S>)))
                    .service(web::resource("/balance").route(web::get().to(leave_request::leave_balance::<S>))),
            )
            .service(
                web::scope("/manager")
                    // /manager/requests
                    .service(web::resource("/requests").route(web::get().to(manager::list_requests::<S>)))
                    // /manager/requests/{id}
                    .service(
                        web::resource("/requests/{id}").route(web::put().to(manager::update_leave_status::<S>)),
                    )
                    .service(web::resource("/employees").route(web::get().to(manager::list_employees::<S>)))
                    .service(
                        web::resource("/leave-calendar").route(web::get().to(manager::leave_calendar::<S>)),
                    ),
            ),
    );
}
