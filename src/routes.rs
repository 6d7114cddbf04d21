use crate::{
    api::{audit, bulk, leave, notification, reports, review},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-route limiter. A misconfigured zero rate degrades to the
/// slowest valid limiter instead of panicking at startup, and rates
/// past one request per millisecond clamp to the fastest.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("limiter config only holds non-zero values");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/bootstrap-admin")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::bootstrap_admin)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(web::resource("/password").route(web::post().to(handlers::change_password)))
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::leave_list))
                            .route(web::post().to(leave::create_leave)),
                    )
                    // /leave/bulk-status
                    .service(
                        web::resource("/bulk-status").route(web::post().to(bulk::bulk_status)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(review::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(review::reject_leave)),
                    )
                    // /leave/{id}/override
                    .service(
                        web::resource("/{id}/override")
                            .route(web::put().to(review::override_leave)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/summary").route(web::get().to(reports::summary)))
                    .service(web::resource("/monthly").route(web::get().to(reports::monthly)))
                    .service(web::resource("/types").route(web::get().to(reports::types)))
                    .service(
                        web::resource("/top-requesters")
                            .route(web::get().to(reports::top_requesters)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(web::resource("").route(web::get().to(notification::list)))
                    .service(
                        web::resource("/unread-count")
                            .route(web::get().to(notification::unread_count)),
                    )
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notification::mark_read)),
                    ),
            )
            .service(web::scope("/audit").service(web::resource("").route(web::get().to(audit::list)))),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_builds_a_limiter_instead_of_panicking() {
        let _ = build_limiter(0);
    }

    #[test]
    fn extreme_rate_builds_a_limiter() {
        // Above one request per millisecond the period would truncate
        // to zero without the clamp.
        let _ = build_limiter(100_000);
    }

    #[test]
    fn typical_rates_build() {
        let _ = build_limiter(60);
        let _ = build_limiter(1000);
    }
}
