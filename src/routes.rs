use crate::{
    api::{employee, leave_application, leave_balance, timesheet},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);
    let sync_limiter = build_limiter(config.rate_sync_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave/balance/sync-all (registered before the id route)
                    .service(
                        web::resource("/balance/sync-all")
                            .wrap(sync_limiter)
                            .route(web::post().to(leave_balance::sync_all_balances)),
                    )
                    // /leave/balance/{employee_id}
                    .service(
                        web::resource("/balance/{employee_id}")
                            .route(web::get().to(leave_balance::get_balance))
                            .route(web::put().to(leave_balance::save_balance)),
                    )
                    // /leave/balance
                    .service(
                        web::resource("/balance")
                            .route(web::get().to(leave_balance::get_my_balance)),
                    )
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_application::leave_list))
                            .route(web::post().to(leave_application::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_application::get_leave)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_application::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_application::reject_leave)),
                    ),
            )
            .service(
                web::scope("/timesheets")
                    // /timesheets/locked-days
                    .service(
                        web::resource("/locked-days")
                            .route(web::get().to(timesheet::get_locked_days)),
                    )
                    // /timesheets
                    .service(
                        web::resource("")
                            .route(web::get().to(timesheet::get_timesheet))
                            .route(web::put().to(timesheet::save_timesheet)),
                    ),
            ),
    );
}

// LEAVE APPROVAL
//  ├─ UPDATE leave_applications.status
//  └─ sync each touched timesheet week (idempotent; re-issue on failure)
