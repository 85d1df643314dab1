use crate::application::{reservations, suspension};
use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{self, AppState};

/// Expires overdue reservations before the request is served.
/// A failed sweep is logged and the request still goes through.
async fn expire_reservations(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = reservations::expire_overdue_reservations(&state.service_deps).await {
        tracing::warn!(error = ?err, "reservation expiry sweep failed");
    }
    next.run(request).await
}

/// Suspends members with overdue fines before the request is served
async fn suspend_members(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = suspension::run_suspension_sweep(&state.service_deps).await {
        tracing::warn!(error = ?err, "suspension sweep failed");
    }
    next.run(request).await
}

/// Creates the API router.
///
/// Member-facing routes (catalogue browsing, reservations and account
/// views) run the suspension sweep and then the reservation expiry sweep
/// before the handler. Both sweeps can be triggered manually by staff.
pub fn create_router(state: Arc<AppState>) -> Router {
    let browsing = Router::new()
        .route("/books", get(handlers::search_books).post(handlers::add_book))
        .route(
            "/books/:id",
            get(handlers::get_book)
                .put(handlers::edit_book)
                .delete(handlers::delete_book),
        )
        .route("/categories", get(handlers::list_categories))
        .route(
            "/reservations",
            get(handlers::list_pending_reservations).post(handlers::reserve_book),
        )
        .route("/reservations/:id/collect", post(handlers::collect_reservation))
        .route("/reservations/:id/cancel", post(handlers::cancel_reservation))
        .route(
            "/reservation-codes/:code",
            get(handlers::find_reservation_by_code),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            expire_reservations,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            suspend_members,
        ));

    let member_views = Router::new()
        .route("/members/:id/account", get(handlers::get_account))
        .route(
            "/members/:id/reservations",
            get(handlers::list_member_reservations),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            expire_reservations,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            suspend_members,
        ));

    let operations = Router::new()
        .route(
            "/members",
            get(handlers::list_members).post(handlers::add_member),
        )
        .route(
            "/members/:id",
            get(handlers::get_member)
                .put(handlers::edit_member)
                .delete(handlers::delete_member),
        )
        .route("/borrowings", post(handlers::borrow_book))
        .route("/borrowings/:id/return", post(handlers::return_book))
        .route(
            "/borrowings/:id/damage",
            post(handlers::report_damage),
        )
        .route(
            "/borrowings/:id/damage/preview",
            get(handlers::preview_damage),
        )
        .route("/fines/late/:id/pay", post(handlers::pay_late_fine))
        .route("/fines/damage/:id/pay", post(handlers::pay_damage_fine))
        .route("/penalties/:id/pay", post(handlers::pay_penalty))
        .route("/sweeps/reservations", post(handlers::run_expiry_sweep))
        .route("/sweeps/suspensions", post(handlers::run_suspension_sweep))
        .route("/reports/borrowings", get(handlers::borrowing_report))
        .route("/reports/damages", get(handlers::damage_report))
        .route("/reports/suspension-risk", get(handlers::suspension_risk))
        .route("/time", get(handlers::time_status))
        .route("/time/set", post(handlers::set_time))
        .route("/time/advance", post(handlers::advance_time))
        .route("/time/reset", post(handlers::reset_time));

    Router::new()
        .route("/health", get(health_check))
        .merge(browsing)
        .merge(member_views)
        .merge(operations)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
