/// API route modules
pub mod appointments;
pub mod auth;
pub mod health;

use crate::{middleware, state::AppState};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

/// All `/api` routes; protected ones sit behind the auth middleware
pub fn routes(app_state: AppState) -> Router<AppState> {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/auth/token", post(auth::obtain_token))
        .route("/auth/token/refresh", post(auth::refresh_token));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/appointments/list/", get(appointments::list_appointments))
        .route(
            "/appointments/create/",
            post(appointments::create_appointment),
        )
        .route(
            "/appointments/report/",
            get(appointments::appointment_report),
        )
        .route(
            "/appointments/:id/",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .patch(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state,
            middleware::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}
