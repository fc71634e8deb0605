use super::{
    handlers::{abuse, capacity, health, mint},
    middleware::{logging::logging_middleware, request_id::request_id_middleware},
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post},
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/mint", post(mint::mint))
        .route("/internal/mint/{secret}", post(mint::internal_mint))
        .route("/capacity/{tokenAddress}", get(capacity::get_capacity))
        .route("/abuse/stats/{identifier}", get(abuse::get_stats))
        .route("/abuse/ban", post(abuse::ban))
        .route("/abuse/unban", post(abuse::unban))
        .route("/abuse/whitelist/add", post(abuse::whitelist_add))
        .route("/abuse/whitelist/remove", post(abuse::whitelist_remove))
        .route("/health", get(health::health))
        .route("/payment/health", get(health::payment_health))
        .route("/kv/health", get(health::kv_health))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
