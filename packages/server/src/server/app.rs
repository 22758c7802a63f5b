//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::DispatchConfig;
use crate::domains::dispatch::{DispatchEngine, StatusReader};
use crate::domains::notifications::NotificationDispatcher;
use crate::kernel::{Coordinator, ServerDeps};
use crate::server::routes::{drivers, health_handler, rides};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub db_pool: PgPool,
    pub coordinator: Coordinator,
    pub deps: Arc<ServerDeps>,
    pub engine: Arc<DispatchEngine>,
    pub status_reader: StatusReader,
    pub notifier: NotificationDispatcher,
}

/// Build the Axum application router
///
/// Returns (Router, Arc<DispatchEngine>) - the engine handle is needed for
/// the sweeper and graceful shutdown.
pub fn build_app(
    pool: PgPool,
    coordinator: Coordinator,
    push: Arc<dyn crate::kernel::BasePushNotificationService>,
    dispatch: DispatchConfig,
) -> (Router, Arc<DispatchEngine>) {
    let deps = Arc::new(ServerDeps::production(
        pool.clone(),
        coordinator.clone(),
        push,
        dispatch,
    ));

    let engine = DispatchEngine::new(deps.clone());
    let status_reader = StatusReader::new(deps.requests.clone(), deps.rides.clone());
    let notifier = NotificationDispatcher::new(deps.users.clone(), deps.push.clone());

    let app_state = AxumAppState {
        db_pool: pool,
        coordinator,
        deps,
        engine: engine.clone(),
        status_reader,
        notifier,
    };

    // CORS: the mobile apps call from Expo origins in development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let ride_routes = Router::new()
        .route("/api/rides/requests", post(rides::create_request_handler))
        .route(
            "/api/rides/requests/:id/accept",
            post(rides::accept_request_handler),
        )
        .route(
            "/api/rides/requests/:id/decline",
            post(rides::decline_request_handler),
        )
        .route(
            "/api/rides/requests/:id/cancel",
            post(rides::cancel_request_handler),
        )
        .route(
            "/api/rides/requests/:id/status",
            get(rides::request_status_handler),
        )
        .route("/api/rides/requests/:id/arrived", post(rides::arrived_handler))
        .route("/api/rides/requests/:id/start", post(rides::start_trip_handler))
        .route(
            "/api/rides/requests/:id/complete",
            post(rides::complete_trip_handler),
        )
        .route(
            "/api/rides/requests/:id/payment-request",
            post(rides::payment_request_handler),
        );

    let driver_routes = Router::new()
        .route("/api/drivers/location", post(drivers::location_handler))
        .route(
            "/api/drivers/online-status",
            put(drivers::online_status_handler),
        )
        .route("/api/drivers/nearby", get(drivers::nearby_handler));

    let app = ride_routes
        .merge(driver_routes)
        .route("/health", get(health_handler))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    (app, engine)
}
