use crate::handlers::{
    health_handler, list_files_handler, root_handler, session_handler, start_analysis_handler,
    user_message_handler,
};
use axum::{
    routing::{get, post},
    Router,
};
use intake_dispatch::IntakeService;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    /// Service the handlers call into.
    pub service: Arc<IntakeService>,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Builds the router over an already wired service.
    pub fn build(service: Arc<IntakeService>) -> Router {
        let state = Arc::new(AppState { service });

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/start_analysis", post(start_analysis_handler))
            .route("/list_files", post(list_files_handler))
            .route("/user_message", post(user_message_handler))
            .route("/sessions/{id}", get(session_handler))
            .with_state(state)
    }
}
