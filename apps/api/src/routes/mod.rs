pub mod batch;
pub mod health;
pub mod slack;

use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

use crate::state::AppState;

/// Which agent a request acts for, as recorded in request logs.
fn actor_for(path: &str) -> &'static str {
    if path.starts_with("/slack/riva") || path == "/run-l1-batch" {
        "Riva"
    } else if path.starts_with("/slack/arjun") || path == "/run-l2-batch" {
        "Arjun"
    } else {
        "API"
    }
}

/// Emits one `request_completed` event per request.
async fn log_requests(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = Uuid::new_v4();
    let endpoint = request.uri().path().to_string();
    let method = request.method().clone();

    let response = next.run(request).await;

    info!(
        request_id = %request_id,
        endpoint = %endpoint,
        method = %method,
        actor = actor_for(&endpoint),
        status_code = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request_completed"
    );
    response
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/healthz", get(health::health_handler))
        .route("/debug-port", get(health::debug_port_handler))
        .route("/debug/config", get(health::debug_config_handler))
        // Batch triggers
        .route("/run-l1-batch", post(batch::handle_run_l1_batch))
        .route("/run-l2-batch", post(batch::handle_run_l2_batch))
        // Chat callbacks
        .route("/slack/riva", post(slack::handle_riva_event))
        .route("/slack/arjun", post(slack::handle_arjun_event))
        .route("/slack/riva/commands", post(slack::handle_riva_command))
        .route("/slack/arjun/commands", post(slack::handle_arjun_command))
        .route("/slack-test", get(slack::handle_slack_test))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}
