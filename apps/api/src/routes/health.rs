use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::config::{SlackBotConfig, FALLBACK_PORT};
use crate::state::AppState;

/// GET /health, GET /healthz
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /debug-port
pub async fn debug_port_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "env_port": state.config.port_env,
        "fallback_port": FALLBACK_PORT,
        "resolved_port": state.config.port.to_string(),
        "host": "0.0.0.0",
    }))
}

fn bot_view(bot: &SlackBotConfig) -> Value {
    json!({
        "bot_token_set": bot.bot_token.is_some(),
        "signing_secret_set": bot.signing_secret.is_some(),
        "default_channel_id": bot.default_channel_id,
        "bot_user_id": bot.bot_user_id,
    })
}

/// GET /debug/config
/// Secrets are reported only as set/unset.
pub async fn debug_config_handler(State(state): State<AppState>) -> Json<Value> {
    let c = &state.config;
    Json(json!({
        "s3": {
            "bucket": c.s3_bucket,
            "endpoint": c.s3_endpoint,
            "region": c.aws_region,
            "credentials_set": !c.aws_access_key_id.is_empty() && !c.aws_secret_access_key.is_empty(),
        },
        "anthropic_api_key_set": !c.anthropic_api_key.is_empty(),
        "port": c.port,
        "rust_log": c.rust_log,
        "folders": {
            "roles": c.folders.roles,
            "l1_pending": c.folders.l1_pending,
            "l2_pending": c.folders.l2_pending,
            "final_selected": c.folders.final_selected,
            "l1_rejected": c.folders.l1_rejected,
            "l2_rejected": c.folders.l2_rejected,
        },
        "l1_thresholds": {
            "advance": c.l1_advance_threshold,
            "reject": c.l1_reject_threshold,
        },
        "l2_thresholds": {
            "advance_score": c.l2_policy.advance_score,
            "advance_communication": c.l2_policy.advance_communication,
            "advance_leadership": c.l2_policy.advance_leadership,
            "reject_score": c.l2_policy.reject_score,
            "reject_communication": c.l2_policy.reject_communication,
            "hold_score_min": c.l2_policy.hold_score_min,
            "hold_communication_min": c.l2_policy.hold_communication_min,
        },
        "sheets": {
            "recruiter_sheet_id": c.recruiter_sheet_id,
            "decision_sheet_id": c.decision_sheet_id,
            "service_account_set": c.google_service_account_file.is_some(),
        },
        "slack": {
            "riva": bot_view(&c.riva),
            "arjun": bot_view(&c.arjun),
        },
        "batch_trigger_token_set": c.batch_trigger_token.is_some(),
        "memory": {
            "enabled": c.memory.enabled,
            "scope": c.memory.scope.as_str(),
            "database_url_set": c.memory.database_url.is_some(),
        },
        "scheduler": {
            "enabled": c.scheduler.enabled,
            "l1_hours": c.scheduler.l1_hours,
            "l2_hours": c.scheduler.l2_hours,
        },
        "llm_intent_fallback": c.llm_intent_fallback,
    }))
}
