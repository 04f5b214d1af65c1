//! Chat callbacks. Every request is signature-checked, acknowledged at once,
//! and answered from a spawned task.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Form, Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::chat::messages::{SLASH_ACK, TEST_MESSAGE};
use crate::errors::AppError;
use crate::pipeline::summary::Stage;
use crate::slack::events::{interpret_event, EventAction, EventPayload, SlashCommand, RETRY_HEADER};
use crate::slack::signature::verify_request;
use crate::state::AppState;

fn verify(state: &AppState, stage: Stage, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let secret = state.bot(stage).config.signing_secret.as_deref();
    verify_request(secret, headers, body, chrono::Utc::now().timestamp())
}

async fn handle_event(
    state: AppState,
    stage: Stage,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    verify(&state, stage, &headers, &body)?;
    let payload: EventPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid event payload: {e}")))?;

    let bot = state.bot(stage).clone();
    let is_retry = headers.contains_key(RETRY_HEADER);
    match interpret_event(payload, is_retry, bot.config.bot_user_id.as_deref()) {
        EventAction::Challenge(challenge) => Ok(Json(json!({ "challenge": challenge }))),
        EventAction::Ignore(reason) => {
            debug!(bot = stage.agent(), reason, "Event ignored");
            Ok(Json(json!({ "ok": true })))
        }
        EventAction::Reply(incoming) => {
            tokio::spawn(async move { bot.process_message(incoming).await });
            Ok(Json(json!({ "ok": true })))
        }
    }
}

async fn handle_command(
    state: AppState,
    stage: Stage,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    verify(&state, stage, &headers, &body)?;
    let request = Request::builder()
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .map_err(|e| AppError::Internal(e.into()))?;
    let Form(command) = Form::<SlashCommand>::from_request(request, &())
        .await
        .map_err(|e| AppError::Validation(format!("Invalid slash command: {e}")))?;

    let bot = state.bot(stage).clone();
    tokio::spawn(async move { bot.process_slash(command).await });
    Ok(Json(json!({ "response_type": "ephemeral", "text": SLASH_ACK })))
}

/// POST /slack/riva
pub async fn handle_riva_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    handle_event(state, Stage::L1, headers, body).await
}

/// POST /slack/arjun
pub async fn handle_arjun_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    handle_event(state, Stage::L2, headers, body).await
}

/// POST /slack/riva/commands
pub async fn handle_riva_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    handle_command(state, Stage::L1, headers, body).await
}

/// POST /slack/arjun/commands
pub async fn handle_arjun_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    handle_command(state, Stage::L2, headers, body).await
}

/// GET /slack-test
/// Posts a test message to Riva's default channel, else Arjun's.
pub async fn handle_slack_test(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let bot = [&state.riva, &state.arjun]
        .into_iter()
        .find(|bot| bot.config.default_channel_id.is_some())
        .ok_or_else(|| AppError::Misconfigured("No default chat channel configured".to_string()))?;
    let channel = bot.config.default_channel_id.as_deref().unwrap_or_default();

    let ts = bot.poster.post_message(channel, TEST_MESSAGE, None).await?;
    info!(bot = bot.chat.stage().agent(), channel, "Test message posted");
    Ok(Json(json!({ "ok": true, "channel": channel, "ts": ts })))
}
