use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};

use crate::errors::AppError;
use crate::pipeline::summary::{BatchSummary, Stage};
use crate::state::AppState;

/// Open when no trigger token is configured.
fn check_trigger_token(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    let Some(token) = presented else {
        return Err(AppError::Unauthorized("Missing bearer token".to_string()));
    };
    ring::constant_time::verify_slices_are_equal(token.as_bytes(), expected.as_bytes())
        .map_err(|_| AppError::Unauthorized("Invalid batch trigger token".to_string()))
}

async fn trigger(state: AppState, headers: HeaderMap, stage: Stage) -> Result<Json<BatchSummary>, AppError> {
    check_trigger_token(state.config.batch_trigger_token.as_deref(), &headers)?;
    Ok(Json(state.jobs.run(stage).await))
}

/// POST /run-l1-batch
pub async fn handle_run_l1_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BatchSummary>, AppError> {
    trigger(state, headers, Stage::L1).await
}

/// POST /run-l2-batch
pub async fn handle_run_l2_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BatchSummary>, AppError> {
    trigger(state, headers, Stage::L2).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
        headers
    }

    #[test]
    fn test_no_token_configured_is_open() {
        assert!(check_trigger_token(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_token_must_match() {
        assert!(check_trigger_token(Some("s3cret"), &bearer("s3cret")).is_ok());
        assert!(matches!(
            check_trigger_token(Some("s3cret"), &bearer("nope")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            check_trigger_token(Some("s3cret"), &HeaderMap::new()),
            Err(AppError::Unauthorized(_))
        ));
    }
}
