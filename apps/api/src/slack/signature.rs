//! Request signing check for inbound chat callbacks.
//!
//! Expected header: `v0=` + hex(HMAC-SHA256(secret, "v0:{timestamp}:{body}")).

use axum::http::HeaderMap;
use ring::hmac;

use crate::errors::AppError;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Allowed clock skew between the chat platform and us.
pub const MAX_SKEW_SECS: i64 = 300;

pub fn verify_request(
    signing_secret: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<(), AppError> {
    let secret = signing_secret
        .ok_or_else(|| AppError::Misconfigured("Signing secret not configured".to_string()))?;

    let timestamp = header(headers, TIMESTAMP_HEADER)?;
    let signature = header(headers, SIGNATURE_HEADER)?;

    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid request timestamp".to_string()))?;
    if (now - ts).abs() > MAX_SKEW_SECS {
        return Err(AppError::Unauthorized("Stale request timestamp".to_string()));
    }

    let tag = signature
        .strip_prefix("v0=")
        .and_then(decode_hex)
        .ok_or_else(|| AppError::Unauthorized("Malformed signature".to_string()))?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, &base_string(timestamp, body), &tag)
        .map_err(|_| AppError::Unauthorized("Invalid signature".to_string()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {name} header")))
}

fn base_string(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut base = format!("v0:{timestamp}:").into_bytes();
    base.extend_from_slice(body);
    base
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, &base_string(timestamp, body));
    let hex: String = tag.as_ref().iter().map(|b| format!("{b:02x}")).collect();
    format!("v0={hex}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_700_000_000;

    fn signed_headers(ts: i64, body: &[u8]) -> HeaderMap {
        let ts = ts.to_string();
        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_str(&ts).unwrap());
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_str(&sign(SECRET, &ts, body)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_valid_signature_passes() {
        let body = b"token=x&command=%2Friva&text=help";
        assert!(verify_request(Some(SECRET), &signed_headers(NOW, body), body, NOW + 10).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let headers = signed_headers(NOW, b"text=help");
        let err = verify_request(Some(SECRET), &headers, b"text=hires", NOW).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let body = b"{}";
        let headers = signed_headers(NOW - MAX_SKEW_SECS - 1, body);
        assert!(matches!(
            verify_request(Some(SECRET), &headers, body, NOW),
            Err(AppError::Unauthorized(_))
        ));
        // Exactly at the limit is still accepted
        let headers = signed_headers(NOW - MAX_SKEW_SECS, body);
        assert!(verify_request(Some(SECRET), &headers, body, NOW).is_ok());
    }

    #[test]
    fn test_missing_headers_and_secret() {
        let err = verify_request(Some(SECRET), &HeaderMap::new(), b"{}", NOW).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");

        let err = verify_request(None, &signed_headers(NOW, b"{}"), b"{}", NOW).unwrap_err();
        assert_eq!(err.code(), "MISCONFIGURED");
    }

    #[test]
    fn test_non_integer_timestamp_is_rejected() {
        let mut headers = signed_headers(NOW, b"{}");
        headers.insert(TIMESTAMP_HEADER, HeaderValue::from_static("yesterday"));
        assert!(matches!(
            verify_request(Some(SECRET), &headers, b"{}", NOW),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("00ff10"), Some(vec![0x00, 0xff, 0x10]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
    }
}
