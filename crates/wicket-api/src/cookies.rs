use crate::error::ApiError;
use axum::http::{header, HeaderMap, HeaderValue};

pub const SESSION_COOKIE_NAME: &str = "admin_token";
const SESSION_COOKIE_PATH: &str = "/";

const CLEAR_SESSION_COOKIE: &str = "admin_token=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT";
const CLEAR_SESSION_COOKIE_SECURE: &str = "admin_token=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure";

pub fn build_session_cookie(token: &str, ttl_seconds: u64, secure: bool) -> String {
    let secure_attr = if secure { "; Secure" } else { "" };
    format!(
        "{name}={value}; HttpOnly; Path={path}; SameSite=Strict; Max-Age={max_age}{secure}",
        name = SESSION_COOKIE_NAME,
        value = token,
        path = SESSION_COOKIE_PATH,
        max_age = ttl_seconds,
        secure = secure_attr,
    )
}

pub fn session_cookie_clear(secure: bool) -> HeaderValue {
    HeaderValue::from_static(if secure {
        CLEAR_SESSION_COOKIE_SECURE
    } else {
        CLEAR_SESSION_COOKIE
    })
}

/// Value of the named cookie, if the request carries it. Empty values
/// count as absent.
pub fn get_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    for raw in headers.get_all(header::COOKIE) {
        let Ok(raw) = raw.to_str() else {
            continue;
        };
        for part in raw.split(';') {
            let Some((name, value)) = part.trim().split_once('=') else {
                continue;
            };
            if name == cookie_name {
                let value = value.trim();
                return (!value.is_empty()).then(|| value.to_string());
            }
        }
    }
    None
}

pub fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("invalid header value: {}", e)))
}
