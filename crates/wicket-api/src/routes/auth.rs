use crate::cookies::{
    build_session_cookie, get_cookie_value, header_value, session_cookie_clear,
    SESSION_COOKIE_NAME,
};
use crate::error::ApiError;
use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::{IpAddr, SocketAddr};
use wicket_core::{
    session::{self, LoginAttempt},
    AppConfig, AppState, AuthError,
};

const MAX_LOGIN_BODY_BYTES: usize = 16 * 1024;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    captcha_token: Option<String>,
    #[serde(default)]
    client_info: Option<Value>,
}

/// First `X-Forwarded-For` hop when the peer is a trusted proxy, otherwise
/// the socket peer, then `"unknown"`.
fn resolve_client_ip(headers: &HeaderMap, peer_ip: Option<IpAddr>, config: &AppConfig) -> String {
    if peer_ip.is_some_and(|ip| config.trusts_proxy(ip)) {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return ip.to_string();
        }
    }
    peer_ip
        .map(|ip| ip.to_canonical().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn read_login_request(request: Request) -> Result<LoginRequest, AuthError> {
    let body_bytes = to_bytes(request.into_body(), MAX_LOGIN_BODY_BYTES)
        .await
        .map_err(|_| AuthError::InvalidFormat("request body".into()))?;
    serde_json::from_slice(&body_bytes).map_err(|_| AuthError::InvalidFormat("request body".into()))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = resolve_client_ip(&headers, peer_ip, &state.config);

    let body = match read_login_request(request).await {
        Ok(body) => body,
        Err(err) => {
            // A locked-out client hears about the lockout, not the body.
            session::check_lockout(&state, &client)?;
            return Err(err.into());
        }
    };

    if let Some(info) = &body.client_info {
        tracing::debug!(client = %client, client_info = %info, "login client metadata");
    }

    let success = session::login(
        &state,
        LoginAttempt {
            identifier: body.identifier,
            password: body.password,
            captcha_token: body.captcha_token,
            client,
        },
    )
    .await?;

    let cookie = build_session_cookie(
        &success.token.token,
        state.tokens.ttl_seconds(),
        state.config.secure_cookies(),
    );
    Ok((
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, header_value(&cookie)?)]),
        Json(json!({
            "message": "login successful",
            "account": success.account,
        })),
    ))
}

pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = get_cookie_value(&headers, SESSION_COOKIE_NAME);
    let account = session::current_session(&state, token.as_deref())?;
    Ok(Json(json!({ "account": account })))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let had_session = get_cookie_value(&headers, SESSION_COOKIE_NAME).is_some();
    tracing::info!(had_session, "admin signed out");
    (
        StatusCode::OK,
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie_clear(state.config.secure_cookies()),
        )]),
        Json(json!({ "success": true })),
    )
}
