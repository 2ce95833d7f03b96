use crate::cookies::{get_cookie_value, session_cookie_clear, SESSION_COOKIE_NAME};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use percent_encoding::percent_decode_str;
use wicket_core::AppState;

pub const LOGIN_PATH: &str = "/admin/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminArea {
    Outside,
    LoginPage,
    Protected,
}

/// Path components after percent-decoding, with empty and `.` segments
/// dropped and `..` applied, so `//admin/x`, `/admin%2Fx` and `/./admin/x`
/// all land under `admin`.
fn normalized_segments(path: &str) -> Vec<String> {
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let mut segments: Vec<String> = Vec::new();
    for part in decoded.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_owned()),
        }
    }
    segments
}

pub fn classify_path(path: &str) -> AdminArea {
    let segments = normalized_segments(path);
    // Case-insensitive filesystems would serve `/ADMIN/...` from the same files.
    match segments.as_slice() {
        [first, ..] if !first.eq_ignore_ascii_case("admin") => AdminArea::Outside,
        [] => AdminArea::Outside,
        [_, login] if login.eq_ignore_ascii_case("login") => AdminArea::LoginPage,
        _ => AdminArea::Protected,
    }
}

/// Session gate, layered over the whole router so the static fallback is
/// covered too. Anything that does not resolve under `/admin` passes
/// straight through.
///
/// Without a cookie only the login page is reachable. A cookie that
/// verifies sends the login page on to the dashboard and lets every other
/// path through with the claims attached. A cookie that fails to verify is
/// cleared and the client is sent back to the login page.
pub async fn admin_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let on_login_page = match classify_path(request.uri().path()) {
        AdminArea::Outside => return next.run(request).await,
        AdminArea::LoginPage => true,
        AdminArea::Protected => false,
    };
    let Some(token) = get_cookie_value(request.headers(), SESSION_COOKIE_NAME) else {
        if on_login_page {
            return next.run(request).await;
        }
        tracing::debug!(path = %request.uri().path(), "no session cookie, redirecting to login");
        return Redirect::temporary(LOGIN_PATH).into_response();
    };

    match state.tokens.verify(&token, state.clock.now()) {
        Ok(_) if on_login_page => Redirect::temporary(DASHBOARD_PATH).into_response(),
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            tracing::info!(
                path = %request.uri().path(),
                reason = err.code(),
                "rejected admin session cookie"
            );
            (
                AppendHeaders([(
                    header::SET_COOKIE,
                    session_cookie_clear(state.config.secure_cookies()),
                )]),
                Redirect::temporary(LOGIN_PATH),
            )
                .into_response()
        }
    }
}
