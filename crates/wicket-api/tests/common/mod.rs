#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use wicket_core::{
    auth::hash_password, AppConfig, AppState, CaptchaVerdict, CaptchaVerifier, Clock,
    CredentialStore, Environment, ManualClock,
};
use wicket_models::AdminAccount;

pub const IDENTIFIER: &str = "2021-00042";
pub const DISPLAY_NAME: &str = "Ada Lovelace";
pub const PASSWORD: &str = "hunter22!";
pub const SECRET: &str = "5d41402abc4b2a76b9719d911017c592aa";

static PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password(PASSWORD).expect("hash test password"));

pub struct FixedCaptcha(pub CaptchaVerdict);

#[async_trait]
impl CaptchaVerifier for FixedCaptcha {
    async fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> CaptchaVerdict {
        self.0
    }

    fn is_configured(&self) -> bool {
        true
    }
}

pub struct TestHarness {
    pub app: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub fn new() -> anyhow::Result<Self> {
        Self::build(Environment::Development, CaptchaVerdict::Passed, None)
    }

    pub fn build(
        environment: Environment,
        captcha: CaptchaVerdict,
        web_dir: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let config = AppConfig {
            environment,
            jwt_secret: SECRET.to_string(),
            ..AppConfig::default()
        };
        let credentials: CredentialStore = [AdminAccount::new(
            IDENTIFIER,
            DISPLAY_NAME,
            PASSWORD_HASH.as_str(),
        )]
        .into_iter()
        .collect();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let state = AppState::new(config, credentials)?
            .with_clock(clock.clone())
            .with_captcha(Arc::new(FixedCaptcha(captcha)));
        let app = wicket_api::build_router(state.clone(), web_dir);
        Ok(Self { app, state, clock })
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn send(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response = self.app.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();
        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn login_from(
        &self,
        client: &str,
        identifier: &str,
        password: &str,
    ) -> anyhow::Result<TestResponse> {
        let body = serde_json::json!({ "identifier": identifier, "password": password });
        self.send(json_post("/api/auth/login", client, &body.to_string())?)
            .await
    }

    pub async fn login(&self, identifier: &str, password: &str) -> anyhow::Result<TestResponse> {
        self.login_from("198.51.100.7", identifier, password).await
    }

    /// Logs in with the fixture account and returns the raw token.
    pub async fn session_token(&self) -> anyhow::Result<String> {
        let response = self.login(IDENTIFIER, PASSWORD).await?;
        assert_eq!(response.status, StatusCode::OK);
        response
            .session_cookie()
            .ok_or_else(|| anyhow::anyhow!("login did not set a session cookie"))
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// Value assigned to `admin_token`, if the response sets it.
    pub fn session_cookie(&self) -> Option<String> {
        let raw = self.set_cookie()?;
        let (pair, _) = raw.split_once(';').unwrap_or((raw, ""));
        pair.strip_prefix("admin_token=").map(str::to_string)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Loopback peer, which the default config trusts as a reverse proxy.
pub fn proxy_peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}

/// POST as if relayed by the local reverse proxy for `client`.
pub fn json_post(uri: &str, client: &str, body: &str) -> anyhow::Result<Request<Body>> {
    json_post_via(uri, proxy_peer(), Some(client), body)
}

pub fn json_post_via(
    uri: &str,
    peer: SocketAddr,
    forwarded_for: Option<&str>,
    body: &str,
) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .extension(ConnectInfo(peer));
    if let Some(client) = forwarded_for {
        builder = builder.header("x-forwarded-for", client);
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

pub fn get_with_cookie(uri: &str, token: Option<&str>) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("admin_token={token}"));
    }
    Ok(builder.body(Body::empty())?)
}
