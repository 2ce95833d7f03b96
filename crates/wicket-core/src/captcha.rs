//! Server-side CAPTCHA token verification against a reCAPTCHA-compatible
//! `siteverify` endpoint.

use crate::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaVerdict {
    Passed,
    Rejected,
    /// No verdict could be obtained (not configured, timeout, provider
    /// error). Login proceeds without the check.
    Unavailable,
}

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> CaptchaVerdict;

    fn is_configured(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_verify_url() -> String {
    DEFAULT_VERIFY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            verify_url: default_verify_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct SiteVerifyClient {
    client: reqwest::Client,
    secret: Option<String>,
    verify_url: String,
}

impl SiteVerifyClient {
    pub fn new(config: &CaptchaConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("wicket/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Configuration(format!("captcha http client: {e}")))?;
        let secret = config
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Ok(Self {
            client,
            secret,
            verify_url: config.verify_url.clone(),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for SiteVerifyClient {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> CaptchaVerdict {
        let Some(secret) = self.secret.as_deref() else {
            tracing::warn!("captcha token supplied but no captcha secret is configured; skipping check");
            return CaptchaVerdict::Unavailable;
        };

        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = remote_ip.filter(|ip| *ip != "unknown") {
            form.push(("remoteip", ip));
        }

        let response = match self.client.post(&self.verify_url).form(&form).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, timeout = err.is_timeout(), "captcha provider unreachable; skipping check");
                return CaptchaVerdict::Unavailable;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "captcha provider returned an error; skipping check");
            return CaptchaVerdict::Unavailable;
        }

        match response.json::<SiteVerifyResponse>().await {
            Ok(body) if body.success => CaptchaVerdict::Passed,
            Ok(body) => {
                tracing::info!(error_codes = ?body.error_codes, "captcha token rejected");
                CaptchaVerdict::Rejected
            }
            Err(err) => {
                tracing::warn!(error = %err, "captcha provider response unreadable; skipping check");
                CaptchaVerdict::Unavailable
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.secret.is_some()
    }
}
