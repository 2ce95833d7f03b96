pub mod auth;
pub mod captcha;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod rate_limit;
pub mod session;

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

pub use auth::{IssuedToken, SessionClaims, TokenService};
pub use captcha::{CaptchaConfig, CaptchaVerdict, CaptchaVerifier, SiteVerifyClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::CredentialStore;
pub use error::AuthError;
pub use rate_limit::{RateLimitPolicy, RateLimitStore, RateLimiter};

pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Runtime settings for the auth core, resolved from the server config.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub rate_limit: RateLimitPolicy,
    pub captcha: CaptchaConfig,
    /// Peers whose `X-Forwarded-For` header is believed.
    pub trusted_proxies: Vec<IpAddr>,
}

pub fn default_trusted_proxies() -> Vec<IpAddr> {
    vec![
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            jwt_secret: String::new(),
            jwt_expiry_seconds: auth::DEFAULT_TOKEN_TTL_SECONDS,
            rate_limit: RateLimitPolicy::default(),
            captcha: CaptchaConfig::default(),
            trusted_proxies: default_trusted_proxies(),
        }
    }
}

pub fn looks_like_placeholder_secret(raw: &str) -> bool {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return true;
    }
    normalized.contains("change_me")
        || normalized.contains("changeme")
        || normalized.contains("replace_me")
        || normalized.contains("replace_with")
        || normalized.starts_with("example")
        || normalized == "devkey"
        || normalized == "devsecret"
        || normalized == "secret"
}

impl AppConfig {
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }

    pub fn trusts_proxy(&self, peer: IpAddr) -> bool {
        self.trusted_proxies.contains(&peer.to_canonical())
    }

    /// Rejects a missing signing secret outright. Weak secrets are fatal in
    /// production and only logged in development.
    pub fn validate(&self) -> Result<(), AuthError> {
        let secret = self.jwt_secret.trim();
        if secret.is_empty() {
            return Err(AuthError::Configuration(
                "auth.jwt_secret is not set".into(),
            ));
        }
        if secret.len() < MIN_SECRET_LEN || looks_like_placeholder_secret(secret) {
            if self.environment.is_production() {
                return Err(AuthError::Configuration(format!(
                    "auth.jwt_secret is too weak: use a random secret of at least {MIN_SECRET_LEN} characters"
                )));
            }
            tracing::warn!(
                "auth.jwt_secret is weak or a placeholder; acceptable for development only"
            );
        }
        if self.jwt_expiry_seconds == 0 {
            return Err(AuthError::Configuration(
                "auth.jwt_expiry_seconds must be greater than zero".into(),
            ));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(AuthError::Configuration(
                "rate_limit.max_attempts must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<CredentialStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub tokens: Arc<TokenService>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub clock: Arc<dyn Clock>,
    /// Verified against for unknown identifiers. Shares the cost parameters
    /// of a configured account hash.
    pub decoy_hash: Arc<str>,
}

const DECOY_PASSWORD: &str = "wicket-decoy-password";

impl AppState {
    pub fn new(config: AppConfig, credentials: CredentialStore) -> Result<Self, AuthError> {
        config.validate()?;
        let tokens = TokenService::new(&config.jwt_secret, config.jwt_expiry_seconds)?;
        let captcha = SiteVerifyClient::new(&config.captcha)?;
        if !captcha.is_configured() {
            tracing::warn!("captcha.secret is not set; captcha tokens will not be verified");
        }
        let rate_limiter = RateLimiter::in_memory(config.rate_limit);
        let decoy_hash = match credentials.reference_hash() {
            Some(reference) => auth::hash_password_like(DECOY_PASSWORD, reference)?,
            None => auth::hash_password(DECOY_PASSWORD)?,
        };
        Ok(Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            rate_limiter: Arc::new(rate_limiter),
            tokens: Arc::new(tokens),
            captcha: Arc::new(captcha),
            clock: Arc::new(SystemClock),
            decoy_hash: decoy_hash.into(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_captcha(mut self, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        self.captcha = captcha;
        self
    }

    pub fn with_rate_limit_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(store, self.config.rate_limit));
        self
    }
}
