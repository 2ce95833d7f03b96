use thiserror::Error;

/// Failure taxonomy shared by the login, session and gating paths.
///
/// `code()` is the stable machine-readable string sent to clients; the
/// `Display` text is the human-readable part.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identifier and password are required")]
    MissingCredentials,
    #[error("invalid {0}")]
    InvalidFormat(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("too many failed attempts, try again later")]
    RateLimited,
    #[error("captcha verification failed")]
    CaptchaFailed,
    #[error("not authenticated")]
    Unauthenticated,
    #[error("session expired")]
    TokenExpired,
    #[error("invalid session")]
    InvalidToken,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::InvalidFormat(_) => "INVALID_FORMAT",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::RateLimited => "RATE_LIMITED",
            Self::CaptchaFailed => "CAPTCHA_FAILED",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Configuration(_) | Self::Internal(_) => "SERVER_ERROR",
        }
    }

    /// Whether this failure counts against the client's rate-limit record.
    pub fn counts_as_attempt(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }
}
