use crate::auth::{verify_password, IssuedToken};
use crate::captcha::CaptchaVerdict;
use crate::error::AuthError;
use crate::AppState;
use wicket_models::{AdminAccount, PublicAccount, SessionAccount};
use wicket_util::validation::{validate_identifier, validate_password};

/// A login submission as received from the client.
#[derive(Clone, Default)]
pub struct LoginAttempt {
    pub identifier: Option<String>,
    pub password: Option<String>,
    pub captcha_token: Option<String>,
    /// Network origin used as the rate-limit key.
    pub client: String,
}

#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub account: PublicAccount,
    pub token: IssuedToken,
}

fn check_shape(attempt: &LoginAttempt) -> Result<(&str, &str), AuthError> {
    let identifier = attempt.identifier.as_deref().unwrap_or_default();
    let password = attempt.password.as_deref().unwrap_or_default();

    let identifier_check = validate_identifier(identifier);
    let password_check = validate_password(password);
    let missing = |check: &Result<(), wicket_util::validation::ValidationError>| {
        check.as_ref().err().is_some_and(|e| e.is_missing())
    };
    if missing(&identifier_check) || missing(&password_check) {
        return Err(AuthError::MissingCredentials);
    }
    identifier_check.map_err(|_| AuthError::InvalidFormat("identifier".into()))?;
    password_check.map_err(|_| AuthError::InvalidFormat("password".into()))?;
    Ok((identifier.trim(), password))
}

fn authenticate<'a>(
    state: &'a AppState,
    identifier: &str,
    password: &str,
) -> Result<&'a AdminAccount, AuthError> {
    let Some(account) = state.credentials.find_by_identifier(identifier) else {
        // Unknown identifiers pay for one argon2 verification too.
        let _ = verify_password(password, &state.decoy_hash);
        return Err(AuthError::InvalidCredentials);
    };
    match verify_password(password, &account.password_hash) {
        Ok(true) => Ok(account),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(err) => {
            tracing::error!(identifier, error = %err, "stored password hash is unusable");
            Err(err)
        }
    }
}

/// `RateLimited` while `client` is inside a lockout window.
pub fn check_lockout(state: &AppState, client: &str) -> Result<(), AuthError> {
    if state.rate_limiter.is_blocked(client, state.clock.now()) {
        tracing::warn!(client, "login refused: client is locked out");
        return Err(AuthError::RateLimited);
    }
    Ok(())
}

/// Runs the full login pipeline: lockout check, shape validation, CAPTCHA,
/// credential check, then token issuance.
pub async fn login(state: &AppState, attempt: LoginAttempt) -> Result<LoginSuccess, AuthError> {
    let client = attempt.client.as_str();
    check_lockout(state, client)?;

    let (identifier, password) = check_shape(&attempt)?;

    if let Some(token) = attempt
        .captcha_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if state.captcha.verify(token, Some(client)).await == CaptchaVerdict::Rejected {
            tracing::warn!(client, identifier, "login refused: captcha rejected");
            return Err(AuthError::CaptchaFailed);
        }
    }

    let account = match authenticate(state, identifier, password) {
        Ok(account) => account,
        Err(err) => {
            if err.counts_as_attempt() {
                let attempts = state.rate_limiter.record_failure(client, state.clock.now());
                tracing::warn!(client, identifier, attempts, "login failed");
            }
            return Err(err);
        }
    };

    state.rate_limiter.reset(client);
    let token = state.tokens.issue(account, state.clock.now())?;
    tracing::info!(client, identifier = %account.identifier, "admin signed in");
    Ok(LoginSuccess {
        account: account.public(),
        token,
    })
}

/// Resolves the account behind a session cookie value.
pub fn current_session(state: &AppState, token: Option<&str>) -> Result<SessionAccount, AuthError> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthenticated)?;
    let claims = state.tokens.verify(token, state.clock.now())?;
    if state.credentials.find_by_identifier(&claims.sub).is_none() {
        tracing::info!(identifier = %claims.sub, "session for an account that is no longer configured");
        return Err(AuthError::Unauthenticated);
    }
    Ok(claims.account())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::captcha::CaptchaVerifier;
    use crate::clock::ManualClock;
    use crate::{AppConfig, CredentialStore};
    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, LazyLock};

    const PASSWORD: &str = "hunter22";

    static HASH: LazyLock<String> = LazyLock::new(|| hash_password(PASSWORD).unwrap());

    struct FixedCaptcha {
        verdict: CaptchaVerdict,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CaptchaVerifier for FixedCaptcha {
        async fn verify(&self, _token: &str, _remote_ip: Option<&str>) -> CaptchaVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn state_with(verdict: CaptchaVerdict) -> (AppState, Arc<ManualClock>, Arc<FixedCaptcha>) {
        let config = AppConfig {
            jwt_secret: "a7f3c9e1b5d2f8a4c6e0b3d7f1a9c5e2".into(),
            ..AppConfig::default()
        };
        let credentials: CredentialStore =
            [AdminAccount::new("2021-00042", "Ada Lovelace", HASH.as_str())]
                .into_iter()
                .collect();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let captcha = Arc::new(FixedCaptcha {
            verdict,
            calls: AtomicUsize::new(0),
        });
        let state = AppState::new(config, credentials)
            .unwrap()
            .with_clock(clock.clone())
            .with_captcha(captcha.clone());
        (state, clock, captcha)
    }

    fn attempt(identifier: &str, password: &str) -> LoginAttempt {
        LoginAttempt {
            identifier: Some(identifier.into()),
            password: Some(password.into()),
            captcha_token: None,
            client: "198.51.100.7".into(),
        }
    }

    #[tokio::test]
    async fn successful_login_issues_token_for_identifier() {
        let (state, _, _) = state_with(CaptchaVerdict::Passed);
        let success = login(&state, attempt("2021-00042", PASSWORD)).await.unwrap();
        assert_eq!(success.account.identifier, "2021-00042");
        assert_eq!(success.account.display_name, "Ada Lovelace");
        let claims = state.tokens.verify(&success.token.token, state.clock.now()).unwrap();
        assert_eq!(claims.sub, "2021-00042");
    }

    #[tokio::test]
    async fn unknown_identifier_and_wrong_password_fail_the_same_way() {
        let (state, _, _) = state_with(CaptchaVerdict::Passed);
        let unknown = login(&state, attempt("2099-99999", PASSWORD)).await.unwrap_err();
        let wrong = login(&state, attempt("2021-00042", "not-it-at-all")).await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(
            state.rate_limiter.record("198.51.100.7").map(|r| r.attempt_count),
            Some(2)
        );
    }

    #[tokio::test]
    async fn sixth_attempt_is_rate_limited_even_with_right_password() {
        let (state, clock, _) = state_with(CaptchaVerdict::Passed);
        for _ in 0..5 {
            let err = login(&state, attempt("2021-00042", "wrong-password")).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        let err = login(&state, attempt("2021-00042", PASSWORD)).await.unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));

        clock.advance(TimeDelta::minutes(29));
        let err = login(&state, attempt("2021-00042", PASSWORD)).await.unwrap_err();
        assert!(matches!(err, AuthError::RateLimited));

        clock.advance(TimeDelta::minutes(1));
        assert!(login(&state, attempt("2021-00042", PASSWORD)).await.is_ok());
    }

    #[tokio::test]
    async fn lockout_check_tracks_the_window() {
        let (state, clock, _) = state_with(CaptchaVerdict::Passed);
        assert!(check_lockout(&state, "198.51.100.7").is_ok());
        for _ in 0..5 {
            let _ = login(&state, attempt("2021-00042", "wrong-password")).await;
        }
        assert!(matches!(
            check_lockout(&state, "198.51.100.7"),
            Err(AuthError::RateLimited)
        ));
        assert!(check_lockout(&state, "203.0.113.9").is_ok());
        clock.advance(TimeDelta::minutes(30));
        assert!(check_lockout(&state, "198.51.100.7").is_ok());
    }

    #[tokio::test]
    async fn success_clears_failure_count() {
        let (state, _, _) = state_with(CaptchaVerdict::Passed);
        for _ in 0..3 {
            let _ = login(&state, attempt("2021-00042", "wrong-password")).await;
        }
        login(&state, attempt("2021-00042", PASSWORD)).await.unwrap();
        assert!(state.rate_limiter.record("198.51.100.7").is_none());
        let _ = login(&state, attempt("2021-00042", "wrong-password")).await;
        assert_eq!(
            state.rate_limiter.record("198.51.100.7").map(|r| r.attempt_count),
            Some(1)
        );
    }

    #[tokio::test]
    async fn shape_errors_are_not_counted() {
        let (state, _, _) = state_with(CaptchaVerdict::Passed);
        let missing = LoginAttempt {
            identifier: Some("2021-00042".into()),
            client: "198.51.100.7".into(),
            ..LoginAttempt::default()
        };
        assert!(matches!(
            login(&state, missing).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            login(&state, attempt("   ", PASSWORD)).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            login(&state, attempt("ab", PASSWORD)).await,
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            login(&state, attempt("2021-00042", "123")).await,
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(state.rate_limiter.record("198.51.100.7").is_none());
    }

    #[tokio::test]
    async fn rejected_captcha_fails_before_credentials() {
        let (state, _, captcha) = state_with(CaptchaVerdict::Rejected);
        let mut submission = attempt("2021-00042", PASSWORD);
        submission.captcha_token = Some("bad-token".into());
        assert!(matches!(
            login(&state, submission).await,
            Err(AuthError::CaptchaFailed)
        ));
        assert_eq!(captcha.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_captcha_does_not_block_login() {
        let (state, _, _) = state_with(CaptchaVerdict::Unavailable);
        let mut submission = attempt("2021-00042", PASSWORD);
        submission.captcha_token = Some("tok".into());
        assert!(login(&state, submission).await.is_ok());
    }

    #[tokio::test]
    async fn captcha_is_skipped_without_token() {
        let (state, _, captcha) = state_with(CaptchaVerdict::Rejected);
        assert!(login(&state, attempt("2021-00042", PASSWORD)).await.is_ok());
        assert_eq!(captcha.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn current_session_reports_each_failure_mode() {
        let (state, clock, _) = state_with(CaptchaVerdict::Passed);
        assert!(matches!(
            current_session(&state, None),
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            current_session(&state, Some("garbage")),
            Err(AuthError::InvalidToken)
        ));

        let success = login(&state, attempt("2021-00042", PASSWORD)).await.unwrap();
        let session = current_session(&state, Some(&success.token.token)).unwrap();
        assert_eq!(session.account.identifier, "2021-00042");

        clock.advance(TimeDelta::minutes(30));
        assert!(matches!(
            current_session(&state, Some(&success.token.token)),
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn session_for_removed_account_is_unauthenticated() {
        let (state, _, _) = state_with(CaptchaVerdict::Passed);
        let ghost = AdminAccount::new("2019-00001", "Former Admin", HASH.as_str());
        let issued = state.tokens.issue(&ghost, state.clock.now()).unwrap();
        assert!(matches!(
            current_session(&state, Some(&issued.token)),
            Err(AuthError::Unauthenticated)
        ));
    }
}
