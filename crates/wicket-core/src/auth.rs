use crate::error::AuthError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm as HashAlgorithm, Argon2, Params, Version,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use wicket_models::{AdminAccount, PublicAccount, Role, SessionAccount};

pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 30 * 60;

const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(e.to_string()))
}

fn hasher_matching(hash: &PasswordHash<'_>) -> Option<Argon2<'static>> {
    let algorithm = HashAlgorithm::try_from(hash.algorithm).ok()?;
    let version = match hash.version {
        Some(raw) => Version::try_from(raw).ok()?,
        None => Version::default(),
    };
    let params = Params::try_from(hash).ok()?;
    Some(Argon2::new(algorithm, version, params))
}

/// Hashes `password` with the algorithm, version and cost parameters of
/// `reference`, so verifying against the result costs the same as
/// verifying against the reference. Falls back to the defaults when the
/// reference is not a usable argon2 hash.
pub fn hash_password_like(password: &str, reference: &str) -> Result<String, AuthError> {
    let argon2 = PasswordHash::new(reference)
        .ok()
        .and_then(|parsed| hasher_matching(&parsed));
    let Some(argon2) = argon2 else {
        tracing::warn!("reference password hash is not usable argon2; using default parameters");
        return hash_password(password);
    };
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Internal(e.to_string()))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
}

impl SessionClaims {
    pub fn account(&self) -> SessionAccount {
        SessionAccount {
            account: PublicAccount {
                identifier: self.sub.clone(),
                display_name: self.name.clone(),
            },
            role: self.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

/// Signs and checks session tokens with a single HS256 key.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: u64) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::Configuration(
                "token signing secret is missing".into(),
            ));
        }
        if ttl_seconds == 0 {
            return Err(AuthError::Configuration(
                "token lifetime must be greater than zero".into(),
            ));
        }

        // Time claims are checked against the injected clock in `verify`.
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds,
        })
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn issue(
        &self,
        account: &AdminAccount,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let issued_at = now.timestamp();
        let claims = SessionClaims {
            sub: account.identifier.clone(),
            name: account.display_name.clone(),
            role: account.role,
            iat: issued_at,
            nbf: issued_at,
            exp: issued_at.saturating_add(self.ttl_seconds.min(i64::MAX as u64) as i64),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(IssuedToken { token, claims })
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let claims = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                AuthError::InvalidToken
            })?;

        let now = now.timestamp();
        if claims.exp <= now {
            return Err(AuthError::TokenExpired);
        }
        if claims.nbf > now {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}
