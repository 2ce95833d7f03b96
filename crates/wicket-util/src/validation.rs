use thiserror::Error;

pub const IDENTIFIER_MIN_LEN: usize = 3;
pub const IDENTIFIER_MAX_LEN: usize = 64;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value is missing")]
    Missing,
    #[error("value is too short (min {min}, got {got})")]
    TooShort { min: usize, got: usize },
    #[error("value is too long (max {max}, got {got})")]
    TooLong { max: usize, got: usize },
    #[error("invalid characters")]
    InvalidCharacters,
}

impl ValidationError {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Account identifiers are institutional IDs or short handles:
/// letters, digits and `-_.@`.
pub fn validate_identifier(identifier: &str) -> Result<(), ValidationError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing);
    }
    let len = trimmed.chars().count();
    if len < IDENTIFIER_MIN_LEN {
        return Err(ValidationError::TooShort {
            min: IDENTIFIER_MIN_LEN,
            got: len,
        });
    }
    if len > IDENTIFIER_MAX_LEN {
        return Err(ValidationError::TooLong {
            max: IDENTIFIER_MAX_LEN,
            got: len,
        });
    }
    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
    {
        return Err(ValidationError::InvalidCharacters);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Missing);
    }
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(ValidationError::TooShort {
            min: PASSWORD_MIN_LEN,
            got: len,
        });
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ValidationError::TooLong {
            max: PASSWORD_MAX_LEN,
            got: len,
        });
    }
    Ok(())
}
