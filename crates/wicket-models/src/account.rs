use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried by every admin session. The panel has a single tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential store entry. Immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub identifier: String,
    pub display_name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
}

impl AdminAccount {
    pub fn new(
        identifier: impl Into<String>,
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
            password_hash: password_hash.into(),
            role: Role::Admin,
        }
    }

    pub fn public(&self) -> PublicAccount {
        PublicAccount {
            identifier: self.identifier.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

// The hash never ends up in logs.
impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Account fields that are safe to hand back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub identifier: String,
    pub display_name: String,
}

/// Public account fields plus the role asserted by a verified session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAccount {
    #[serde(flatten)]
    pub account: PublicAccount,
    pub role: Role,
}
