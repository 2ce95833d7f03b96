use std::collections::HashMap;
use wicket_models::AdminAccount;

/// Read-only identifier → account map, built once at startup.
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    accounts: HashMap<String, AdminAccount>,
}

impl CredentialStore {
    pub fn builder() -> CredentialStoreBuilder {
        CredentialStoreBuilder::default()
    }

    pub fn find_by_identifier(&self, identifier: &str) -> Option<&AdminAccount> {
        self.accounts.get(identifier.trim())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Password hash of the lowest identifier, used to size the decoy hash.
    pub fn reference_hash(&self) -> Option<&str> {
        self.accounts
            .values()
            .min_by(|a, b| a.identifier.cmp(&b.identifier))
            .map(|account| account.password_hash.as_str())
    }
}

impl FromIterator<AdminAccount> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = AdminAccount>>(iter: I) -> Self {
        let mut builder = Self::builder();
        for account in iter {
            builder.insert(account, "inline");
        }
        builder.build()
    }
}

/// Collects accounts from several sources. Later sources override earlier
/// ones for the same identifier.
#[derive(Debug, Default)]
pub struct CredentialStoreBuilder {
    accounts: HashMap<String, AdminAccount>,
}

impl CredentialStoreBuilder {
    pub fn insert(&mut self, mut account: AdminAccount, source: &str) -> &mut Self {
        account.identifier = account.identifier.trim().to_string();
        if account.identifier.is_empty() {
            tracing::warn!(source, "skipping admin account with an empty identifier");
            return self;
        }
        if account.password_hash.trim().is_empty() {
            tracing::warn!(
                source,
                identifier = %account.identifier,
                "skipping admin account without a password hash"
            );
            return self;
        }
        if account.display_name.trim().is_empty() {
            account.display_name = account.identifier.clone();
        }
        if let Some(previous) = self.accounts.insert(account.identifier.clone(), account) {
            tracing::warn!(
                source,
                identifier = %previous.identifier,
                "duplicate admin identifier; later entry wins"
            );
        }
        self
    }

    pub fn build(self) -> CredentialStore {
        if self.accounts.is_empty() {
            tracing::warn!("credential store is empty; nobody will be able to sign in");
        }
        CredentialStore {
            accounts: self.accounts,
        }
    }
}
