use crate::config::{AdminEntry, Config};
use anyhow::{Context, Result};
use wicket_core::CredentialStore;
use wicket_db::DbPool;
use wicket_models::AdminAccount;

/// Builds the credential store from `[[admins]]` and, when a database is
/// configured, the `admins` table. Database rows override config entries.
pub async fn load_credentials(config: &Config) -> Result<CredentialStore> {
    let pool = match config.database.url.as_deref() {
        Some(url) => Some(
            wicket_db::create_pool(url, config.database.max_connections)
                .await
                .context("failed to connect to the admins database")?,
        ),
        None => None,
    };
    let store = build_credentials(&config.admins, pool.as_ref()).await;
    if let Some(pool) = pool {
        pool.close().await;
    }
    store
}

pub async fn build_credentials(
    entries: &[AdminEntry],
    pool: Option<&DbPool>,
) -> Result<CredentialStore> {
    let mut builder = CredentialStore::builder();
    for entry in entries {
        builder.insert(AdminAccount::from(entry), "config");
    }

    if let Some(pool) = pool {
        let rows = wicket_db::admins::list_admins(pool)
            .await
            .context("failed to read the admins table")?;
        tracing::info!(count = rows.len(), "loaded admin accounts from database");
        for row in rows {
            builder.insert(
                AdminAccount::new(row.identifier, row.display_name, row.password_hash),
                "database",
            );
        }
    }

    let store = builder.build();
    tracing::info!(accounts = store.len(), "credential store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identifier: &str, display_name: &str) -> AdminEntry {
        AdminEntry {
            identifier: identifier.into(),
            display_name: display_name.into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
        }
    }

    #[tokio::test]
    async fn config_entries_only() {
        let store = build_credentials(&[entry("2021-00042", "Ada")], None)
            .await
            .expect("store");
        assert_eq!(store.len(), 1);
        assert!(store.find_by_identifier("2021-00042").is_some());
    }

    #[tokio::test]
    async fn database_rows_override_config_entries() {
        let pool = wicket_db::create_pool("sqlite::memory:", 1)
            .await
            .expect("pool");
        sqlx::query(
            "CREATE TABLE admins (identifier TEXT PRIMARY KEY, display_name TEXT NOT NULL, password_hash TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .expect("create table");
        sqlx::query(
            "INSERT INTO admins (identifier, display_name, password_hash) VALUES ('2021-00042', 'Ada (db)', '$argon2id$db'), ('2022-00100', 'Grace', '$argon2id$db2')",
        )
        .execute(&pool)
        .await
        .expect("seed");

        let store = build_credentials(&[entry("2021-00042", "Ada (config)")], Some(&pool))
            .await
            .expect("store");
        assert_eq!(store.len(), 2);
        assert_eq!(
            store
                .find_by_identifier("2021-00042")
                .map(|a| a.display_name.as_str()),
            Some("Ada (db)")
        );
        assert!(store.find_by_identifier("2022-00100").is_some());
    }

    #[tokio::test]
    async fn missing_admins_table_is_an_error() {
        let pool = wicket_db::create_pool("sqlite::memory:", 1)
            .await
            .expect("pool");
        assert!(build_credentials(&[], Some(&pool)).await.is_err());
    }
}
