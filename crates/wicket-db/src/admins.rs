use crate::{DbError, DbPool};

/// One row of the `admins` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminRow {
    pub identifier: String,
    pub display_name: String,
    pub password_hash: String,
}

pub async fn list_admins(pool: &DbPool) -> Result<Vec<AdminRow>, DbError> {
    let rows = sqlx::query_as::<_, AdminRow>(
        "SELECT identifier, display_name, password_hash FROM admins ORDER BY identifier",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
