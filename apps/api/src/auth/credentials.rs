use anyhow::Result;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

/// A provisioned login. Both secrets are stored encrypted.
#[derive(Debug, Clone, FromRow)]
pub struct CredentialRecord {
    pub username: String,
    pub password_digest_encrypted: String,
    pub display_name_encrypted: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether `username` (already trimmed and lowercased) may hold credentials.
    fn accepts(&self, username: &str) -> bool;

    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>>;
}

/// Reads credentials from Postgres, restricted to an allow-list of usernames.
pub struct PgCredentialStore {
    pool: PgPool,
    allowlist: Vec<String>,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, allowlist: Vec<String>) -> Self {
        Self { pool, allowlist }
    }

}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    fn accepts(&self, username: &str) -> bool {
        self.allowlist.iter().any(|allowed| allowed == username)
    }

    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let username = username.trim().to_lowercase();
        if !self.accepts(&username) {
            debug!("Credential lookup skipped for a username outside the allow-list");
            return Ok(None);
        }

        let record = sqlx::query_as::<_, CredentialRecord>(
            r#"
            SELECT username, password_digest_encrypted, display_name_encrypted
            FROM credentials
            WHERE username = $1 AND username = ANY($2)
            "#,
        )
        .bind(&username)
        .bind(&self.allowlist)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
