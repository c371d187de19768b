use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;

use crate::profile::models::{ProfileDocument, PROFILE_DOCUMENT_KEY};

/// Remote storage of the singleton profile document.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn fetch(&self) -> Result<Option<ProfileDocument>>;
    async fn write(&self, doc: &ProfileDocument) -> Result<()>;
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn fetch(&self) -> Result<Option<ProfileDocument>> {
        let row: Option<Json<ProfileDocument>> =
            sqlx::query_scalar("SELECT data FROM profile_documents WHERE key = $1")
                .bind(PROFILE_DOCUMENT_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    /// Whole-document upsert; the last write wins.
    async fn write(&self, doc: &ProfileDocument) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profile_documents (key, data, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE
                SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(PROFILE_DOCUMENT_KEY)
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;

        debug!("Wrote profile document '{PROFILE_DOCUMENT_KEY}'");
        Ok(())
    }
}
