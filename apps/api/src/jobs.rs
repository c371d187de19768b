//! Background maintenance: a keep-alive heartbeat so the hosted database is
//! never idle long enough to be paused, and periodic snapshots of the
//! persisted profile with a small retention window.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::profile::models::ProfileDocument;
use crate::profile::repository::ProfileRepository;

/// Snapshots kept after each backup run.
pub const SNAPSHOTS_KEPT: i64 = 2;

#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    async fn touch_keep_alive(&self) -> Result<()>;
    async fn append_snapshot(&self, doc: &ProfileDocument) -> Result<Uuid>;
    /// Deletes all but the `keep` newest snapshots; returns how many were removed.
    async fn prune_snapshots(&self, keep: i64) -> Result<u64>;
}

pub struct PgMaintenanceRepository {
    pool: PgPool,
}

impl PgMaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MaintenanceRepository for PgMaintenanceRepository {
    async fn touch_keep_alive(&self) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO keep_alive (id, touched_at) VALUES (1, now())
            ON CONFLICT (id) DO UPDATE SET touched_at = EXCLUDED.touched_at
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_snapshot(&self, doc: &ProfileDocument) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO profile_history (id, document, created_at) VALUES ($1, $2, now())")
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn prune_snapshots(&self, keep: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM profile_history
            WHERE id NOT IN (
                SELECT id FROM profile_history
                ORDER BY created_at DESC, id DESC
                LIMIT $1
            )
            "#,
        )
        .bind(keep)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
    Skipped,
    Stored { snapshot: Uuid, pruned: u64 },
}

/// Snapshots the persisted document (never the editor's unsaved copy), then
/// prunes old snapshots.
pub async fn backup_once(
    profiles: &dyn ProfileRepository,
    maintenance: &dyn MaintenanceRepository,
) -> Result<BackupOutcome> {
    let Some(doc) = profiles.fetch().await? else {
        return Ok(BackupOutcome::Skipped);
    };
    let snapshot = maintenance.append_snapshot(&doc).await?;
    let pruned = maintenance.prune_snapshots(SNAPSHOTS_KEPT).await?;
    Ok(BackupOutcome::Stored { snapshot, pruned })
}

pub async fn run_keep_alive(maintenance: Arc<dyn MaintenanceRepository>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match maintenance.touch_keep_alive().await {
            Ok(()) => info!("Keep-alive heartbeat recorded"),
            Err(e) => error!("Keep-alive heartbeat failed: {e:?}"),
        }
    }
}

pub async fn run_backup(
    profiles: Arc<dyn ProfileRepository>,
    maintenance: Arc<dyn MaintenanceRepository>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match backup_once(profiles.as_ref(), maintenance.as_ref()).await {
            Ok(BackupOutcome::Stored { snapshot, pruned }) => {
                info!("Stored profile snapshot {snapshot}, pruned {pruned} old snapshot(s)")
            }
            Ok(BackupOutcome::Skipped) => warn!("No persisted profile yet; backup skipped"),
            Err(e) => error!("Profile backup failed: {e:?}"),
        }
    }
}
