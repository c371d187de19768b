//! In-memory doubles for every storage seam, plus a ready-made [`AppState`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::attachments::{AttachmentPolicy, AttachmentService, ObjectStore};
use crate::auth::credentials::{CredentialRecord, CredentialStore};
use crate::auth::flags::FlagStore;
use crate::auth::session::{SessionManager, SessionSettings};
use crate::crypto::{digest, CryptoHelper};
use crate::jobs::MaintenanceRepository;
use crate::profile::models::ProfileDocument;
use crate::profile::repository::ProfileRepository;
use crate::profile::ProfileStore;
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-encryption-secret";

#[derive(Default)]
pub struct MemoryProfileRepository {
    stored: Mutex<Option<ProfileDocument>>,
    writes: Mutex<Vec<ProfileDocument>>,
    failing: AtomicBool,
    write_delay: Duration,
}

impl MemoryProfileRepository {
    pub fn with_write_delay(write_delay: Duration) -> Self {
        Self {
            write_delay,
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful writes, oldest first.
    pub fn writes(&self) -> Vec<ProfileDocument> {
        self.writes.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Option<ProfileDocument> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn fetch(&self) -> Result<Option<ProfileDocument>> {
        Ok(self.stored())
    }

    async fn write(&self, doc: &ProfileDocument) -> Result<()> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("profile storage unavailable"));
        }
        self.writes.lock().unwrap().push(doc.clone());
        *self.stored.lock().unwrap() = Some(doc.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObjectStore {
    /// `(key, content_type, size)` of every stored object.
    puts: Mutex<Vec<(String, String, usize)>>,
    fail: bool,
}

impl RecordingObjectStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn puts(&self) -> Vec<(String, String, usize)> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<String> {
        if self.fail {
            return Err(anyhow!("connection reset by peer"));
        }
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), body.len()));
        Ok(format!("https://cdn.test/bucket/{key}"))
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    records: Mutex<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn insert(&self, record: CredentialRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.username.clone(), record);
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    fn accepts(&self, username: &str) -> bool {
        self.records.lock().unwrap().contains_key(username)
    }

    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>> {
        Ok(self.records.lock().unwrap().get(username).cloned())
    }
}

/// Builds a record the way the provisioning script does.
pub fn provision(
    crypto: &CryptoHelper,
    username: &str,
    password: &str,
    display_name: &str,
) -> CredentialRecord {
    CredentialRecord {
        username: username.to_string(),
        password_digest_encrypted: crypto.encrypt(&digest(password)).unwrap(),
        display_name_encrypted: crypto.encrypt(display_name).unwrap(),
    }
}

#[derive(Default)]
pub struct MemoryFlagStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryFlagStore {
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<()> {
        self.insert_raw(key, value);
        Ok(())
    }

    async fn clear(&self, keys: &[String]) -> Result<()> {
        let mut values = self.values.lock().unwrap();
        for key in keys {
            values.remove(key);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryMaintenanceRepository {
    snapshots: Mutex<Vec<(Uuid, ProfileDocument)>>,
    keep_alives: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryMaintenanceRepository {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn keep_alive_count(&self) -> usize {
        self.keep_alives.load(Ordering::SeqCst)
    }

    /// Oldest first.
    pub fn snapshots(&self) -> Vec<(Uuid, ProfileDocument)> {
        self.snapshots.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaintenanceRepository for MemoryMaintenanceRepository {
    async fn touch_keep_alive(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("database paused"));
        }
        self.keep_alives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_snapshot(&self, doc: &ProfileDocument) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.snapshots.lock().unwrap().push((id, doc.clone()));
        Ok(id)
    }

    async fn prune_snapshots(&self, keep: i64) -> Result<u64> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let excess = snapshots.len().saturating_sub(keep.max(0) as usize);
        snapshots.drain(..excess);
        Ok(excess as u64)
    }
}

/// An [`AppState`] wired to in-memory doubles, with handles to inspect them.
pub struct TestApp {
    pub state: AppState,
    pub profiles: Arc<MemoryProfileRepository>,
    pub flags: Arc<MemoryFlagStore>,
    pub objects: Arc<RecordingObjectStore>,
}

/// Must run inside a tokio runtime: the profile store spawns its saver.
pub fn test_app() -> TestApp {
    let crypto = Arc::new(CryptoHelper::new(TEST_SECRET));
    let credentials = MemoryCredentialStore::default();
    credentials.insert(provision(&crypto, "owner", "correct horse", "Ada Lovelace"));

    let profiles = Arc::new(MemoryProfileRepository::default());
    let flags = Arc::new(MemoryFlagStore::default());
    let objects = Arc::new(RecordingObjectStore::default());

    let sessions = SessionManager::new(
        Arc::new(credentials),
        flags.clone(),
        crypto,
        SessionSettings {
            ttl: Duration::from_secs(3600),
            demo_login_enabled: true,
            max_attempts: 5,
            lockout: Duration::from_secs(300),
        },
    );

    let state = AppState {
        sessions: Arc::new(sessions),
        profile: ProfileStore::spawn(profiles.clone(), Duration::from_secs(2)),
        attachments: AttachmentService::new(
            objects.clone(),
            AttachmentPolicy { max_bytes: 1024 * 1024 },
        ),
        public_repo: profiles.clone(),
    };

    TestApp {
        state,
        profiles,
        flags,
        objects,
    }
}
