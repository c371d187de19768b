//! File attachments: allow-list and size checks, object storage upload, and
//! pasted-URL acceptance. Only the resulting [`AttachmentRef`] ever lands in the
//! profile document, never raw bytes.

pub mod handlers;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::profile::validation::is_absolute_http_url;

/// Extension → MIME allow-list.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

const URL_FALLBACK_CONTENT_TYPE: &str = "text/uri-list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub url: String,
    pub content_type: String,
    /// Known for uploads, unknown for pasted URLs.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("file type '{0}' is not allowed")]
    DisallowedType(String),

    #[error("declared type '{declared}' does not match a .{extension} file")]
    MimeMismatch { declared: String, extension: String },

    #[error("file is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("file is empty")]
    Empty,

    #[error("'{0}' is not an absolute http(s) URL")]
    InvalidUrl(String),

    #[error("upload failed: {0}")]
    Transport(String),
}

/// Lowercased extension of `name`, if it has one.
fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type for an allow-listed file name.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;
    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttachmentPolicy {
    pub max_bytes: u64,
}

impl AttachmentPolicy {
    /// Validates an upload before any bytes leave the process. Returns the
    /// content type to store the object under.
    pub fn check_upload(
        &self,
        declared_name: &str,
        declared_mime: Option<&str>,
        size: u64,
    ) -> Result<&'static str, AttachmentError> {
        let extension = extension_of(declared_name).unwrap_or_default();
        let content_type = content_type_for(declared_name)
            .ok_or_else(|| AttachmentError::DisallowedType(display_extension(&extension)))?;

        if let Some(declared) = declared_mime.map(normalize_mime) {
            if !declared.is_empty()
                && declared != "application/octet-stream"
                && declared != content_type
            {
                return Err(AttachmentError::MimeMismatch {
                    declared,
                    extension,
                });
            }
        }

        if size == 0 {
            return Err(AttachmentError::Empty);
        }
        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(content_type)
    }
}

fn display_extension(ext: &str) -> String {
    if ext.is_empty() {
        "(none)".to_string()
    } else {
        format!(".{ext}")
    }
}

fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Accepts a pasted link. Purely syntactic: no request is made.
pub fn accept_url(raw: &str) -> Result<AttachmentRef, AttachmentError> {
    let trimmed = raw.trim();
    if !is_absolute_http_url(trimmed) {
        return Err(AttachmentError::InvalidUrl(trimmed.to_string()));
    }
    let path = url::Url::parse(trimmed)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    Ok(AttachmentRef {
        url: trimmed.to_string(),
        content_type: content_type_for(&path)
            .unwrap_or(URL_FALLBACK_CONTENT_TYPE)
            .to_string(),
        size_bytes: None,
    })
}

/// Object storage seam. Returns the public URL of the stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<String>;
}

/// S3 / MinIO backed object store.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded attachment to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}/{}", self.public_base, self.bucket, key))
    }
}

#[derive(Clone)]
pub struct AttachmentService {
    store: Arc<dyn ObjectStore>,
    policy: AttachmentPolicy,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn ObjectStore>, policy: AttachmentPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> AttachmentPolicy {
        self.policy
    }

    pub async fn upload_file(
        &self,
        bytes: Bytes,
        declared_name: &str,
        declared_mime: Option<&str>,
    ) -> Result<AttachmentRef, AttachmentError> {
        let size = bytes.len() as u64;
        let content_type = self.policy.check_upload(declared_name, declared_mime, size)?;

        let key = format!(
            "attachments/{}/{}",
            Uuid::new_v4(),
            sanitize_file_name(declared_name)
        );
        let url = self
            .store
            .put_object(&key, bytes, content_type)
            .await
            .map_err(|e| {
                warn!("Attachment upload for {declared_name} failed: {e}");
                AttachmentError::Transport(e.to_string())
            })?;

        Ok(AttachmentRef {
            url,
            content_type: content_type.to_string(),
            size_bytes: Some(size),
        })
    }

    pub fn accept_url(&self, raw: &str) -> Result<AttachmentRef, AttachmentError> {
        accept_url(raw)
    }
}
