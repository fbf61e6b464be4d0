//! A single servable resource held in memory.

use std::time::SystemTime;

use axum::body::Bytes;

use crate::assets::compress;
use crate::assets::mime;
use crate::assets::store::StoreError;
use crate::config::{Policy, ServerConfig};

/// Per-asset policies resolved at scan/update time.
#[derive(Debug, Clone)]
pub struct AssetPolicy {
    pub gzip: Policy<bool>,
    pub max_age: Policy<u64>,
}

impl AssetPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            gzip: config.gzip.clone(),
            max_age: config.max_age.clone(),
        }
    }
}

/// The bytes actually sent for an asset.
///
/// When the gzip form is kept the raw bytes are dropped.
#[derive(Debug, Clone)]
pub enum Payload {
    Raw(Bytes),
    Gzip(Bytes),
}

impl Payload {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Payload::Raw(bytes) | Payload::Gzip(bytes) => bytes,
        }
    }

    /// `Content-Encoding` value for this payload, if any.
    pub fn encoding(&self) -> Option<&'static str> {
        match self {
            Payload::Raw(_) => None,
            Payload::Gzip(_) => Some("gzip"),
        }
    }
}

/// One file from the served tree.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Canonical request path, always starting with `/`.
    pub path: String,
    pub payload: Payload,
    /// File mtime at read time.
    pub modified: SystemTime,
    /// IMF-fixdate string; conditional requests compare against it verbatim.
    pub last_modified: String,
    pub content_type: Option<&'static str>,
    pub max_age: u64,
}

impl Asset {
    /// Build an asset from file content, compressing it when the policy allows.
    pub async fn prepare(
        path: String,
        content: Vec<u8>,
        modified: SystemTime,
        policy: &AssetPolicy,
    ) -> Result<Self, StoreError> {
        let content_type = mime::from_path(&path);
        let max_age = policy.max_age.evaluate(&path);
        let payload = if policy.gzip.evaluate(&path) {
            compress_payload(&path, content).await?
        } else {
            Payload::Raw(Bytes::from(content))
        };

        Ok(Self {
            path,
            payload,
            modified,
            last_modified: httpdate::fmt_http_date(modified),
            content_type,
            max_age,
        })
    }

    /// Byte length of the payload that will be sent.
    pub fn size(&self) -> usize {
        self.payload.bytes().len()
    }
}

/// Compression runs on the blocking pool so request handling never waits on it.
async fn compress_payload(path: &str, content: Vec<u8>) -> Result<Payload, StoreError> {
    let (content, shrunk) = tokio::task::spawn_blocking(move || {
        let shrunk = compress::shrink(&content);
        (content, shrunk)
    })
    .await
    .map_err(|source| StoreError::Task {
        path: path.to_string(),
        source,
    })?;

    match shrunk {
        Ok(Some(compressed)) => Ok(Payload::Gzip(Bytes::from(compressed))),
        Ok(None) => Ok(Payload::Raw(Bytes::from(content))),
        Err(source) => Err(StoreError::Compress {
            path: path.to_string(),
            source,
        }),
    }
}
