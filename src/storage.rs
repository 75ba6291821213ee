//! Local filesystem blob store for proof images.

use anyhow::Context as _;
use sha2::{Digest as _, Sha256};

use crate::config::BlobConfig;

/// Where a stored blob ended up: the storage key (relative path under the
/// blob root) and the URL it is served from.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
}

/// Write a blob under its SHA-256 hash with two-level directory sharding.
/// Re-uploading identical bytes lands on the same key, so writes are
/// idempotent and duplicates are free.
pub async fn store(config: &BlobConfig, data: &[u8], content_type: &str) -> anyhow::Result<StoredBlob> {
    let hash = format!("{:x}", Sha256::digest(data));
    let key = format!(
        "{}/{}/{}.{}",
        &hash[0..2],
        &hash[2..4],
        hash,
        extension_for(content_type)
    );

    let path = config.path.join(&key);
    let parent = path.parent().context("blob key should have a parent")?;
    tokio::fs::create_dir_all(parent)
        .await
        .context("failed to create blob directory")?;

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        tokio::fs::write(&path, data)
            .await
            .context("failed to write blob")?;
    }

    Ok(StoredBlob {
        url: format!("/blobs/{key}"),
        key,
    })
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
