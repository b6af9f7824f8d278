//! Persistence layer for quire-vector.
//!
//! A snapshot is a directory holding two files:
//! - `manifest.json` - dimensions, metric, record count, checksum
//! - `records.bin` - postcard-encoded records in insertion order
//!
//! Saves go to a staging directory next to the target and are renamed into
//! place once complete, so readers never see a half-written snapshot.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::types::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const RECORDS_FILE: &str = "records.bin";

/// Snapshot metadata stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// On-disk format version.
    pub format_version: u32,
    /// Vector dimensionality of every record.
    pub dimensions: usize,
    /// Metric the index was built for.
    pub metric: DistanceMetric,
    /// Number of records in `records.bin`.
    pub count: usize,
    /// Identifier of the embedding model that produced the vectors.
    pub embedder: String,
    /// When the snapshot was written.
    pub created_at: DateTime<Utc>,
    /// SHA-256 of `records.bin`, hex encoded.
    pub checksum: String,
}

/// A loaded snapshot: the index plus the manifest it was described by.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The restored index.
    pub index: VectorIndex,
    /// The manifest read from disk.
    pub manifest: Manifest,
}

/// Save an index to `path`, replacing any snapshot already there.
///
/// `embedder` is recorded in the manifest so a later load can tell which
/// model produced the vectors.
#[instrument(skip(index), fields(count = index.len(), dimensions = index.dimensions()))]
pub async fn save(index: &VectorIndex, path: &Path, embedder: &str) -> Result<Manifest> {
    let (parent, name) = split_target(path)?;
    tokio::fs::create_dir_all(&parent).await?;

    let records = postcard::to_allocvec(index.records())
        .map_err(|e| Error::Persistence(format!("Failed to encode records: {}", e)))?;

    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        dimensions: index.dimensions(),
        metric: index.metric(),
        count: index.len(),
        embedder: embedder.to_string(),
        created_at: Utc::now(),
        checksum: checksum(&records),
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| Error::Persistence(format!("Failed to serialize manifest: {}", e)))?;

    let staging = parent.join(format!(".{}.staging-{}", name, uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&staging).await?;

    let written = async {
        tokio::fs::write(staging.join(RECORDS_FILE), &records).await?;
        tokio::fs::write(staging.join(MANIFEST_FILE), manifest_json).await?;
        Ok::<_, Error>(())
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_dir_all(&staging).await;
        return Err(e);
    }

    if let Err(e) = swap_into_place(&staging, path, &parent, &name).await {
        let _ = tokio::fs::remove_dir_all(&staging).await;
        return Err(e);
    }

    info!(path = %path.display(), bytes = records.len(), "Saved index snapshot");
    Ok(manifest)
}

/// Load a snapshot from `path`, validating it against its manifest.
#[instrument]
pub async fn load(path: &Path) -> Result<Snapshot> {
    if !tokio::fs::try_exists(path).await? {
        return Err(Error::NotFound(path.display().to_string()));
    }

    let manifest_path = path.join(MANIFEST_FILE);
    let records_path = path.join(RECORDS_FILE);
    for file in [&manifest_path, &records_path] {
        if !tokio::fs::try_exists(file).await? {
            return Err(Error::NotFound(file.display().to_string()));
        }
    }

    let manifest_bytes = read_existing(&manifest_path).await?;
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| Error::Corrupted(format!("Failed to parse manifest: {}", e)))?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "Unsupported format version {} (expected {})",
            manifest.format_version, FORMAT_VERSION
        )));
    }

    let bytes = read_existing(&records_path).await?;
    let actual = checksum(&bytes);
    if actual != manifest.checksum {
        return Err(Error::Corrupted(format!(
            "Checksum mismatch: manifest {}, file {}",
            manifest.checksum, actual
        )));
    }

    let records: Vec<Record> = postcard::from_bytes(&bytes)
        .map_err(|e| Error::Corrupted(format!("Failed to decode records: {}", e)))?;

    if records.len() != manifest.count {
        return Err(Error::Corrupted(format!(
            "Manifest lists {} records, file holds {}",
            manifest.count,
            records.len()
        )));
    }

    let index = VectorIndex::from_records(manifest.dimensions, manifest.metric, records)
        .map_err(|e| Error::Corrupted(format!("Invalid record in snapshot: {}", e)))?;

    info!(
        path = %path.display(),
        count = manifest.count,
        dimensions = manifest.dimensions,
        "Loaded index snapshot"
    );
    Ok(Snapshot { index, manifest })
}

/// Read a snapshot file already known to exist. A file that is present but
/// unreadable (a directory, bad permissions) counts as a corrupted snapshot.
async fn read_existing(file: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(file)
        .await
        .map_err(|e| Error::Corrupted(format!("Cannot read {}: {}", file.display(), e)))
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn split_target(path: &Path) -> Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::Persistence(format!("Invalid snapshot path: {}", path.display())))?
        .to_string();

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((parent, name))
}

/// Move `staging` to `target`. An existing target is moved aside first and
/// restored if the final rename fails.
async fn swap_into_place(staging: &Path, target: &Path, parent: &Path, name: &str) -> Result<()> {
    if !tokio::fs::try_exists(target).await? {
        tokio::fs::rename(staging, target).await?;
        return Ok(());
    }

    let backup = parent.join(format!(".{}.old-{}", name, uuid::Uuid::new_v4()));
    tokio::fs::rename(target, &backup).await?;

    if let Err(e) = tokio::fs::rename(staging, target).await {
        warn!(error = %e, "Failed to move new snapshot into place, restoring previous one");
        tokio::fs::rename(&backup, target).await?;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::remove_dir_all(&backup).await {
        warn!(path = %backup.display(), error = %e, "Failed to remove previous snapshot");
    }
    debug!(path = %target.display(), "Replaced previous snapshot");
    Ok(())
}
