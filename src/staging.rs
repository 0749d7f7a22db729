// Copyright (c) 2025 - Cowboy AI, Inc.

//! Content Stager - replace a site directory with a bundle's contents
//!
//! A bundle is gzip(zip(files)). Staging runs in three phases:
//!
//! 1. Decode: gunzip the payload (concatenated gzip members are joined) and
//!    open the zip central directory. Nothing touches the filesystem until
//!    the bundle decodes.
//! 2. Extract into a sibling directory `.<dir>.staging-<uuid>` under the
//!    websites root. Entries escaping the directory are rejected by the
//!    archive reader.
//! 3. Swap: move the live directory aside, rename the staged tree into place,
//!    then delete the old tree.
//!
//! A failed extraction leaves the live site untouched. Stages of the same
//! directory are serialized; different directories stage in parallel.

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zip::ZipArchive;

use crate::errors::{StagingError, StagingResult};

/// Result of a successful stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSite {
    pub path: PathBuf,
    pub entries: usize,
    pub replaced_previous: bool,
}

/// Writes bundles under the websites root
#[derive(Debug)]
pub struct ContentStager {
    websites_root: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContentStager {
    pub fn new(websites_root: impl Into<PathBuf>) -> Self {
        Self {
            websites_root: websites_root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Directory a site named `dir_name` is served from
    pub fn site_dir(&self, dir_name: &str) -> PathBuf {
        self.websites_root.join(dir_name)
    }

    /// Replace `<websites_root>/<dir_name>` with the bundle's contents
    pub async fn stage(&self, payload: Bytes, dir_name: &str) -> StagingResult<StagedSite> {
        let lock = self.lock_for(dir_name);
        let _guard = lock.lock().await;

        info!("Staging {} ({} bytes)", dir_name, payload.len());
        let root = self.websites_root.clone();
        let dir_name = dir_name.to_string();

        let staged = tokio::task::spawn_blocking(move || stage_blocking(&root, &payload, &dir_name))
            .await
            .map_err(|e| StagingError::Task(e.to_string()))??;

        info!(
            "Staged {} entries into {}",
            staged.entries,
            staged.path.display()
        );
        Ok(staged)
    }

    fn lock_for(&self, dir_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map holds an idle lock
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(dir_name.to_string()).or_default().clone()
    }
}

fn stage_blocking(root: &Path, payload: &[u8], dir_name: &str) -> StagingResult<StagedSite> {
    let mut archive = decode_bundle(payload)?;
    let entries = archive.len();

    fs::create_dir_all(root).map_err(|e| StagingError::fs(root, e))?;

    let staging = root.join(format!(".{}.staging-{}", dir_name, Uuid::now_v7()));
    fs::create_dir(&staging).map_err(|e| StagingError::fs(&staging, e))?;

    if let Err(e) = archive.extract(&staging) {
        discard(&staging);
        return Err(e.into());
    }
    debug!("Extracted {} entries into {}", entries, staging.display());

    let target = root.join(dir_name);
    let replaced_previous = swap_into_place(root, &staging, &target, dir_name)?;

    Ok(StagedSite {
        path: target,
        entries,
        replaced_previous,
    })
}

fn decode_bundle(payload: &[u8]) -> StagingResult<ZipArchive<Cursor<Vec<u8>>>> {
    let mut decompressed = Vec::new();
    MultiGzDecoder::new(payload)
        .read_to_end(&mut decompressed)
        .map_err(StagingError::Decompress)?;

    Ok(ZipArchive::new(Cursor::new(decompressed))?)
}

/// Returns whether a previous tree was replaced
fn swap_into_place(
    root: &Path,
    staging: &Path,
    target: &Path,
    dir_name: &str,
) -> StagingResult<bool> {
    let backup = root.join(format!(".{}.old-{}", dir_name, Uuid::now_v7()));

    let had_previous = match fs::rename(target, &backup) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            discard(staging);
            return Err(StagingError::fs(target, e));
        }
    };

    if let Err(e) = fs::rename(staging, target) {
        if had_previous {
            if let Err(restore) = fs::rename(&backup, target) {
                warn!(
                    "Failed to restore {} from {}: {}",
                    target.display(),
                    backup.display(),
                    restore
                );
            }
        }
        discard(staging);
        return Err(StagingError::fs(target, e));
    }

    if had_previous {
        discard(&backup);
    }
    Ok(had_previous)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}
