//! Mirror-copy of source trees into the stack directory
//!
//! Behaves like `rsync -a --exclude=...` without `--delete`: files are
//! copied when missing or when size or modification time differ, symlinks
//! are recreated, and nothing is ever removed from the destination.

use super::files;
use crate::ProvisionError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Counters reported after a sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub files_copied: usize,
    pub files_unchanged: usize,
    pub links_created: usize,
    pub dirs_created: usize,
}

/// Check whether a path relative to the tree root is excluded
///
/// A pattern matches when it equals the trailing components of `rel`, so
/// `.tox` matches at any depth and `contrib/vagrant` matches that pair.
pub fn is_excluded(rel: &Path, excludes: &[&str]) -> bool {
    excludes.iter().any(|pattern| rel.ends_with(pattern))
}

/// Mirror `src` into `dst`, skipping excluded paths
pub async fn sync_tree(src: &Path, dst: &Path, excludes: &[&str]) -> Result<SyncStats, ProvisionError> {
    if !fs::metadata(src).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(ProvisionError::step(
            "sync",
            format!("source tree {} does not exist", src.display()),
        ));
    }

    info!("Syncing {} -> {}", src.display(), dst.display());

    let mut stats = SyncStats::default();
    let mut pending: Vec<PathBuf> = vec![PathBuf::new()];

    while let Some(rel) = pending.pop() {
        let src_dir = src.join(&rel);
        let dst_dir = dst.join(&rel);

        if !fs::try_exists(&dst_dir).await? {
            fs::create_dir_all(&dst_dir).await?;
            stats.dirs_created += 1;
        }

        let mut entries = fs::read_dir(&src_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let rel_path = rel.join(entry.file_name());
            if is_excluded(&rel_path, excludes) {
                debug!("Excluded: {}", rel_path.display());
                continue;
            }

            let file_type = entry.file_type().await?;
            let target = dst.join(&rel_path);

            if file_type.is_symlink() {
                if sync_symlink(&entry.path(), &target).await? {
                    stats.links_created += 1;
                }
            } else if file_type.is_dir() {
                pending.push(rel_path);
            } else if sync_file(&entry.path(), &target).await? {
                stats.files_copied += 1;
            } else {
                stats.files_unchanged += 1;
            }
        }
    }

    info!(
        "Synced {}: {} copied, {} unchanged, {} links",
        src.display(),
        stats.files_copied,
        stats.files_unchanged,
        stats.links_created
    );
    Ok(stats)
}

/// Copy a regular file when it differs; returns whether it was copied
async fn sync_file(src: &Path, dst: &Path) -> Result<bool, ProvisionError> {
    let src_meta = fs::metadata(src).await?;

    if let Ok(dst_meta) = fs::symlink_metadata(dst).await {
        if dst_meta.is_file()
            && dst_meta.len() == src_meta.len()
            && dst_meta.modified().ok() == src_meta.modified().ok()
        {
            return Ok(false);
        }
        if dst_meta.is_dir() {
            warn!("Not replacing directory {} with a file", dst.display());
            return Ok(false);
        }
        if dst_meta.file_type().is_symlink() {
            fs::remove_file(dst).await?;
        }
    }

    // Copy beside the destination and rename, so read-only targets are
    // replaced rather than opened for writing
    debug!("Copying {}", src.display());
    let tmp = files::sibling_tmp(dst)?;
    if fs::symlink_metadata(&tmp).await.is_ok() {
        fs::remove_file(&tmp).await?;
    }
    fs::copy(src, &tmp).await?;

    if let Ok(modified) = src_meta.modified() {
        let file = fs::File::open(&tmp).await?;
        file.into_std().await.set_modified(modified)?;
    }
    fs::rename(&tmp, dst).await?;

    Ok(true)
}

/// Recreate a symlink when it is missing or points elsewhere
async fn sync_symlink(src: &Path, dst: &Path) -> Result<bool, ProvisionError> {
    let link_target = fs::read_link(src).await?;

    if let Ok(dst_meta) = fs::symlink_metadata(dst).await {
        if dst_meta.file_type().is_symlink() {
            if fs::read_link(dst).await? == link_target {
                return Ok(false);
            }
            fs::remove_file(dst).await?;
        } else if dst_meta.is_dir() {
            warn!("Not replacing directory {} with a symlink", dst.display());
            return Ok(false);
        } else {
            fs::remove_file(dst).await?;
        }
    }

    #[cfg(unix)]
    {
        fs::symlink(&link_target, dst).await?;
    }

    #[cfg(not(unix))]
    {
        // Without symlink support, fall back to copying what the link points at
        fs::copy(src, dst).await?;
    }

    Ok(true)
}
