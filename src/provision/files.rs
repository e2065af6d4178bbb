//! Idempotent file operations used by provisioning
//!
//! Every helper here checks for existing state first, so running it twice
//! leaves the guest exactly as running it once.

use crate::ProvisionError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Write file content, replacing what is there
pub async fn write_file(path: &Path, content: &str) -> Result<(), ProvisionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Temp file path next to `path`, used before renaming into place
pub fn sibling_tmp(path: &Path) -> Result<PathBuf, ProvisionError> {
    let parent = path
        .parent()
        .ok_or_else(|| ProvisionError::step("write", format!("{} has no parent", path.display())))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(path.file_name().unwrap_or_default());
    tmp_name.push(".tmp");
    Ok(parent.join(tmp_name))
}

/// Write content through a temp file and rename
///
/// A run interrupted mid-write leaves either the old or the new content,
/// never a truncated file.
pub async fn write_atomic(path: &Path, content: &str) -> Result<(), ProvisionError> {
    let tmp = sibling_tmp(path)?;
    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write an executable script atomically
pub async fn write_executable(path: &Path, content: &str) -> Result<(), ProvisionError> {
    let tmp = sibling_tmp(path)?;
    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(&tmp, content).await?;
    set_mode(&tmp, 0o755).await?;
    fs::rename(&tmp, path).await?;

    info!("Installed executable {}", path.display());
    Ok(())
}

async fn set_mode(path: &Path, mode: u32) -> Result<(), ProvisionError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }

    #[cfg(not(unix))]
    {
        let _ = (path, mode);
    }

    Ok(())
}

/// Copy `src` to `dst` only if `dst` does not exist; returns whether it copied
pub async fn install_if_absent(src: &Path, dst: &Path) -> Result<bool, ProvisionError> {
    if fs::try_exists(dst).await? {
        debug!("Keeping existing {}", dst.display());
        return Ok(false);
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(src, dst).await.map_err(|e| {
        ProvisionError::step("config-samples", format!("copy {}: {}", src.display(), e))
    })?;

    info!("Installed {}", dst.display());
    Ok(true)
}

/// Link every entry of `source_dir` into `link_dir`, pointing at `target_dir`
///
/// For each name `f` in `source_dir`, `link_dir/f` becomes a symlink to
/// `target_dir/f` unless something already exists there. A dangling link
/// does not count as existing and is replaced. Returns the number of links
/// created.
pub async fn link_missing(
    source_dir: &Path,
    target_dir: &Path,
    link_dir: &Path,
) -> Result<usize, ProvisionError> {
    if !fs::try_exists(source_dir).await? {
        debug!("No plugin directory at {}", source_dir.display());
        return Ok(0);
    }

    fs::create_dir_all(link_dir).await?;

    let mut names = Vec::new();
    let mut entries = fs::read_dir(source_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name());
    }
    names.sort();

    let mut created = 0;
    for name in names {
        let link = link_dir.join(&name);

        // metadata() follows links, so only a live file or link stops us
        if fs::metadata(&link).await.is_ok() {
            debug!("Keeping existing {}", link.display());
            continue;
        }
        if fs::symlink_metadata(&link).await.is_ok() {
            debug!("Replacing dangling link {}", link.display());
            fs::remove_file(&link).await?;
        }

        let target = target_dir.join(&name);
        create_symlink(&target, &link).await?;
        info!("Linked {} -> {}", link.display(), target.display());
        created += 1;
    }

    Ok(created)
}

async fn create_symlink(target: &Path, link: &Path) -> Result<(), ProvisionError> {
    #[cfg(unix)]
    {
        fs::symlink(target, link).await?;
    }

    #[cfg(not(unix))]
    {
        fs::copy(target, link).await?;
    }

    Ok(())
}

/// Append the lines missing from `path`; returns how many were added
pub async fn append_missing_lines(path: &Path, lines: &[String]) -> Result<usize, ProvisionError> {
    let existing = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let mut content = existing.clone();
    let mut added = 0;
    for line in lines {
        if existing.lines().any(|l| l == line) {
            continue;
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(line);
        content.push('\n');
        added += 1;
    }

    if added > 0 {
        write_file(path, &content).await?;
        info!("Added {} lines to {}", added, path.display());
    }
    Ok(added)
}
