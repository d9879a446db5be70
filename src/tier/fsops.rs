use anyhow::{Context, Result};
use chrono::Local;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SUFFIX_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn path_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn with_name_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn with_stem_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_stem().map(OsStr::to_os_string).unwrap_or_default();
    name.push(suffix);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    path.with_file_name(name)
}

pub fn unique_destination_path(path: &Path) -> PathBuf {
    if !path_occupied(path) {
        return path.to_path_buf();
    }

    let is_dir = path.is_dir();
    let mut counter = 1u64;
    loop {
        let suffix = format!("_{counter}");
        let candidate = if is_dir {
            with_name_suffix(path, &suffix)
        } else {
            with_stem_suffix(path, &suffix)
        };
        if !path_occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Folder collision policy shared by promotion and revert: keep `path` when
/// free, otherwise append `_<YYYYmmddHHMMSS>`. A second collision within the
/// same second falls through to the numeric counter.
pub fn timestamped_destination_path(path: &Path) -> PathBuf {
    if !path_occupied(path) {
        return path.to_path_buf();
    }
    let stamp = Local::now().format(SUFFIX_TIMESTAMP_FORMAT).to_string();
    let candidate = with_name_suffix(path, &format!("_{stamp}"));
    if !path_occupied(&candidate) {
        return candidate;
    }
    unique_destination_path(&candidate)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let points_to =
        fs::read_link(link).with_context(|| format!("failed to read link {}", link.display()))?;
    std::os::unix::fs::symlink(&points_to, target)
        .with_context(|| format!("failed to create link {}", target.display()))
}

#[cfg(windows)]
fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};
    let points_to =
        fs::read_link(link).with_context(|| format!("failed to read link {}", link.display()))?;
    let created = match fs::metadata(link) {
        Ok(meta) if meta.is_dir() => symlink_dir(&points_to, target),
        _ => symlink_file(&points_to, target),
    };
    created.with_context(|| format!("failed to create link {}", target.display()))
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))
}

fn copy_dir_contents(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).min_depth(1).follow_links(false) {
        let entry = entry.with_context(|| format!("failed to walk {}", from.display()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("unexpected path {}", entry.path().display()))?;
        let target = to.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn discard_partial_copy(to: &Path) {
    let removed = match fs::symlink_metadata(to) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(to),
        Ok(_) => fs::remove_file(to),
        Err(_) => return,
    };
    if let Err(err) = removed {
        tracing::error!("partial copy left at {}: {err}", to.display());
    }
}

/// Copy then delete, for moves between filesystems. A failed copy removes
/// whatever reached `to`, so the source stays the only instance.
fn move_by_copy(from: &Path, to: &Path) -> Result<()> {
    let meta =
        fs::symlink_metadata(from).with_context(|| format!("failed to stat {}", from.display()))?;

    if meta.is_dir() {
        fs::create_dir(to).with_context(|| format!("failed to create {}", to.display()))?;
        if let Err(err) = copy_dir_contents(from, to) {
            discard_partial_copy(to);
            return Err(err);
        }
    } else {
        let copied = if meta.file_type().is_symlink() {
            copy_symlink(from, to)
        } else {
            copy_file(from, to)
        };
        if let Err(err) = copied {
            discard_partial_copy(to);
            return Err(err);
        }
    }

    let removed = if meta.is_dir() {
        fs::remove_dir_all(from)
    } else {
        fs::remove_file(from)
    };
    // The copy at `to` is complete, so it stands as the moved item.
    if let Err(err) = removed {
        tracing::warn!("copied to {} but could not remove {}: {err}", to.display(), from.display());
    }
    Ok(())
}

pub fn move_path(from: &Path, to: &Path) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if path_occupied(to) {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("destination already exists: {}", to.display()),
        ))
        .with_context(|| format!("failed to move {} to {}", from.display(), to.display()));
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) if rename_err.kind() == ErrorKind::CrossesDevices => move_by_copy(from, to),
        Err(rename_err) => Err(rename_err)
            .with_context(|| format!("failed to move {} to {}", from.display(), to.display())),
    }
}

pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn name_at_limit(prefix: &str, ext: &str) -> String {
    let fill = 255 - prefix.len() - ext.len();
    format!("{prefix}{}{ext}", "x".repeat(fill))
}
