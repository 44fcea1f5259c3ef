//! Filesystem utilities for artifact building.
//!
//! Directory listing, staging-tree copies and idempotent removal used by
//! validation and the unit builder.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Hidden-entry marker; names starting with it are never listed.
pub const HIDDEN_PREFIX: char = '.';

/// List the immediate children of `path` that satisfy `predicate`.
///
/// Entries come back sorted by file name so repeated listings within a run
/// (and across platforms) agree.
///
/// # Errors
///
/// * [`FilesystemError::PathNotFound`] if `path` does not exist
/// * [`FilesystemError::NotADirectory`] if `path` is not a directory
pub fn list_entries<P>(path: &Path, predicate: P) -> Result<Vec<PathBuf>, FilesystemError>
where
    P: Fn(&Path) -> bool,
{
    if !path.exists() {
        return Err(FilesystemError::PathNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(FilesystemError::NotADirectory(path.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| FilesystemError::io("reading directory", path, e))? {
        let entry = entry.map_err(|e| FilesystemError::io("reading directory entry in", path, e))?;
        let entry_path = entry.path();
        if predicate(&entry_path) {
            entries.push(entry_path);
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(HIDDEN_PREFIX))
        .unwrap_or(false)
}

/// Non-hidden subdirectories of `path`.
pub fn non_hidden_dirs(path: &Path) -> Result<Vec<PathBuf>, FilesystemError> {
    list_entries(path, |p| p.is_dir() && !is_hidden(p))
}

/// Non-hidden regular files directly inside `path`.
pub fn non_hidden_files(path: &Path) -> Result<Vec<PathBuf>, FilesystemError> {
    list_entries(path, |p| p.is_file() && !is_hidden(p))
}

/// Remove a directory tree if it exists.
///
/// A missing directory is not an error, so this can be called any number
/// of times on the same path.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool, FilesystemError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FilesystemError::io("removing directory", path, e)),
    }
}

/// Remove a file if it exists. Same contract as [`remove_dir_if_exists`].
pub fn remove_file_if_exists(path: &Path) -> Result<bool, FilesystemError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(FilesystemError::io("removing file", path, e)),
    }
}

/// Recursively copy a directory, preserving symlinks.
///
/// `dst` may live inside `src` (the staging layout nests `dist/` in the
/// unit); it is skipped during the walk so the copy never contains itself.
/// Hidden files are copied like any other.
///
/// # Example
///
/// ```rust,ignore
/// use sam_deployer::artifact::filesystem::copy_dir_recursive;
/// use std::path::Path;
///
/// copy_dir_recursive(Path::new("lambdas/fnA"), Path::new("lambdas/fnA/dist"))?;
/// ```
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), FilesystemError> {
    if !src.is_dir() {
        return Err(FilesystemError::NotADirectory(src.to_path_buf()));
    }
    fs::create_dir_all(dst).map_err(|e| FilesystemError::io("creating directory", dst, e))?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != dst);

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            FilesystemError::io("walking", path, source)
        })?;

        let src_path = entry.path();
        let rel = src_path
            .strip_prefix(src)
            .map_err(|_| FilesystemError::NotADirectory(src_path.to_path_buf()))?;
        let dst_path = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = fs::read_link(src_path)
                .map_err(|e| FilesystemError::io("reading symlink", src_path, e))?;
            std::os::unix::fs::symlink(&target, &dst_path)
                .map_err(|e| FilesystemError::io("creating symlink", &dst_path, e))?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&dst_path)
                .map_err(|e| FilesystemError::io("creating directory", &dst_path, e))?;
        } else {
            fs::copy(src_path, &dst_path)
                .map_err(|e| FilesystemError::io("copying file", src_path, e))?;
        }
    }

    Ok(())
}
