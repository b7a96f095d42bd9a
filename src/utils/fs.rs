//! File system helpers for the local executor.
//!
//! Copies always produce real files. Debug symbol binaries in particular
//! must not be symlinks, or Spotlight will not index the dSYM and debuggers
//! will not find it.

use crate::error::{Error, ErrorExt, Result};
use std::{io, path::Path};
use tokio::fs;

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Creates the parent directory of `path` if it has one.
pub async fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    Ok(())
}

/// Removes a file or directory if it exists.
pub async fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => {
            fs::remove_dir_all(path).await.fs_context("removing directory", path)
        }
        Ok(_) => fs::remove_file(path).await.fs_context("removing file", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Fs {
            context: "inspecting path",
            path: path.to_path_buf(),
            error: e,
        }),
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Permissions are preserved. Fails if the source path is a directory or
/// doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        crate::bail!("{:?} does not exist", from);
    }
    if !from.is_file() {
        crate::bail!("{:?} is not a file", from);
    }
    create_parent_dir(to).await?;
    fs::copy(from, to).await.fs_context("copying file to", to)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them.
/// Fails if the source path is not a directory or doesn't exist.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        crate::bail!("{:?} does not exist", from);
    }
    if !from.is_dir() {
        crate::bail!("{:?} is not a directory", from);
    }
    create_parent_dir(to).await?;

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path()).await?;
            if entry.path().is_dir() {
                symlink_dir(&target, &dest_path)?;
            } else {
                symlink_file(&target, &dest_path)?;
            }
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path).await?;
        } else {
            fs::copy(entry.path(), &dest_path).await?;
        }
    }

    Ok(())
}

/// Copies a file or directory, replacing whatever is at `to`.
pub async fn copy_path(from: &Path, to: &Path) -> Result<()> {
    remove_path(to).await?;
    if from.is_dir() {
        copy_dir(from, to).await
    } else {
        copy_file(from, to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_dir_recreates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("a/b/file.txt"), b"hello").unwrap();

        let dst = tmp.path().join("out/dst");
        copy_dir(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(dst.join("a/b/file.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_copy_path_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src.txt");
        let dst = tmp.path().join("dst.txt");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dst, b"old").unwrap();

        copy_path(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"new");
        assert!(!std::fs::symlink_metadata(&dst).unwrap().file_type().is_symlink());
    }

    #[tokio::test]
    async fn test_copy_file_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = copy_file(&tmp.path().join("nope"), &tmp.path().join("x")).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
