//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Walking directory trees in a deterministic order
//! - Copying files with metadata preservation
//! - Creating directories recursively
//! - Moving conflicting destination entries aside
//! - Rewriting source paths into destination paths

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::EngineError;

/// Walk `root` recursively, invoking `visit` for every entry (files and
/// directories alike) with its path and metadata.
///
/// Entries within each directory are visited in file-name order, so two
/// walks over an unchanged tree see entries in the same sequence. The
/// size-estimation pass and the copy pass both rely on that. Symlinked
/// directories are not descended into; symlinked files are reported with
/// the metadata of their target.
pub fn walk_tree(
    root: &Path,
    visit: &mut dyn FnMut(&Path, &fs::Metadata),
) -> Result<(), EngineError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(root)
        .map_err(|e| EngineError::EnumerationFailed {
            path: root.to_path_buf(),
            source: e,
        })?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(|e| EngineError::EnumerationFailed {
            path: root.to_path_buf(),
            source: e,
        })?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for path in entries {
        // Stat without following, to decide recursion; skip entries that
        // vanish between listing and stat.
        let link_meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(EngineError::EnumerationFailed { path, source: e });
            }
        };

        if link_meta.is_dir() {
            visit(&path, &link_meta);
            walk_tree(&path, visit)?;
        } else {
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                // Dangling symlink: report what we have
                Err(_) => link_meta,
            };
            visit(&path, &meta);
        }
    }

    Ok(())
}

/// Sum the sizes of all regular files under `root`. Directories
/// contribute zero bytes.
pub fn tree_size(root: &Path) -> Result<u64, EngineError> {
    let mut total = 0u64;
    walk_tree(root, &mut |_, meta| {
        if meta.is_file() {
            total += meta.len();
        }
    })?;
    Ok(total)
}

/// Compute the destination path for a source file.
///
/// The prefix equal to the parent of the file's source root is stripped
/// and the remainder appended to `destination`, so a root `/src/a`
/// mirrors to `<destination>/a/...`.
pub fn destination_for(
    source: &Path,
    location_root: &Path,
    destination: &Path,
) -> Option<PathBuf> {
    // A filesystem root has no parent; strip the root itself then.
    let prefix = location_root.parent().unwrap_or(location_root);
    let relative = source.strip_prefix(prefix).ok()?;
    Some(destination.join(relative))
}

/// Copy a file's bytes and metadata (permissions, modification time)
/// to `dst`.
///
/// Returns the number of bytes copied.
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    // fs::copy carries permissions along with the bytes
    let bytes_copied = fs::copy(src, dst).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            EngineError::ReadError {
                path: src.to_path_buf(),
                source: e,
            }
        } else {
            EngineError::WriteError {
                path: dst.to_path_buf(),
                source: e,
            }
        }
    })?;

    // Carry the modification time over as well; a failure here is not
    // worth failing the file for.
    if let Ok(meta) = fs::metadata(src) {
        if let Ok(mtime) = meta.modified() {
            let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
        }
    }

    Ok(bytes_copied)
}

/// Ensure the parent directory of a path exists, creating it if necessary.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), EngineError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    match fs::metadata(parent) {
        Ok(metadata) => {
            if metadata.is_dir() {
                Ok(())
            } else {
                Err(EngineError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "Parent path exists but is not a directory",
                    ),
                })
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(parent).map_err(|e| EngineError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(EngineError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        }),
    }
}

/// Rename `path` to a sibling named `old_<name>`, preserving it instead
/// of deleting it. Returns the new path.
pub fn rename_aside(path: &Path) -> Result<PathBuf, EngineError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("entry");
    let aside = match path.parent() {
        Some(parent) => parent.join(format!("old_{}", name)),
        None => PathBuf::from(format!("old_{}", name)),
    };

    fs::rename(path, &aside).map_err(|e| EngineError::RenameFailed {
        from: path.to_path_buf(),
        to: aside.clone(),
        source: e,
    })?;

    Ok(aside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_walk_tree_visits_sorted_and_nested() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(src.join("sub")).expect("Failed to create sub dir");
        fs::write(src.join("b.txt"), b"bb").expect("Failed to write b.txt");
        fs::write(src.join("a.txt"), b"a").expect("Failed to write a.txt");
        fs::write(src.join("sub").join("c.txt"), b"ccc").expect("Failed to write c.txt");

        let mut names = Vec::new();
        walk_tree(&src, &mut |path, _| {
            names.push(path.file_name().unwrap().to_string_lossy().into_owned());
        })
        .expect("Failed to walk");

        assert_eq!(names, vec!["a.txt", "b.txt", "sub", "c.txt"]);
    }

    #[test]
    fn test_walk_tree_is_deterministic_across_passes() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");
        for name in ["z", "m", "a"] {
            fs::write(src.join(name), name.as_bytes()).expect("Failed to write file");
        }

        let collect = || {
            let mut paths = Vec::new();
            walk_tree(&src, &mut |path, _| paths.push(path.to_path_buf()))
                .expect("Failed to walk");
            paths
        };

        assert_eq!(collect(), collect());
    }

    #[test]
    fn test_tree_size_sums_files_only() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::create_dir(src.join("empty")).expect("Failed to create empty dir");
        fs::write(src.join("one.bin"), vec![0u8; 10]).expect("Failed to write one.bin");
        fs::write(src.join("empty").join("two.bin"), vec![0u8; 7])
            .expect("Failed to write two.bin");

        let total = tree_size(&src).expect("Failed to size tree");
        assert_eq!(total, 17);
    }

    #[test]
    fn test_walk_tree_missing_root_fails() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = walk_tree(&temp_dir.path().join("nope"), &mut |_, _| {});
        assert!(result.is_err());
    }

    #[test]
    fn test_destination_for_strips_root_parent() {
        let dest = destination_for(
            Path::new("/src/a/sub/f.txt"),
            Path::new("/src/a"),
            Path::new("/dst"),
        )
        .expect("Paths should rewrite");
        assert_eq!(dest, PathBuf::from("/dst/a/sub/f.txt"));
    }

    #[test]
    fn test_destination_for_unrelated_path_is_none() {
        assert_eq!(
            destination_for(Path::new("/elsewhere/f.txt"), Path::new("/src/a"), Path::new("/dst")),
            None
        );
    }

    #[test]
    fn test_copy_file_with_metadata_preserves_content_and_mtime() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src_file = temp_dir.path().join("source.txt");
        let dst_file = temp_dir.path().join("dest.txt");

        let mut file = fs::File::create(&src_file).expect("Failed to create source");
        file.write_all(b"test content").expect("Failed to write source");
        drop(file);

        let bytes = copy_file_with_metadata(&src_file, &dst_file).expect("Failed to copy");
        assert_eq!(bytes, 12);

        let content = fs::read_to_string(&dst_file).expect("Failed to read dest");
        assert_eq!(content, "test content");

        let src_mtime = fs::metadata(&src_file)
            .and_then(|m| m.modified())
            .expect("Failed to stat source");
        let dst_mtime = fs::metadata(&dst_file)
            .and_then(|m| m.modified())
            .expect("Failed to stat dest");
        assert_eq!(
            filetime::FileTime::from_system_time(src_mtime),
            filetime::FileTime::from_system_time(dst_mtime)
        );
    }

    #[test]
    fn test_ensure_parent_dir_exists() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("a").join("b").join("file.txt");

        ensure_parent_dir_exists(&path).expect("Failed to create parent");
        assert!(path.parent().unwrap().is_dir());

        // Idempotent when already present
        ensure_parent_dir_exists(&path).expect("Second call should be a no-op");
    }

    #[test]
    fn test_rename_aside_prefixes_name() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path().join("a");
        fs::create_dir(&dir).expect("Failed to create dir");
        fs::write(dir.join("inner.txt"), b"x").expect("Failed to write inner file");

        let aside = rename_aside(&dir).expect("Failed to rename aside");

        assert_eq!(aside, temp_dir.path().join("old_a"));
        assert!(!dir.exists());
        assert!(aside.join("inner.txt").is_file(), "Contents must be preserved");
    }
}
