//! Error types for the backup engine.
//!
//! The primary error type is `EngineError`, which represents failures that
//! prevent an operation from completing. Per-file copy failures during a
//! session are recorded as `model::FileFailure` entries on the session,
//! not as EngineError.

use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::path::PathBuf;

/// Errors surfaced by the store, the configuration manager and the engine.
///
/// Validation rejections that the configuration manager reports as a plain
/// `false` return (duplicate location, bad path on add/set) are not errors
/// and do not appear here.
#[derive(Debug)]
pub enum EngineError {
    /// A backup session is already in progress on this engine
    AlreadyRunning,

    /// `remove_location` was given a path that is not configured
    LocationNotFound { path: String },

    /// Failed to read the persistent store file
    StoreRead { path: PathBuf, source: io::Error },

    /// Failed to write the persistent store file
    StoreWrite { path: PathBuf, source: io::Error },

    /// Failed to read from a source file
    ReadError { path: PathBuf, source: io::Error },

    /// Failed to write to a destination file
    WriteError { path: PathBuf, source: io::Error },

    /// Failed to create a directory chain
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to remove a conflicting destination entry
    RemoveFailed { path: PathBuf, source: io::Error },

    /// Failed to rename a conflicting destination directory aside
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// Failed to enumerate a source directory
    EnumerationFailed { path: PathBuf, source: io::Error },
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => {
                write!(f, "A backup session is already running")
            }
            Self::LocationNotFound { path } => {
                write!(f, "Location is not configured: {}", path)
            }
            Self::StoreRead { path, .. } => {
                write!(f, "Failed to read store file: {}", path.display())
            }
            Self::StoreWrite { path, .. } => {
                write!(f, "Failed to write store file: {}", path.display())
            }
            Self::ReadError { path, .. } => {
                write!(f, "Failed to read file: {}", path.display())
            }
            Self::WriteError { path, .. } => {
                write!(f, "Failed to write file: {}", path.display())
            }
            Self::DirectoryCreationFailed { path, .. } => {
                write!(f, "Failed to create directory: {}", path.display())
            }
            Self::RemoveFailed { path, .. } => {
                write!(f, "Failed to remove existing entry: {}", path.display())
            }
            Self::RenameFailed { from, to, .. } => {
                write!(f, "Failed to rename {} to {}", from.display(), to.display())
            }
            Self::EnumerationFailed { path, .. } => {
                write!(f, "Failed to enumerate directory: {}", path.display())
            }
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StoreRead { source, .. }
            | Self::StoreWrite { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::RemoveFailed { source, .. }
            | Self::RenameFailed { source, .. }
            | Self::EnumerationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::StoreRead { source, .. }
            | Self::StoreWrite { source, .. }
            | Self::ReadError { source, .. }
            | Self::WriteError { source, .. }
            | Self::DirectoryCreationFailed { source, .. }
            | Self::RemoveFailed { source, .. }
            | Self::RenameFailed { source, .. }
            | Self::EnumerationFailed { source, .. } => source.raw_os_error().map(|e| e as u32),
            _ => None,
        }
    }
}
