//! Core data model for backup sessions.
//!
//! This module defines the main data structures for one engine run:
//! - BackupSnapshot: the immutable configuration a session works from
//! - BackupSession: counters, status and failures for one run
//! - SessionStatus: the phase/outcome enum
//! - FileFailure: one isolated per-file copy failure

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Immutable copy of the backup configuration, taken when a session
/// starts so that concurrent configuration edits cannot affect a run
/// already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupSnapshot {
    /// Source directory roots, in configured order
    pub locations: Vec<String>,

    /// Root directory the mirrored trees are written under
    pub destination: PathBuf,

    /// Whether conflicting destination entries are replaced
    pub overwrite: bool,
}

/// One execution of the synchronization engine.
///
/// Created when a run starts and returned to the caller when it ends;
/// never persisted.
#[derive(Debug, Serialize)]
pub struct BackupSession {
    /// Unique identifier for this session
    pub id: Uuid,

    /// The configuration this session ran against
    pub snapshot: BackupSnapshot,

    /// Sum of sizes of every regular file under every location
    pub total_bytes: u64,

    /// Bytes accounted for so far during the copy phase
    pub transferred_bytes: u64,

    /// Current phase, or final outcome once the run ends
    pub status: SessionStatus,

    /// Per-file failures that were isolated and skipped over
    pub failures: Vec<FileFailure>,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// When the session ended (success or failure)
    pub finished_at: Option<DateTime<Utc>>,
}

impl BackupSession {
    pub(crate) fn new(snapshot: BackupSnapshot) -> Self {
        BackupSession {
            id: Uuid::new_v4(),
            snapshot,
            total_bytes: 0,
            transferred_bytes: 0,
            status: SessionStatus::Validating,
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// True if the run finished without validation or per-file failures.
    pub fn succeeded(&self) -> bool {
        self.status == SessionStatus::Succeeded
    }
}

/// Phase of a running session, or its terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    /// Checking locations and destination
    Validating,
    /// Summing source file sizes
    Estimating,
    /// Walking and copying files
    Copying,
    /// All files processed without failures
    Succeeded,
    /// Validation failed, or one or more files could not be copied
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Validating => write!(f, "Validating"),
            SessionStatus::Estimating => write!(f, "Estimating"),
            SessionStatus::Copying => write!(f, "Copying"),
            SessionStatus::Succeeded => write!(f, "Succeeded"),
            SessionStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// A single file that could not be processed during the copy phase.
///
/// Failures are collected on the session so one bad file does not abort
/// the backup of everything else.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    /// Source path of the file that failed
    pub source_path: PathBuf,

    /// Destination path it was being copied to
    pub destination_path: PathBuf,

    /// OS error code, if one was available
    pub error_code: Option<u32>,

    /// Human-readable error message
    pub message: String,
}
