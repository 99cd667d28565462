//! Session orchestration module.
//!
//! `SyncEngine` executes one backup session against a configuration
//! snapshot, in four strictly sequential phases:
//!
//! 1. Validate every location and the destination
//! 2. Estimate the total byte size of all source trees
//! 3. Walk the trees again in the same order, copying files and
//!    resolving destination conflicts
//! 4. Report completion
//!
//! Per-file failures during phase 3 are recorded on the session and do
//! not abort the run; validation failures end the run before any file
//! is touched.

use std::cmp;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::compare::{self, ChecksumAlgorithm};
use crate::error::EngineError;
use crate::fs_ops;
use crate::model::{BackupSession, BackupSnapshot, FileFailure, SessionStatus};
use crate::progress::{ConfirmSink, ErrorSink, ProgressSink};

/// The synchronization engine. One engine runs at most one session at a
/// time; a second `run` while one is in flight returns
/// [`EngineError::AlreadyRunning`].
#[derive(Debug)]
pub struct SyncEngine {
    running: AtomicBool,
    algorithm: ChecksumAlgorithm,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::with_algorithm(ChecksumAlgorithm::default())
    }

    /// Use `algorithm` for the "is the destination already this file?"
    /// content comparison.
    pub fn with_algorithm(algorithm: ChecksumAlgorithm) -> Self {
        SyncEngine {
            running: AtomicBool::new(false),
            algorithm,
        }
    }

    /// True while a session is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Execute one backup session.
    ///
    /// Validation failures are reported through `errors` and end the run
    /// with status `Failed` before any file is touched. Per-file copy
    /// failures are collected on the returned session; a session with
    /// failures ends `Failed` but every remaining file is still copied.
    ///
    /// # Errors
    /// Returns `EngineError::AlreadyRunning` when invoked re-entrantly;
    /// all other outcomes are expressed on the returned session.
    pub fn run(
        &self,
        snapshot: BackupSnapshot,
        progress: Option<&dyn ProgressSink>,
        confirm: Option<&dyn ConfirmSink>,
        errors: Option<&dyn ErrorSink>,
    ) -> Result<BackupSession, EngineError> {
        let _guard = RunGuard::acquire(&self.running)?;

        let mut session = BackupSession::new(snapshot);
        // The session owns the snapshot; phases work from a local copy so
        // the counters on the session stay independently mutable.
        let snapshot = session.snapshot.clone();
        debug!(session_id = %session.id, "backup session started");

        report(progress, Some("Validating paths ..."), Some(1), Some(true));

        // Phase 1: validate
        for location in &snapshot.locations {
            if !Path::new(location).is_dir() {
                fail(&mut session, progress, errors, "Validation error", location);
                return Ok(session);
            }
        }

        let destination = snapshot.destination.clone();
        if !destination.exists() {
            let root = destination
                .components()
                .next()
                .map(|c| PathBuf::from(c.as_os_str()));

            match root {
                Some(root) if root.exists() => {
                    let question = format!(
                        "{} does not exist. Would you like to create it?",
                        destination.display()
                    );
                    let create = confirm
                        .map(|c| c.confirm("Destination", &question))
                        .unwrap_or(false);
                    if create {
                        if let Err(e) = fs::create_dir_all(&destination) {
                            // Leave it to the directory check below
                            warn!(
                                path = %destination.display(),
                                error = %e,
                                "could not create destination"
                            );
                        }
                    }
                }
                Some(root) => {
                    let detail = format!("Root \"{}\" not found.", root.display());
                    fail(&mut session, progress, errors, "Validation error", &detail);
                    return Ok(session);
                }
                None => {
                    fail(
                        &mut session,
                        progress,
                        errors,
                        "Validation error",
                        "No destination configured.",
                    );
                    return Ok(session);
                }
            }
        }

        if !destination.is_dir() {
            let detail = destination.display().to_string();
            fail(&mut session, progress, errors, "Validation error", &detail);
            return Ok(session);
        }

        // Phase 2: estimate
        session.status = SessionStatus::Estimating;
        report(progress, Some("Calculating total size ..."), None, None);

        for location in &snapshot.locations {
            match fs_ops::tree_size(Path::new(location)) {
                Ok(size) => session.total_bytes += size,
                Err(e) => {
                    fail(&mut session, progress, errors, "Backup failed", &e.to_string());
                    return Ok(session);
                }
            }
        }
        debug!(
            session_id = %session.id,
            total_bytes = session.total_bytes,
            "size estimation complete"
        );

        // Phase 3: copy, same traversal order as phase 2
        session.status = SessionStatus::Copying;
        for location in &snapshot.locations {
            let root = Path::new(location);
            let walked = fs_ops::walk_tree(root, &mut |path, meta| {
                if !meta.is_file() {
                    return;
                }

                session.transferred_bytes += meta.len();
                let percent = if session.total_bytes > 0 {
                    session.transferred_bytes * 100 / session.total_bytes
                } else {
                    100
                };
                // 1% is reserved for validation so the bar is visibly
                // non-zero the moment copying starts.
                let shown = cmp::min(1 + percent, 100) as u8;
                report(
                    progress,
                    Some(&path.display().to_string()),
                    Some(shown),
                    None,
                );

                let dest = match fs_ops::destination_for(path, root, &destination) {
                    Some(dest) => dest,
                    None => return,
                };

                if let Err(e) = copy_one(path, &dest, snapshot.overwrite, self.algorithm) {
                    warn!(
                        source = %path.display(),
                        dest = %dest.display(),
                        error = %e,
                        "file failed, continuing with remaining files"
                    );
                    session.failures.push(FileFailure {
                        source_path: path.to_path_buf(),
                        destination_path: dest,
                        error_code: e.raw_os_error(),
                        message: e.to_string(),
                    });
                }
            });

            if let Err(e) = walked {
                fail(&mut session, progress, errors, "Backup failed", &e.to_string());
                return Ok(session);
            }
        }

        // Phase 4: finish
        session.finished_at = Some(chrono::Utc::now());
        if session.failures.is_empty() {
            session.status = SessionStatus::Succeeded;
            report(progress, Some("Backup successful."), Some(100), Some(false));
        } else {
            session.status = SessionStatus::Failed;
            let text = format!("Backup finished with {} errors.", session.failures.len());
            report(progress, Some(&text), Some(100), Some(false));
        }
        debug!(
            session_id = %session.id,
            status = %session.status,
            failures = session.failures.len(),
            "backup session finished"
        );

        Ok(session)
    }
}

/// Copy a single file to its destination, resolving conflicts.
///
/// Conflict table, in evaluation order:
/// - destination is a directory: delete it when overwriting, otherwise
///   rename it aside as `old_<name>`; copy either way
/// - destination is a file: skip when contents are identical, or when
///   they differ but overwriting is off; delete-then-copy otherwise
/// - destination absent: copy
fn copy_one(
    source: &Path,
    dest: &Path,
    overwrite: bool,
    algorithm: ChecksumAlgorithm,
) -> Result<(), EngineError> {
    fs_ops::ensure_parent_dir_exists(dest)?;

    if dest.is_dir() {
        if overwrite {
            fs::remove_dir_all(dest).map_err(|e| EngineError::RemoveFailed {
                path: dest.to_path_buf(),
                source: e,
            })?;
        } else {
            fs_ops::rename_aside(dest)?;
        }
    } else if dest.is_file() {
        if compare::same_file_contents(source, dest, algorithm)? {
            return Ok(());
        }
        if !overwrite {
            // Changed file, overwriting off: leave the stale copy
            return Ok(());
        }
        fs::remove_file(dest).map_err(|e| EngineError::RemoveFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;
    }

    fs_ops::copy_file_with_metadata(source, dest)?;
    Ok(())
}

fn report(
    progress: Option<&dyn ProgressSink>,
    status_text: Option<&str>,
    percent: Option<u8>,
    disable_backup: Option<bool>,
) {
    if let Some(sink) = progress {
        sink.report(status_text, percent, disable_backup);
    }
}

fn fail(
    session: &mut BackupSession,
    progress: Option<&dyn ProgressSink>,
    errors: Option<&dyn ErrorSink>,
    title: &str,
    text: &str,
) {
    session.status = SessionStatus::Failed;
    session.finished_at = Some(chrono::Utc::now());

    report(
        progress,
        Some(&format!("{}. {}", title, text)),
        None,
        Some(false),
    );
    if let Some(sink) = errors {
        sink.error(title, text);
    }
    warn!(title, text, "backup session failed");
}

/// Holds the engine's run flag for the duration of one session.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, EngineError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| EngineError::AlreadyRunning)?;
        Ok(RunGuard { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
