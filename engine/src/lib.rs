//! # Backup Engine - Directory Synchronization Library
//!
//! A headless engine that mirrors a set of source directories into a
//! destination directory, with a persistent configuration and progress
//! reporting decoupled from any UI.
//!
//! ## Overview
//!
//! The engine provides:
//! - A durable JSON key-value store and a write-through configuration
//!   manager built on it (source locations, destination, overwrite flag)
//! - A four-phase backup session: validate, estimate, copy, finish
//! - Conflict resolution at the destination driven by the overwrite flag
//! - Per-file error isolation: one bad file does not abort the session
//! - Progress, confirmation and error reporting via caller-supplied sinks
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{BackupConfig, SyncEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load (or create) the persistent configuration
//! let mut config = BackupConfig::open(".data")?;
//! config.add_location("/home/me/documents")?;
//! config.set_destination("/mnt/backup")?;
//!
//! // Run a session against an immutable snapshot
//! let engine = SyncEngine::new();
//! let session = engine.run(config.snapshot(), None, None, None)?;
//!
//! println!("{}: {} bytes", session.status, session.transferred_bytes);
//! for failure in &session.failures {
//!     println!("failed: {}", failure.source_path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **store**: single-file JSON key-value persistence
//! - **config**: validated, write-through backup configuration
//! - **model**: session data structures (snapshot, session, failures)
//! - **error**: error types and handling
//! - **fs_ops**: low-level filesystem operations
//! - **session**: session orchestration (the four phases)
//! - **progress**: sink traits for progress/confirmation/error reporting
//! - **compare**: file content identity comparison

pub mod compare;
pub mod config;
pub mod error;
pub mod fs_ops;
pub mod model;
pub mod progress;
pub mod session;
pub mod store;

// Re-export main types and functions
pub use compare::{compute_file_checksum, same_file_contents, ChecksumAlgorithm, ChecksumValue};
pub use config::{BackupConfig, DESTINATION_KEY, LOCATIONS_KEY, OVERWRITE_KEY};
pub use error::EngineError;
pub use model::{BackupSession, BackupSnapshot, FileFailure, SessionStatus};
pub use progress::{ConfirmSink, ErrorSink, ProgressSink};
pub use session::SyncEngine;
pub use store::JsonStore;
