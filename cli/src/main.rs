//! Command-line interface for the backup engine.
//!
//! Provides subcommands to edit the persistent configuration and to run
//! a backup, either interactively (progress bar, confirmation prompts)
//! or in background mode (no prompts, JSON summary on stdout).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use engine::{
    BackupConfig, ChecksumAlgorithm, ConfirmSink, ErrorSink, ProgressSink, SessionStatus,
    SyncEngine,
};

/// Mirror configured directories into a backup destination
#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(version = "0.1.0")]
#[command(about = "Back up a set of directories with progress tracking")]
struct Args {
    /// Path of the persistent configuration file
    #[arg(long, value_name = "PATH", default_value = ".data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a source location
    Add {
        /// Directory to back up
        path: String,
    },
    /// Remove a configured source location
    Remove {
        /// Previously added directory (exact string)
        path: String,
    },
    /// Set the backup destination
    Destination {
        /// Directory the mirrored trees are written under
        path: String,
    },
    /// Set the overwrite policy
    Overwrite {
        /// "on" to replace conflicting destination entries, "off" to
        /// preserve them
        value: String,
    },
    /// Print the current configuration
    Show,
    /// Run a backup now
    Run {
        /// Run without prompts or progress output; prints a JSON summary
        #[arg(short, long)]
        background: bool,

        /// Print per-file status lines
        #[arg(long, conflicts_with = "background")]
        verbose: bool,

        /// Checksum algorithm for change detection: sha256 or blake3
        #[arg(long, value_name = "ALGORITHM", default_value = "blake3")]
        hash: String,
    },
}

/// Interactive implementation of the engine sinks: progress bar and
/// status lines on stderr, confirmation prompts on stdin.
struct CliSink {
    verbose: bool,
    start_time: Instant,
}

impl CliSink {
    fn new(verbose: bool) -> Self {
        CliSink {
            verbose,
            start_time: Instant::now(),
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: std::time::Duration) -> String {
        let secs = elapsed.as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    fn print_progress_bar(percent: u8) -> String {
        let filled = (percent / 5) as usize;
        let empty = 20 - filled;
        format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
    }
}

impl ProgressSink for CliSink {
    fn report(&self, status_text: Option<&str>, percent: Option<u8>, _disable: Option<bool>) {
        if let Some(percent) = percent {
            eprint!("\r{}", Self::print_progress_bar(percent));
            let _ = io::stderr().flush();
        }
        if let Some(text) = status_text {
            if self.verbose {
                eprintln!("\n{}", text);
            }
        }
    }
}

impl ConfirmSink for CliSink {
    fn confirm(&self, title: &str, text: &str) -> bool {
        eprintln!();
        eprint!("{}: {} [y/N] ", title, text);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

impl ErrorSink for CliSink {
    fn error(&self, title: &str, text: &str) {
        eprintln!();
        eprintln!("{}: {}", title, text);
    }
}

/// Error sink for background mode; failures still have to reach the log.
struct BackgroundErrorSink;

impl ErrorSink for BackgroundErrorSink {
    fn error(&self, title: &str, text: &str) {
        tracing::error!(title, text, "backup failed");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    let mut config =
        BackupConfig::open(&args.data).map_err(|e| format!("Failed to open configuration: {}", e))?;

    match &args.command {
        Command::Add { path } => {
            let added = config
                .add_location(path)
                .map_err(|e| format!("Failed to add location: {}", e))?;
            if added {
                println!("Added: {}", path);
                Ok(())
            } else {
                Err(format!(
                    "Not added: {} (not a directory, or already configured)",
                    path
                ))
            }
        }
        Command::Remove { path } => {
            config
                .remove_location(path)
                .map_err(|e| e.to_string())?;
            println!("Removed: {}", path);
            Ok(())
        }
        Command::Destination { path } => {
            let set = config
                .set_destination(path)
                .map_err(|e| format!("Failed to set destination: {}", e))?;
            if set {
                println!("Destination: {}", path);
                Ok(())
            } else {
                Err(format!("Not a directory: {}", path))
            }
        }
        Command::Overwrite { value } => {
            let flag = match value.to_lowercase().as_str() {
                "on" | "true" => true,
                "off" | "false" => false,
                _ => return Err(format!("Invalid value '{}'. Use 'on' or 'off'", value)),
            };
            config
                .set_overwrite(flag)
                .map_err(|e| format!("Failed to set overwrite: {}", e))?;
            println!("Overwrite: {}", if flag { "on" } else { "off" });
            Ok(())
        }
        Command::Show => {
            println!("Locations:");
            for location in config.locations() {
                println!("  {}", location);
            }
            if config.locations().is_empty() {
                println!("  (none)");
            }
            println!(
                "Destination: {}",
                if config.destination().is_empty() {
                    "(not set)"
                } else {
                    config.destination()
                }
            );
            println!(
                "Overwrite: {}",
                if config.overwrite() { "on" } else { "off" }
            );
            Ok(())
        }
        Command::Run {
            background,
            verbose,
            hash,
        } => {
            let algorithm = ChecksumAlgorithm::parse(hash)
                .ok_or_else(|| format!("Invalid hash algorithm '{}'. Must be 'sha256' or 'blake3'", hash))?;

            run_backup(&config, algorithm, *background, *verbose)
        }
    }
}

fn run_backup(
    config: &BackupConfig,
    algorithm: ChecksumAlgorithm,
    background: bool,
    verbose: bool,
) -> Result<(), String> {
    let engine = SyncEngine::with_algorithm(algorithm);
    let sink = CliSink::new(verbose);

    let session = if background {
        // Same algorithm, no visible progress and no prompts; a missing
        // destination counts as declined.
        engine
            .run(config.snapshot(), None, None, Some(&BackgroundErrorSink))
            .map_err(|e| e.to_string())?
    } else {
        engine
            .run(config.snapshot(), Some(&sink), Some(&sink), Some(&sink))
            .map_err(|e| e.to_string())?
    };

    if background {
        let summary = serde_json::to_string(&session)
            .map_err(|e| format!("Failed to serialize summary: {}", e))?;
        println!("{}", summary);
    } else {
        eprintln!();
        eprintln!("Status: {}", session.status);
        eprintln!(
            "Bytes: {}",
            CliSink::format_bytes(session.transferred_bytes)
        );
        eprintln!(
            "Elapsed: {}",
            CliSink::format_duration(sink.start_time.elapsed())
        );

        if !session.failures.is_empty() {
            eprintln!();
            eprintln!("Failed files:");
            for failure in &session.failures {
                eprintln!("  {}: {}", failure.source_path.display(), failure.message);
            }
        }
    }

    match session.status {
        SessionStatus::Succeeded => Ok(()),
        _ => Err("Backup did not complete successfully".to_string()),
    }
}
