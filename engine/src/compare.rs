//! File identity comparison.
//!
//! The conflict table needs a well-defined answer to "is the destination
//! already the same file?". Two files are considered identical when their
//! sizes match and their content checksums match; BLAKE3 is the default
//! algorithm, SHA-256 is available where a standardized digest is wanted.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::EngineError;

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// SHA-256 (cryptographic, 256-bit)
    Sha256,
    /// BLAKE3 (modern, fast, 256-bit)
    Blake3,
}

impl Default for ChecksumAlgorithm {
    fn default() -> Self {
        ChecksumAlgorithm::Blake3
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl ChecksumAlgorithm {
    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }
}

/// A computed checksum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumValue {
    algorithm: ChecksumAlgorithm,
    hex: String,
}

impl ChecksumValue {
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Compute the checksum of a file by streaming its content.
pub fn compute_file_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<ChecksumValue, EngineError> {
    let read_err = |e| EngineError::ReadError {
        path: path.to_path_buf(),
        source: e,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut buffer = [0u8; 65536];

    let hex = match algorithm {
        ChecksumAlgorithm::Sha256 => {
            use sha2::Digest;
            let mut hasher = sha2::Sha256::default();
            loop {
                match file.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => hasher.update(&buffer[..n]),
                    Err(e) => return Err(read_err(e)),
                }
            }
            format!("{:x}", hasher.finalize())
        }
        ChecksumAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                match file.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        hasher.update(&buffer[..n]);
                    }
                    Err(e) => return Err(read_err(e)),
                }
            }
            hasher.finalize().to_hex().to_string()
        }
    };

    Ok(ChecksumValue { algorithm, hex })
}

/// Decide whether two regular files hold the same content.
///
/// Differing sizes short-circuit to false without reading either file.
pub fn same_file_contents(
    a: &Path,
    b: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<bool, EngineError> {
    let meta_a = std::fs::metadata(a).map_err(|e| EngineError::ReadError {
        path: a.to_path_buf(),
        source: e,
    })?;
    let meta_b = std::fs::metadata(b).map_err(|e| EngineError::ReadError {
        path: b.to_path_buf(),
        source: e,
    })?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let checksum_a = compute_file_checksum(a, algorithm)?;
    let checksum_b = compute_file_checksum(b, algorithm)?;
    Ok(checksum_a == checksum_b)
}
