// File-level I/O helpers for the ROM delta codec.
//
// Provides `encode_file()` and `decode_file()` convenience functions.
// Images are fixed-size and bounded by the 17-bit address space, so both
// sides read whole files into memory. Optionally computes SHA-256
// checksums of the images involved (feature-gated behind `file-io`).

use std::io;
use std::path::Path;

use crate::delta::{self, DecodeError, EncodeError};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Reference image size in bytes.
    pub reference_size: u64,
    /// Target image size in bytes.
    pub target_size: u64,
    /// Diff stream size in bytes.
    pub delta_size: u64,
    /// Number of tokens in the stream.
    pub tokens: u64,
    /// Whether the freshly written stream was decoded back and checked.
    pub verified: bool,
    /// SHA-256 of the reference image (if `file-io` feature is enabled).
    pub reference_sha256: Option<[u8; 32]>,
    /// SHA-256 of the target image (if `file-io` feature is enabled).
    pub target_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Reference image size in bytes.
    pub reference_size: u64,
    /// Diff stream size in bytes.
    pub delta_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of tokens in the stream.
    pub tokens: u64,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug)]
pub enum IoError {
    /// I/O error (file open, read, write).
    Io(io::Error),
    /// Delta encoding error.
    Encode(EncodeError),
    /// Delta decoding error.
    Decode(DecodeError),
    /// Round-trip verification found a byte that does not match the target.
    VerifyMismatch { offset: usize },
    /// Round-trip verification produced the wrong number of bytes.
    VerifyLength { produced: usize, expected: usize },
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
            Self::VerifyMismatch { offset } => {
                write!(f, "round-trip verification failed at offset {offset:#07x}")
            }
            Self::VerifyLength { produced, expected } => write!(
                f,
                "round-trip verification produced {produced} bytes, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<EncodeError> for IoError {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

impl From<DecodeError> for IoError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Checksums
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    use sha2::Digest;
    let mut h = sha2::Sha256::new();
    h.update(data);
    Some(h.finalize().into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// encode_file
// ---------------------------------------------------------------------------

/// Encode a diff stream between two equal-length image files, writing the
/// stream to `delta_path`.
///
/// With `verify` set, the freshly written stream is decoded back against
/// the reference and compared byte-for-byte with the target; any mismatch
/// is reported as an error rather than ignored.
pub fn encode_file(
    reference_path: &Path,
    target_path: &Path,
    delta_path: &Path,
    verify: bool,
) -> Result<EncodeStats, IoError> {
    let reference = std::fs::read(reference_path)?;
    let target = std::fs::read(target_path)?;

    let summary = delta::encode_summary(&reference, &target)?;
    std::fs::write(delta_path, &summary.stream)?;

    if verify {
        let decoded = delta::decode(&reference, &summary.stream)?;
        if decoded.len() != target.len() {
            return Err(IoError::VerifyLength {
                produced: decoded.len(),
                expected: target.len(),
            });
        }
        if let Some(offset) = decoded.iter().zip(&target).position(|(a, b)| a != b) {
            return Err(IoError::VerifyMismatch { offset });
        }
    }

    Ok(EncodeStats {
        reference_size: reference.len() as u64,
        target_size: target.len() as u64,
        delta_size: summary.stream.len() as u64,
        tokens: summary.tokens,
        verified: verify,
        reference_sha256: sha256(&reference),
        target_sha256: sha256(&target),
    })
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Decode a diff stream file against a reference image file, writing the
/// reconstructed target to `output_path`.
pub fn decode_file(
    reference_path: &Path,
    delta_path: &Path,
    output_path: &Path,
) -> Result<DecodeStats, IoError> {
    let reference = std::fs::read(reference_path)?;
    let stream = std::fs::read(delta_path)?;

    let output = delta::decode(&reference, &stream)?;
    std::fs::write(output_path, &output)?;

    let tokens = delta::TokenIterator::new(&stream)
        .filter(|t| t.is_ok())
        .count() as u64;

    Ok(DecodeStats {
        reference_size: reference.len() as u64,
        delta_size: stream.len() as u64,
        output_size: output.len() as u64,
        tokens,
        output_sha256: sha256(&output),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
