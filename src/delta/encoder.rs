// Stream assembler and top-level encoder entry points.
//
// Builds the cost table, then walks the chosen-transition chain from
// offset 0, concatenating rendered tokens into the linear diff stream.
// A transition that fails to advance or lands past the end of the target
// is a cost-model defect; it aborts the encode rather than corrupting the
// stream.

use log::debug;

use super::cost::CostTable;
use super::token::MAX_IMAGE_LEN;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Reference and target images must have the same length.
    LengthMismatch { reference: usize, target: usize },
    /// The 17-bit address space caps images at 128 KiB.
    ImageTooLarge { len: usize, max: usize },
    /// Cost-model defect: a transition that does not advance.
    BackwardTransition { offset: usize, next: usize },
    /// Cost-model defect: a transition past the end of the target.
    TransitionOutOfBounds { offset: usize, next: usize },
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LengthMismatch { reference, target } => write!(
                f,
                "image length mismatch: reference is {reference} bytes, target is {target}"
            ),
            Self::ImageTooLarge { len, max } => {
                write!(f, "image of {len} bytes exceeds the {max}-byte address space")
            }
            Self::BackwardTransition { offset, next } => write!(
                f,
                "offset {offset:#07x} points to non-forward position {next:#07x}"
            ),
            Self::TransitionOutOfBounds { offset, next } => write!(
                f,
                "offset {offset:#07x} points to out-of-bounds position {next:#07x}"
            ),
        }
    }
}

impl std::error::Error for EncodeError {}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Diff stream plus assembly counters.
#[derive(Debug, Clone)]
pub struct EncodeSummary {
    /// The on-the-wire diff stream.
    pub stream: Vec<u8>,
    /// Number of tokens in the stream.
    pub tokens: u64,
}

/// Encode the diff stream that turns `reference` into `target`.
///
/// Both buffers must have the same length, at most 128 KiB (the reach of
/// the 17-bit token address).
pub fn encode(reference: &[u8], target: &[u8]) -> Result<Vec<u8>, EncodeError> {
    encode_summary(reference, target).map(|s| s.stream)
}

/// Like [`encode`], also reporting the token count.
pub fn encode_summary(reference: &[u8], target: &[u8]) -> Result<EncodeSummary, EncodeError> {
    if reference.len() != target.len() {
        return Err(EncodeError::LengthMismatch {
            reference: reference.len(),
            target: target.len(),
        });
    }
    if target.len() > MAX_IMAGE_LEN {
        return Err(EncodeError::ImageTooLarge {
            len: target.len(),
            max: MAX_IMAGE_LEN,
        });
    }

    let table = CostTable::build(reference, target);
    debug!("predicted stream size: {} bytes", table.stream_len());
    assemble(&table)
}

/// Walk the transition chain from offset 0, appending each chosen token.
fn assemble(table: &CostTable) -> Result<EncodeSummary, EncodeError> {
    let n = table.len();
    let mut stream = Vec::with_capacity(table.stream_len());
    let mut tokens = 0u64;

    let mut offset = 0;
    while offset < n {
        let next = table.next(offset);
        if next > n {
            return Err(EncodeError::TransitionOutOfBounds { offset, next });
        }
        if next <= offset {
            return Err(EncodeError::BackwardTransition { offset, next });
        }
        stream.extend_from_slice(table.token_bytes(offset));
        offset = next;
        tokens += 1;
    }

    debug_assert_eq!(stream.len(), table.stream_len());
    debug!("assembled {tokens} tokens, {} stream bytes", stream.len());
    Ok(EncodeSummary { stream, tokens })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
