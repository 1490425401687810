// Diff stream decoder.
//
// Replays a token stream against the reference image, one token per step,
// with a cursor into the output buffer. The stream carries no explicit
// length; the decoder runs until the stream is exhausted and then checks
// that the cursor landed exactly on the image length. Under-consumption
// (stream ran out early) and over-consumption (a token would write past
// the image end) are distinct errors since they point at different
// encoder/decoder mismatches.

use log::debug;

use super::token::{Token, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream ended inside a token.
    Truncated {
        stream_pos: usize,
        needed: usize,
        available: usize,
    },
    /// A token would write past the end of the output image.
    OutputOverrun {
        output_pos: usize,
        token_len: usize,
        output_len: usize,
    },
    /// The stream was exhausted before the output image was filled.
    OutputUnderfilled { produced: usize, expected: usize },
    /// A match token reads past the end of the reference image.
    CopyOutOfRange {
        addr: usize,
        len: usize,
        reference_len: usize,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated {
                stream_pos,
                needed,
                available,
            } => write!(
                f,
                "truncated stream at byte {stream_pos}: token needs {needed} bytes, \
                 {available} available"
            ),
            Self::OutputOverrun {
                output_pos,
                token_len,
                output_len,
            } => write!(
                f,
                "token of {token_len} bytes at output offset {output_pos:#07x} would write \
                 past the {output_len}-byte image"
            ),
            Self::OutputUnderfilled { produced, expected } => write!(
                f,
                "stream exhausted after {produced} of {expected} output bytes"
            ),
            Self::CopyOutOfRange {
                addr,
                len,
                reference_len,
            } => write!(
                f,
                "copy of {len} bytes from address {addr:#07x} exceeds the \
                 {reference_len}-byte reference"
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Token iterator
// ---------------------------------------------------------------------------

/// Walks a diff stream token by token without applying it.
///
/// Yields `(stream_pos, token)` pairs. Used by the CLI listing command and
/// by tests that inspect stream structure directly.
pub struct TokenIterator<'a> {
    stream: &'a [u8],
    pos: usize,
}

impl<'a> TokenIterator<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream, pos: 0 }
    }
}

impl Iterator for TokenIterator<'_> {
    type Item = Result<(usize, Token), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.stream.len() {
            return None;
        }
        let at = self.pos;
        match Token::parse(&self.stream[at..]) {
            Ok((token, consumed)) => {
                self.pos += consumed;
                Some(Ok((at, token)))
            }
            Err(TokenError::Truncated { needed, available }) => {
                self.pos = self.stream.len();
                Some(Err(DecodeError::Truncated {
                    stream_pos: at,
                    needed,
                    available,
                }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Reconstruct the target image by replaying `stream` against `reference`.
///
/// The output has exactly the reference's length; anything else is an
/// error, never a silently short buffer.
pub fn decode(reference: &[u8], stream: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let n = reference.len();
    let mut output = Vec::with_capacity(n);

    for item in TokenIterator::new(stream) {
        let (_, token) = item?;
        apply(reference, &token, &mut output, n)?;
    }

    if output.len() != n {
        return Err(DecodeError::OutputUnderfilled {
            produced: output.len(),
            expected: n,
        });
    }
    debug!("decoded {} bytes from {} stream bytes", n, stream.len());
    Ok(output)
}

/// Apply one token at the current output cursor.
fn apply(
    reference: &[u8],
    token: &Token,
    output: &mut Vec<u8>,
    n: usize,
) -> Result<(), DecodeError> {
    let offset = output.len();
    let tlen = token.target_len();
    if offset + tlen > n {
        return Err(DecodeError::OutputOverrun {
            output_pos: offset,
            token_len: tlen,
            output_len: n,
        });
    }

    match token {
        Token::Literal1(p) => {
            output.push(reference[offset] ^ p);
        }
        Token::Literal2(p0, p1) => {
            output.push(reference[offset] ^ p0);
            output.push(reference[offset + 1] ^ p1);
        }
        Token::Exact { len, addr } => {
            check_copy(reference, *addr, *len)?;
            output.extend_from_slice(&reference[*addr..addr + len]);
        }
        Token::Approx {
            len,
            addr,
            bitmap,
            patches,
        } => {
            check_copy(reference, *addr, *len)?;
            output.extend_from_slice(&reference[*addr..addr + len]);
            // Patch bytes pair with set bitmap bits in ascending bit order.
            let mut patch = patches.iter();
            for i in 0..*len {
                if bitmap[i >> 3] & (1 << (i & 7)) != 0
                    && let Some(p) = patch.next()
                {
                    output[offset + i] ^= p;
                }
            }
        }
    }
    Ok(())
}

#[inline]
fn check_copy(reference: &[u8], addr: usize, len: usize) -> Result<(), DecodeError> {
    if addr + len > reference.len() {
        Err(DecodeError::CopyOutOfRange {
            addr,
            len,
            reference_len: reference.len(),
        })
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
