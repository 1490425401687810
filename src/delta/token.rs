// Token alphabet and byte-level wire format.
//
// One token is one self-describing unit of the diff stream:
//
//   $00 $pp                                  single XOR literal byte
//   $01 $pp $pp                              two XOR literal bytes
//   $02-$7F $lo $mid                         exact match, 1-63 bytes
//   $80-$FF $lo $mid <bitmap> <patches>      approximate match, 1-64 bytes
//
// Match tags pack the length and the top bit of a 17-bit reference address:
// `tag = base + ((len - 1) << 1) + hi`, so the decode arithmetic
// `len = ((tag - base) >> 1) + 1`, `hi = (tag - base) & 1` is its exact
// inverse. The approximate bitmap begins immediately after the two address
// bytes, bit `i` at byte `i >> 3`, mask `1 << (i & 7)`; one patch byte per
// set bit, in ascending bit order.

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// Tag for a single XOR literal byte.
pub const TAG_LITERAL1: u8 = 0x00;
/// Tag for a pair of XOR literal bytes.
pub const TAG_LITERAL2: u8 = 0x01;
/// First tag of the exact-match range.
pub const TAG_EXACT_BASE: u8 = 0x02;
/// First tag of the approximate-match range.
pub const TAG_APPROX_BASE: u8 = 0x80;

/// Longest run an exact-match token can cover (bounded by the tag space
/// below `0x80`).
pub const MAX_EXACT_LEN: usize = 63;
/// Longest run an approximate-match token can cover.
pub const MAX_APPROX_LEN: usize = 64;

/// Reference addresses are 17-bit.
pub const MAX_ADDR: usize = 0x1FFFF;
/// Largest image the address space can cover (128 KiB).
pub const MAX_IMAGE_LEN: usize = MAX_ADDR + 1;

/// Encoded size of a single-byte literal (tag + payload).
pub const LITERAL1_SIZE: usize = 2;
/// Encoded size of a match token header (tag + two address bytes).
pub const MATCH_HEADER_SIZE: usize = 3;

/// Bitmap bytes needed to cover `len` positions.
#[inline]
pub const fn bitmap_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// Encoded size of an approximate match of `len` bytes with `diffs`
/// mismatching positions.
#[inline]
pub const fn approx_encoded_len(len: usize, diffs: usize) -> usize {
    MATCH_HEADER_SIZE + bitmap_len(len) + diffs
}

// ---------------------------------------------------------------------------
// Parse error
// ---------------------------------------------------------------------------

/// Error produced when a token cannot be parsed from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The stream ended inside a token.
    Truncated { needed: usize, available: usize },
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(
                    f,
                    "truncated token: needed {needed} bytes, {available} available"
                )
            }
        }
    }
}

impl std::error::Error for TokenError {}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// One decoded unit of the diff stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// One raw XOR-encoded byte.
    Literal1(u8),
    /// Two raw XOR-encoded bytes.
    Literal2(u8, u8),
    /// Copy `len` bytes verbatim from `reference[addr..]`.
    Exact { len: usize, addr: usize },
    /// Copy `len` bytes from `reference[addr..]`, then XOR one patch byte
    /// into each position whose bitmap bit is set.
    Approx {
        len: usize,
        addr: usize,
        bitmap: Vec<u8>,
        patches: Vec<u8>,
    },
}

impl Token {
    /// Number of output bytes this token produces.
    pub fn target_len(&self) -> usize {
        match self {
            Self::Literal1(_) => 1,
            Self::Literal2(..) => 2,
            Self::Exact { len, .. } | Self::Approx { len, .. } => *len,
        }
    }

    /// Number of stream bytes this token occupies.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Literal1(_) => LITERAL1_SIZE,
            Self::Literal2(..) => 3,
            Self::Exact { .. } => MATCH_HEADER_SIZE,
            Self::Approx { bitmap, patches, .. } => {
                MATCH_HEADER_SIZE + bitmap.len() + patches.len()
            }
        }
    }

    /// Append the canonical byte encoding of this token to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Literal1(p) => {
                out.push(TAG_LITERAL1);
                out.push(*p);
            }
            Self::Literal2(p0, p1) => {
                out.push(TAG_LITERAL2);
                out.push(*p0);
                out.push(*p1);
            }
            Self::Exact { len, addr } => {
                debug_assert!((1..=MAX_EXACT_LEN).contains(len));
                debug_assert!(*addr <= MAX_ADDR);
                out.push(TAG_EXACT_BASE + (((len - 1) as u8) << 1) + (addr >> 16) as u8);
                out.push(*addr as u8);
                out.push((addr >> 8) as u8);
            }
            Self::Approx {
                len,
                addr,
                bitmap,
                patches,
            } => {
                debug_assert!((1..=MAX_APPROX_LEN).contains(len));
                debug_assert!(*addr <= MAX_ADDR);
                debug_assert_eq!(bitmap.len(), bitmap_len(*len));
                out.push(TAG_APPROX_BASE + (((len - 1) as u8) << 1) + (addr >> 16) as u8);
                out.push(*addr as u8);
                out.push((addr >> 8) as u8);
                out.extend_from_slice(bitmap);
                out.extend_from_slice(patches);
            }
        }
    }

    /// Parse one token from the front of `input`.
    ///
    /// Returns the token and the number of stream bytes consumed.
    pub fn parse(input: &[u8]) -> Result<(Token, usize), TokenError> {
        let need = |n: usize| -> Result<(), TokenError> {
            if input.len() < n {
                Err(TokenError::Truncated {
                    needed: n,
                    available: input.len(),
                })
            } else {
                Ok(())
            }
        };

        need(1)?;
        let tag = input[0];
        match tag {
            TAG_LITERAL1 => {
                need(2)?;
                Ok((Token::Literal1(input[1]), 2))
            }
            TAG_LITERAL2 => {
                need(3)?;
                Ok((Token::Literal2(input[1], input[2]), 3))
            }
            TAG_EXACT_BASE..TAG_APPROX_BASE => {
                need(MATCH_HEADER_SIZE)?;
                let rel = tag - TAG_EXACT_BASE;
                let len = ((rel >> 1) as usize) + 1;
                let addr = join_addr(rel & 1, input[1], input[2]);
                Ok((Token::Exact { len, addr }, MATCH_HEADER_SIZE))
            }
            _ => {
                need(MATCH_HEADER_SIZE)?;
                let rel = tag - TAG_APPROX_BASE;
                let len = ((rel >> 1) as usize) + 1;
                let addr = join_addr(rel & 1, input[1], input[2]);

                let bm_len = bitmap_len(len);
                need(MATCH_HEADER_SIZE + bm_len)?;
                let bitmap = input[MATCH_HEADER_SIZE..MATCH_HEADER_SIZE + bm_len].to_vec();

                let n_patches: usize =
                    bitmap.iter().map(|b| b.count_ones() as usize).sum();
                let total = MATCH_HEADER_SIZE + bm_len + n_patches;
                need(total)?;
                let patches = input[MATCH_HEADER_SIZE + bm_len..total].to_vec();

                Ok((
                    Token::Approx {
                        len,
                        addr,
                        bitmap,
                        patches,
                    },
                    total,
                ))
            }
        }
    }
}

#[inline]
fn join_addr(hi: u8, lo: u8, mid: u8) -> usize {
    ((hi as usize) << 16) | ((mid as usize) << 8) | lo as usize
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(tok: &Token) -> Token {
        let mut buf = Vec::new();
        tok.encode_into(&mut buf);
        assert_eq!(buf.len(), tok.encoded_len());
        let (parsed, consumed) = Token::parse(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        parsed
    }

    #[test]
    fn literal_roundtrip() {
        assert_eq!(roundtrip(&Token::Literal1(0xAB)), Token::Literal1(0xAB));
        assert_eq!(
            roundtrip(&Token::Literal2(0x12, 0x34)),
            Token::Literal2(0x12, 0x34)
        );
    }

    #[test]
    fn exact_tag_arithmetic_is_invertible_for_all_lengths() {
        // Every (len, address-high-bit) combination the format can express.
        for len in 1..=MAX_EXACT_LEN {
            for addr in [0usize, 0x00FF34, 0x1FFFF] {
                let tok = Token::Exact { len, addr };
                assert_eq!(roundtrip(&tok), tok, "len={len} addr={addr:#x}");
            }
        }
    }

    #[test]
    fn approx_tag_arithmetic_is_invertible_for_all_lengths() {
        for len in 1..=MAX_APPROX_LEN {
            for addr in [0usize, 0x012345, 0x1FFFF] {
                let tok = Token::Approx {
                    len,
                    addr,
                    bitmap: vec![0; bitmap_len(len)],
                    patches: Vec::new(),
                };
                assert_eq!(roundtrip(&tok), tok, "len={len} addr={addr:#x}");
            }
        }
    }

    #[test]
    fn exact_tags_stay_below_approx_range() {
        let mut buf = Vec::new();
        Token::Exact {
            len: MAX_EXACT_LEN,
            addr: MAX_ADDR,
        }
        .encode_into(&mut buf);
        assert_eq!(buf[0], 0x7F);
    }

    #[test]
    fn approx_patch_count_follows_bitmap_popcount() {
        let tok = Token::Approx {
            len: 10,
            addr: 0x100,
            bitmap: vec![0b0100_0001, 0b0000_0010],
            patches: vec![0xAA, 0xBB, 0xCC],
        };
        let got = roundtrip(&tok);
        match got {
            Token::Approx { patches, .. } => assert_eq!(patches, vec![0xAA, 0xBB, 0xCC]),
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn truncated_tokens_are_rejected() {
        assert!(matches!(
            Token::parse(&[TAG_LITERAL1]),
            Err(TokenError::Truncated { .. })
        ));
        assert!(matches!(
            Token::parse(&[TAG_LITERAL2, 0x00]),
            Err(TokenError::Truncated { .. })
        ));
        // Exact header cut after one address byte.
        assert!(matches!(
            Token::parse(&[0x04, 0x00]),
            Err(TokenError::Truncated { .. })
        ));
        // Approx with bitmap promising more patches than the stream holds.
        let mut buf = Vec::new();
        Token::Approx {
            len: 8,
            addr: 0,
            bitmap: vec![0xFF],
            patches: vec![1, 2, 3, 4, 5, 6, 7, 8],
        }
        .encode_into(&mut buf);
        buf.truncate(buf.len() - 2);
        assert!(matches!(
            Token::parse(&buf),
            Err(TokenError::Truncated { .. })
        ));
    }

    #[test]
    fn bitmap_len_rounds_up() {
        assert_eq!(bitmap_len(1), 1);
        assert_eq!(bitmap_len(8), 1);
        assert_eq!(bitmap_len(9), 2);
        assert_eq!(bitmap_len(64), 8);
    }
}
