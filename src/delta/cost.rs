// Cost model: dynamic-programming table over target offsets.
//
// Working backwards from the end of the target, `costs[i]` is the minimum
// number of stream bytes needed to encode the suffix `target[i..]`.
// Every offset is seeded with the single-byte XOR literal fallback, then
// approximate and exact match candidates from the scanner overwrite it
// when strictly cheaper. `next_pos[i]` records the transition the winner
// takes and `tokens[i]` its rendered byte encoding, so stream assembly is
// a plain walk of the chain.
//
// Tie-break policy (load-bearing for reproducible output): a candidate is
// adopted only when strictly cheaper, approximate candidates are evaluated
// before exact ones at each offset, and the scanner reports match
// addresses lowest-first.

use log::debug;

use super::scan::{self, ApproxCandidate};
use super::token::{self, MATCH_HEADER_SIZE, MAX_EXACT_LEN, Token};

// ---------------------------------------------------------------------------
// CostTable
// ---------------------------------------------------------------------------

/// Fully populated cost/transition/token tables for one (reference, target)
/// pair. Built once, consumed once by the stream assembler.
pub struct CostTable {
    /// `costs[i]`: minimal encoded size of `target[i..]`. Has `n + 1`
    /// entries with the true base case `costs[n] = 0`.
    costs: Vec<usize>,
    /// `next_pos[i]`: offset reached by applying the chosen token at `i`.
    next_pos: Vec<usize>,
    /// `tokens[i]`: rendered byte encoding of the chosen token at `i`.
    tokens: Vec<Vec<u8>>,
}

impl CostTable {
    /// Run the backward DP over every target offset.
    ///
    /// `reference` and `target` must have equal length (validated by the
    /// encoder entry point); the tables cover offsets `0..target.len()`.
    pub fn build(reference: &[u8], target: &[u8]) -> Self {
        let n = target.len();
        let mut table = CostTable {
            costs: vec![0; n + 1],
            next_pos: vec![0; n],
            tokens: vec![Vec::new(); n],
        };

        for i in (0..n).rev() {
            table.seed_literal(reference, target, i);
            table.consider_matches(reference, target, i);
        }

        table
    }

    /// Number of target offsets covered.
    pub fn len(&self) -> usize {
        self.next_pos.len()
    }

    /// Whether the table covers an empty target.
    pub fn is_empty(&self) -> bool {
        self.next_pos.is_empty()
    }

    /// Minimal encoded size of the suffix `target[i..]`.
    pub fn cost(&self, i: usize) -> usize {
        self.costs[i]
    }

    /// Total size of the assembled diff stream.
    pub fn stream_len(&self) -> usize {
        self.costs.first().copied().unwrap_or(0)
    }

    /// Transition taken by the chosen token at offset `i`.
    pub fn next(&self, i: usize) -> usize {
        self.next_pos[i]
    }

    /// Rendered bytes of the chosen token at offset `i`.
    pub fn token_bytes(&self, i: usize) -> &[u8] {
        &self.tokens[i]
    }

    /// Literal fallback: always valid, always seeds the offset.
    fn seed_literal(&mut self, reference: &[u8], target: &[u8], i: usize) {
        self.costs[i] = self.costs[i + 1] + token::LITERAL1_SIZE;
        self.next_pos[i] = i + 1;
        let mut buf = Vec::with_capacity(token::LITERAL1_SIZE);
        Token::Literal1(reference[i] ^ target[i]).encode_into(&mut buf);
        self.tokens[i] = buf;
    }

    /// Evaluate scanner candidates for offset `i`, adopting any that is
    /// strictly cheaper than the current choice.
    fn consider_matches(&mut self, reference: &[u8], target: &[u8], i: usize) {
        // Split borrows: the scanner closure reads costs while tokens and
        // next_pos are rewritten on adoption.
        let costs = &mut self.costs;
        let next_pos = &mut self.next_pos;
        let tokens = &mut self.tokens;

        let best = scan::scan_offset(reference, target, i, |c: ApproxCandidate| {
            let total = c.encoded_len + costs[i + c.len];
            if total < costs[i] {
                debug!(
                    "${i:05x} -> ${:05x}: approx len={} diffs={} cost={} (was {})",
                    i + c.len,
                    c.len,
                    c.diffs,
                    total,
                    costs[i]
                );
                costs[i] = total;
                next_pos[i] = i + c.len;
                tokens[i] = render_approx(reference, target, i, &c);
            }
        });

        for len in 1..=best.len.min(MAX_EXACT_LEN) {
            let total = costs[i + len] + MATCH_HEADER_SIZE;
            if total < costs[i] {
                debug!(
                    "${i:05x} -> ${:05x}: exact len={len} addr=${:05x} cost={total} (was {})",
                    i + len,
                    best.addr,
                    costs[i]
                );
                costs[i] = total;
                next_pos[i] = i + len;
                let mut buf = Vec::with_capacity(MATCH_HEADER_SIZE);
                Token::Exact {
                    len,
                    addr: best.addr,
                }
                .encode_into(&mut buf);
                tokens[i] = buf;
            }
        }
    }
}

/// Render an adopted approximate candidate: bitmap bit + XOR patch byte
/// for every mismatching position in the covered window.
fn render_approx(
    reference: &[u8],
    target: &[u8],
    i: usize,
    c: &ApproxCandidate,
) -> Vec<u8> {
    let mut bitmap = vec![0u8; token::bitmap_len(c.len)];
    let mut patches = Vec::with_capacity(c.diffs);
    for p in 0..c.len {
        let r = reference[c.addr + p];
        let t = target[i + p];
        if r != t {
            bitmap[p >> 3] |= 1 << (p & 7);
            patches.push(r ^ t);
        }
    }
    debug_assert_eq!(patches.len(), c.diffs);

    let mut buf = Vec::with_capacity(c.encoded_len);
    Token::Approx {
        len: c.len,
        addr: c.addr,
        bitmap,
        patches,
    }
    .encode_into(&mut buf);
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
