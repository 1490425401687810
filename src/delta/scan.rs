// Match scanner.
//
// For one target offset, walks every candidate reference address and
// reports:
//   1. The best exact run (longest common prefix, capped at 64 bytes),
//      ties kept at the lowest address for reproducible output.
//   2. Every approximate extension of a partial run, as (addr, len, diffs)
//      candidates for the cost model to adopt or reject.
//
// The scan is exhaustive over the reference — O(N) per offset, O(N^2)
// total. That favors optimal streams over throughput, which is the right
// trade at the tens-of-kilobytes image sizes this codec targets.

use super::token::{self, MAX_APPROX_LEN};

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// Best exact run found for one target offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactRun {
    /// Run length in bytes (0 if nothing matches).
    pub len: usize,
    /// Reference address of the run (lowest address on ties).
    pub addr: usize,
}

/// One approximate-match candidate: cover `len` bytes from
/// `reference[addr..]` with `diffs` patched positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproxCandidate {
    pub addr: usize,
    pub len: usize,
    pub diffs: usize,
    /// Encoded stream size of the token (header + bitmap + patches).
    pub encoded_len: usize,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// Length of the common prefix of `target[i..]` and `reference[j..]`,
/// capped at `MAX_APPROX_LEN` and bounded by both buffers.
#[inline]
fn run_length(reference: &[u8], target: &[u8], i: usize, j: usize) -> usize {
    let max = MAX_APPROX_LEN
        .min(target.len() - i)
        .min(reference.len() - j);
    let t = &target[i..i + max];
    let r = &reference[j..j + max];
    t.iter().zip(r).take_while(|(a, b)| a == b).count()
}

/// Scan every reference address for target offset `i`.
///
/// Calls `candidate` for each approximate extension of each partial run;
/// the caller decides adoption against its cost table. Returns the best
/// exact run. Once a full 64-byte run is found the scan stops early (no
/// longer run exists), skipping approximate evaluation for that address.
pub fn scan_offset<F>(
    reference: &[u8],
    target: &[u8],
    i: usize,
    mut candidate: F,
) -> ExactRun
where
    F: FnMut(ApproxCandidate),
{
    let n = target.len();
    let mut best = ExactRun { len: 0, addr: 0 };

    for j in 0..reference.len() {
        let run = run_length(reference, target, i, j);
        if run > best.len {
            best = ExactRun { len: run, addr: j };
            if run == MAX_APPROX_LEN {
                break;
            }
        }

        if run == 0 {
            continue;
        }

        // Approximate extensions: cover length k >= run from this address,
        // patching every mismatching byte.
        let mut diffs = 0usize;
        for k in run..=MAX_APPROX_LEN {
            if i + k > n || j + k > reference.len() {
                break;
            }
            candidate(ApproxCandidate {
                addr: j,
                len: k,
                diffs,
                encoded_len: token::approx_encoded_len(k, diffs),
            });
            // Mismatch count for the next covered length.
            if k < MAX_APPROX_LEN
                && i + k < n
                && j + k < reference.len()
                && target[i + k] != reference[j + k]
            {
                diffs += 1;
            }
        }
    }

    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
