// ROM delta codec: token wire format, match search, DP cost model, and
// the stream assembler/decoder pair.
//
// # Modules
//
// - `token`   — token alphabet, tag arithmetic, per-token encode/parse
// - `scan`    — exhaustive match scanner (exact runs + approximate candidates)
// - `cost`    — backward dynamic-programming cost/transition/token tables
// - `encoder` — stream assembly and top-level `encode()`
// - `decoder` — stream replay and top-level `decode()`

pub mod cost;
pub mod decoder;
pub mod encoder;
pub mod scan;
pub mod token;

// Re-export key types for convenience.
pub use cost::CostTable;
pub use decoder::{DecodeError, TokenIterator, decode};
pub use encoder::{EncodeError, EncodeSummary, encode, encode_summary};
pub use token::{MAX_APPROX_LEN, MAX_EXACT_LEN, MAX_IMAGE_LEN, Token, TokenError};
