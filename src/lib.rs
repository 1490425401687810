//! Romdelta: delta codec for fixed-size ROM images.
//!
//! Given a reference image and a target image of equal length, the encoder
//! produces a compact token stream (exact matches, approximate matches
//! with per-byte bitmap patching, and XOR literal fallbacks) that
//! reconstructs the target from the reference. The crate provides:
//! - The codec itself (`delta`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use romdelta::delta;
//!
//! let reference = b"firmware v1 firmware v1!";
//! let target    = b"firmware v2 firmware v2!";
//!
//! let stream = delta::encode(reference, target).unwrap();
//! let decoded = delta::decode(reference, &stream).unwrap();
//! assert_eq!(decoded, target);
//! ```

pub mod delta;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;
