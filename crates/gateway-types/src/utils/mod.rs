//! Utility functions for digest encoding and log formatting.
//!
//! The digest helpers reproduce the commitment the operator signs off-band:
//! an ABI-encoded domain separator, a tightly packed order hash, and the
//! `0x1901` envelope that combines them.

pub mod digest;
pub mod formatting;

pub use digest::{compute_domain_separator, compute_final_digest, AbiWordEncoder, PackedEncoder};
pub use formatting::truncate_id;
