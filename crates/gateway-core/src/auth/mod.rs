//! Order authentication: the digest an operator signs and the check that a
//! signature over it came from the operator.

pub mod digest;
pub mod signature;

pub use digest::DigestBuilder;
pub use signature::SignatureVerifier;
