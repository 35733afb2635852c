//! Session message authentication for the client protocol stack.
//!
//! Provides:
//! - MAC signing-key derivation selected by compatibility level
//! - Incremental MD5 MAC accumulation with zero-length-update filtering
//! - Request signing with paired even/odd sequence numbers
//! - Response verification, including split-body read responses
//! - Serialized per-session access to the signing state

pub mod digest;
pub mod key;
pub mod message;
pub mod session;
pub mod signing;
