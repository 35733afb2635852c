//! Per-session message authentication for an SMB/CIFS client stack.
//!
//! This crate is the signing subsystem of the client: it derives a MAC
//! signing key from session credentials, stamps a monotonically increasing
//! sequence number into each outgoing request, computes the keyed MD5 MAC
//! over the message, and verifies the MAC on each incoming response.
//!
//! Transport, full wire encoding, and the authentication handshake that
//! produces the raw key material are external collaborators; the handshake
//! is consumed through [`smb::key::SessionKeyMaterial`].

pub mod config;
pub mod exec;
pub mod smb;

pub use config::SigningConfig;
pub use exec::{ExecutorProfile, WorkManager};
pub use smb::message::{Command, Request, Response, SplitPayload};
pub use smb::session::SessionSigning;
pub use smb::signing::SigningContext;
