//! Message model seen by the signing subsystem.
//!
//! The subsystem never owns full message encoding; it sees a caller-owned
//! byte buffer plus the header metadata it needs: the command kind, the
//! declared length, the mutable sequence field, and the verification flag.
//! Wire-format constants for the signature field live here with the model.

/// Byte offset of the security signature field from the start of the header.
pub const SIGNATURE_OFFSET: usize = 14;

/// Length in bytes of the security signature field.
pub const SIGNATURE_LENGTH: usize = 8;

/// Command kinds the signing subsystem distinguishes.
///
/// Only [`Command::ReadAndX`] changes behavior (its response streams the
/// data section into a separate buffer); the rest are carried for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Negotiate = 0x72,
    SessionSetupAndX = 0x73,
    TreeConnectAndX = 0x75,
    Echo = 0x2B,
    ReadAndX = 0x2E,
    WriteAndX = 0x2F,
}

impl Command {
    /// Wire code of the command.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Outgoing request metadata.
#[derive(Debug, Clone)]
pub struct Request {
    pub command: Command,
    /// Sequence number assigned by the signer (always even).
    pub sign_seq: u32,
}

impl Request {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            sign_seq: 0,
        }
    }
}

/// Payload delivered apart from the header buffer.
///
/// Read responses stream their data section directly into a caller buffer
/// for efficiency; the MAC still covers header and payload as one logical
/// byte sequence.
#[derive(Debug, Clone)]
pub struct SplitPayload {
    pub buf: Vec<u8>,
    pub off: usize,
    pub len: usize,
}

/// Incoming response metadata.
#[derive(Debug, Clone)]
pub struct Response {
    pub command: Command,
    /// Expected sequence number, assigned when the paired request was
    /// signed (always the request's sequence + 1).
    pub sign_seq: u32,
    /// Set by verification when the received MAC did not match.
    pub verify_failed: bool,
    /// Declared total length of the message in bytes, header included.
    pub length: usize,
    /// Data section delivered out-of-band from the header buffer.
    pub payload: Option<SplitPayload>,
}

impl Response {
    pub fn new(command: Command, length: usize) -> Self {
        Self {
            command,
            sign_seq: 0,
            verify_failed: false,
            length,
            payload: None,
        }
    }

    /// Attach a split payload (read responses).
    pub fn with_payload(mut self, payload: SplitPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Length of the out-of-band data section, zero when none is attached.
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, |p| p.len)
    }
}
