//! Per-session MAC signing and verification.
//!
//! A [`SigningContext`] is created once per session when authentication
//! completes and is mutated by every sign and verify call. Calls for one
//! session must be serialized, since interleaving would corrupt the digest
//! accumulation and the sequence ordering; [`crate::smb::session`] provides
//! the guarded handle. Independent sessions share nothing.

use crate::smb::digest::MacDigest;
use crate::smb::key::{
    EXTENDED_KEY_LENGTH, SESSION_KEY_LENGTH, SessionKeyMaterial, derive_signing_key,
};
use crate::smb::message::{Command, Request, Response, SIGNATURE_LENGTH, SIGNATURE_OFFSET};
use anyhow::{Result, bail};
use std::fmt;
use tracing::{debug, error, warn};

/// Sentinel written instead of a real MAC for the single message signed in
/// bypass mode (the unauthenticated negotiate exchange).
pub const BYPASS_SENTINEL: &[u8; SIGNATURE_LENGTH] = b"BSRSPYL ";

/// Per-session signing state: MAC key, digest accumulator, sequence
/// counter, and the one-shot bypass flag.
pub struct SigningContext {
    mac_signing_key: Vec<u8>,
    digest: MacDigest,
    sign_sequence: u32,
    bypass: bool,
}

impl SigningContext {
    /// Build a context around an already-derived MAC signing key.
    ///
    /// The key must be 16 or 40 bytes; anything else is malformed material
    /// and must abort session establishment.
    pub fn new(mac_signing_key: Vec<u8>, bypass: bool) -> Result<Self> {
        if mac_signing_key.len() != SESSION_KEY_LENGTH
            && mac_signing_key.len() != EXTENDED_KEY_LENGTH
        {
            bail!(
                "invalid mac signing key length: {} (expected {} or {})",
                mac_signing_key.len(),
                SESSION_KEY_LENGTH,
                EXTENDED_KEY_LENGTH
            );
        }
        debug!(key = %hex::encode(&mac_signing_key), "mac signing key installed");
        Ok(Self {
            mac_signing_key,
            digest: MacDigest::new(),
            sign_sequence: 0,
            bypass,
        })
    }

    /// Derive the signing key for `level` from `material` and build a
    /// context around it.
    pub fn negotiate(
        material: &dyn SessionKeyMaterial,
        challenge: &[u8],
        level: u32,
        bypass: bool,
    ) -> Result<Self> {
        let key = derive_signing_key(material, challenge, level)?;
        Self::new(key, bypass)
    }

    /// Current counter value, i.e. the sequence the next request receives.
    pub fn sign_sequence(&self) -> u32 {
        self.sign_sequence
    }

    /// Whether the next sign call writes the bypass sentinel.
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// MAC-sign the message in `data[offset..offset + length]`.
    ///
    /// Assigns the current sequence to the request and, when a response is
    /// expected, sequence + 1 to it. The signature field is zeroed, the
    /// sequence stamped little-endian into its first four bytes, and the
    /// first eight bytes of MD5(key || message) written over it.
    ///
    /// An internal failure is logged and swallowed, and the counter still
    /// advances by two: skipping the advance would desynchronize the
    /// sequence stream shared with the server for the rest of the session.
    pub fn sign(
        &mut self,
        data: &mut [u8],
        offset: usize,
        length: usize,
        request: &mut Request,
        mut response: Option<&mut Response>,
    ) {
        request.sign_seq = self.sign_sequence;
        if let Some(response) = response.as_deref_mut() {
            response.sign_seq = self.sign_sequence + 1;
            response.verify_failed = false;
        }

        if let Err(e) = self.sign_in_place(data, offset, length) {
            error!(command = ?request.command, error = %e, "message signing failed");
        }
        self.sign_sequence += 2;
    }

    fn sign_in_place(&mut self, data: &mut [u8], offset: usize, length: usize) -> Result<()> {
        if offset + length > data.len() {
            bail!(
                "message range {}..{} exceeds buffer of {} bytes",
                offset,
                offset + length,
                data.len()
            );
        }
        if length < SIGNATURE_OFFSET + SIGNATURE_LENGTH {
            bail!("message of {length} bytes cannot carry a signature");
        }

        let sig_start = offset + SIGNATURE_OFFSET;
        let sig_end = sig_start + SIGNATURE_LENGTH;

        self.digest.update(&self.mac_signing_key);
        // Stale bytes must never enter the signed region: zero the whole
        // field, then stamp the sequence over its first four bytes.
        data[sig_start..sig_end].fill(0);
        data[sig_start..sig_start + 4].copy_from_slice(&self.sign_sequence.to_le_bytes());
        self.digest.update(&data[offset..offset + length]);
        let mac = self.digest.finalize();
        data[sig_start..sig_end].copy_from_slice(&mac[..SIGNATURE_LENGTH]);

        if self.bypass {
            self.bypass = false;
            data[sig_start..sig_end].copy_from_slice(BYPASS_SENTINEL);
        }
        Ok(())
    }

    /// Recompute and compare the MAC of a received message.
    ///
    /// Returns `true` when verification FAILED; the outcome is also
    /// recorded in `response.verify_failed`. Rejection policy stays with
    /// the caller. The expected sequence number is fed into the digest in
    /// place of the signature field, so the received buffer itself is
    /// never modified. A malformed frame (declared lengths outside the
    /// buffer) is reported as a verification failure rather than a panic.
    pub fn verify(&mut self, data: &[u8], offset: usize, response: &mut Response) -> bool {
        match self.expected_mac(data, offset, response) {
            Ok(expected) => {
                let received = &data[offset + SIGNATURE_OFFSET..][..SIGNATURE_LENGTH];
                if expected[..SIGNATURE_LENGTH] != *received {
                    warn!(
                        command = ?response.command,
                        sign_seq = response.sign_seq,
                        expected = %hex::encode(&expected[..SIGNATURE_LENGTH]),
                        received = %hex::encode(received),
                        "signature verification failure"
                    );
                    response.verify_failed = true;
                } else {
                    response.verify_failed = false;
                }
            }
            Err(e) => {
                warn!(
                    command = ?response.command,
                    sign_seq = response.sign_seq,
                    error = %e,
                    "rejecting malformed frame during signature verification"
                );
                response.verify_failed = true;
            }
        }
        response.verify_failed
    }

    /// Recompute the MAC the peer should have produced for `response`.
    ///
    /// All range checks happen before the first digest update, so an error
    /// return leaves the accumulator clean for the next cycle.
    fn expected_mac(&mut self, data: &[u8], offset: usize, response: &Response) -> Result<[u8; 16]> {
        let declared = response.length;

        // Split-body read responses stream the data section into a
        // separate buffer; only the metadata portion lives in `data`.
        let payload = match response.command {
            Command::ReadAndX => response.payload.as_ref(),
            _ => None,
        };
        let payload_len = payload.map_or(0, |p| p.len);

        let Some(in_buffer) = declared.checked_sub(payload_len) else {
            bail!("payload of {payload_len} bytes exceeds declared length {declared}");
        };
        if in_buffer < SIGNATURE_OFFSET + SIGNATURE_LENGTH {
            bail!("declared header of {in_buffer} bytes cannot carry a signature");
        }
        let body_start = offset + SIGNATURE_OFFSET + SIGNATURE_LENGTH;
        let body_len = in_buffer - SIGNATURE_OFFSET - SIGNATURE_LENGTH;
        // The declared length and payload ranges come off the wire; checked
        // arithmetic keeps a hostile frame from panicking the session.
        let body_in_range = body_start
            .checked_add(body_len)
            .is_some_and(|end| end <= data.len());
        if !body_in_range {
            bail!(
                "declared length {declared} extends past buffer of {} bytes",
                data.len()
            );
        }
        if let Some(p) = payload {
            let payload_in_range = p.off.checked_add(p.len).is_some_and(|end| end <= p.buf.len());
            if !payload_in_range {
                bail!(
                    "payload range at offset {} for {} bytes exceeds side buffer of {} bytes",
                    p.off,
                    p.len,
                    p.buf.len()
                );
            }
        }

        self.digest.update(&self.mac_signing_key);
        self.digest.update(&data[offset..offset + SIGNATURE_OFFSET]);

        // Mirror of the signer's zeroed-then-stamped field, built in a
        // scratch buffer so the received bytes stay untouched.
        let mut sequence = [0u8; SIGNATURE_LENGTH];
        sequence[..4].copy_from_slice(&response.sign_seq.to_le_bytes());
        self.digest.update(&sequence);

        self.digest.update(&data[body_start..body_start + body_len]);
        if let Some(p) = payload {
            self.digest.update(&p.buf[p.off..p.off + p.len]);
        }

        Ok(self.digest.finalize())
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("key_len", &self.mac_signing_key.len())
            .field("sign_sequence", &self.sign_sequence)
            .field("bypass", &self.bypass)
            .finish()
    }
}
