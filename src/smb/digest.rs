//! Incremental MD5 accumulator for MAC computation.
//!
//! The legacy dialect mandates MD5 for message signing; interoperability
//! leaves no choice of algorithm here.

use md5::{Digest, Md5};
use tracing::trace;

/// Largest number of update bytes rendered into a trace line.
const TRACE_BYTES: usize = 256;

/// MD5 accumulator with an update counter and zero-length filtering.
///
/// One accumulation cycle is: any number of [`update`](Self::update) calls
/// followed by one [`finalize`](Self::finalize). Finalizing resets both
/// the hash state and the update counter, so a single instance serves a
/// whole session of sign/verify cycles.
pub struct MacDigest {
    inner: Md5,
    updates: u32,
}

impl MacDigest {
    pub fn new() -> Self {
        Self {
            inner: Md5::new(),
            updates: 0,
        }
    }

    /// Accumulate `data` into the running hash.
    ///
    /// Empty input is ignored entirely: no hash mutation, no counter bump,
    /// no trace line.
    pub fn update(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        trace!(
            update = self.updates,
            len = data.len(),
            bytes = %hex::encode(&data[..data.len().min(TRACE_BYTES)]),
            "mac digest update"
        );
        self.inner.update(data);
        self.updates += 1;
    }

    /// Finalize the current cycle and return the 16-byte MD5.
    ///
    /// Resets the update counter to zero; the hash state restarts with the
    /// finalize itself, so the next `update` begins a fresh cycle.
    pub fn finalize(&mut self) -> [u8; 16] {
        let out = self.inner.finalize_reset();
        self.updates = 0;
        trace!(digest = %hex::encode(&out), "mac digest finalized");
        out.into()
    }

    /// Non-empty updates accumulated since the last finalize.
    pub fn updates(&self) -> u32 {
        self.updates
    }
}

impl Default for MacDigest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_noop() {
        let mut reference = MacDigest::new();
        reference.update(b"hello");
        reference.update(b" world");
        let expected = reference.finalize();

        let mut with_empty = MacDigest::new();
        with_empty.update(b"hello");
        with_empty.update(&[]);
        with_empty.update(b" world");
        with_empty.update(&[]);
        assert_eq!(with_empty.finalize(), expected);
    }

    #[test]
    fn test_empty_update_does_not_count() {
        let mut digest = MacDigest::new();
        digest.update(&[]);
        assert_eq!(digest.updates(), 0);
        digest.update(b"x");
        digest.update(&[]);
        assert_eq!(digest.updates(), 1);
    }

    #[test]
    fn test_finalize_resets_counter_and_state() {
        let mut digest = MacDigest::new();
        digest.update(b"first cycle");
        let first = digest.finalize();
        assert_eq!(digest.updates(), 0);

        // A second identical cycle on the same instance must reproduce the
        // same value: the finalize fully reset the hash state.
        digest.update(b"first cycle");
        assert_eq!(digest.finalize(), first);
    }

    #[test]
    fn test_known_md5() {
        let mut digest = MacDigest::new();
        digest.update(b"abc");
        assert_eq!(
            hex::encode(digest.finalize()),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
