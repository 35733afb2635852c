//! MAC signing-key derivation from session credentials.
//!
//! The authentication handshake itself is out of scope; it is consumed
//! through [`SessionKeyMaterial`], which yields the raw user session key
//! and the unicode hash for a given server challenge. Derivation failure
//! is fatal: there is no safe signing without a valid key, so the error
//! must abort session establishment.

use anyhow::{Context, Result, bail};
use tracing::debug;

/// Raw user session key length in bytes.
pub const SESSION_KEY_LENGTH: usize = 16;

/// Unicode hash length in bytes.
pub const UNICODE_HASH_LENGTH: usize = 24;

/// Extended signing key length: session key followed by the unicode hash.
pub const EXTENDED_KEY_LENGTH: usize = SESSION_KEY_LENGTH + UNICODE_HASH_LENGTH;

/// Supplier of raw key material from the authentication component.
pub trait SessionKeyMaterial {
    /// 16-byte user session key for the server challenge.
    fn session_key(&self, challenge: &[u8]) -> Result<[u8; SESSION_KEY_LENGTH]>;

    /// 24-byte unicode hash for the server challenge.
    fn unicode_hash(&self, challenge: &[u8]) -> Result<[u8; UNICODE_HASH_LENGTH]>;
}

/// Derive the MAC signing key for a compatibility level.
///
/// Levels 0-2 produce the 40-byte extended key, levels 3-5 the 16-byte
/// session key alone. Any other level is a configuration error rather
/// than a silent fallback.
pub fn derive_signing_key(
    material: &dyn SessionKeyMaterial,
    challenge: &[u8],
    level: u32,
) -> Result<Vec<u8>> {
    let key = match level {
        0..=2 => {
            let mut key = Vec::with_capacity(EXTENDED_KEY_LENGTH);
            key.extend_from_slice(
                &material
                    .session_key(challenge)
                    .context("user session key unavailable")?,
            );
            key.extend_from_slice(
                &material
                    .unicode_hash(challenge)
                    .context("unicode hash unavailable")?,
            );
            key
        }
        3..=5 => material
            .session_key(challenge)
            .context("user session key unavailable")?
            .to_vec(),
        other => bail!("unsupported lm compatibility level: {other}"),
    };

    debug!(level, key = %hex::encode(&key), "derived mac signing key");
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct StubMaterial {
        key: [u8; SESSION_KEY_LENGTH],
        hash: [u8; UNICODE_HASH_LENGTH],
    }

    impl SessionKeyMaterial for StubMaterial {
        fn session_key(&self, _challenge: &[u8]) -> Result<[u8; SESSION_KEY_LENGTH]> {
            Ok(self.key)
        }

        fn unicode_hash(&self, _challenge: &[u8]) -> Result<[u8; UNICODE_HASH_LENGTH]> {
            Ok(self.hash)
        }
    }

    struct FailingMaterial;

    impl SessionKeyMaterial for FailingMaterial {
        fn session_key(&self, _challenge: &[u8]) -> Result<[u8; SESSION_KEY_LENGTH]> {
            Err(anyhow!("credentials missing"))
        }

        fn unicode_hash(&self, _challenge: &[u8]) -> Result<[u8; UNICODE_HASH_LENGTH]> {
            Err(anyhow!("credentials missing"))
        }
    }

    fn stub() -> StubMaterial {
        StubMaterial {
            key: rand::random(),
            hash: [0xA7; UNICODE_HASH_LENGTH],
        }
    }

    #[test]
    fn test_extended_key_for_low_levels() {
        let material = stub();
        for level in 0..=2 {
            let key = derive_signing_key(&material, b"challenge", level).unwrap();
            assert_eq!(key.len(), EXTENDED_KEY_LENGTH);
            assert_eq!(&key[..SESSION_KEY_LENGTH], &material.key);
            assert_eq!(&key[SESSION_KEY_LENGTH..], &material.hash);
        }
    }

    #[test]
    fn test_session_key_only_for_high_levels() {
        let material = stub();
        for level in 3..=5 {
            let key = derive_signing_key(&material, b"challenge", level).unwrap();
            assert_eq!(key, material.key.to_vec());
        }
    }

    #[test]
    fn test_unknown_level_is_config_error() {
        let material = stub();
        assert!(derive_signing_key(&material, b"challenge", 6).is_err());
        assert!(derive_signing_key(&material, b"challenge", u32::MAX).is_err());
    }

    #[test]
    fn test_supplier_failure_propagates() {
        assert!(derive_signing_key(&FailingMaterial, b"challenge", 3).is_err());
        assert!(derive_signing_key(&FailingMaterial, b"challenge", 0).is_err());
    }
}
