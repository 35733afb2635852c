//! Shared, serialized access to a session's signing state.
//!
//! Every sign and verify call both reads and advances the context (digest
//! accumulation, sequence counter, bypass flag), so two interleaved calls
//! would corrupt the MAC or the sequence pairing. This handle guards the
//! context with an async mutex: one call at a time per session, while
//! independent sessions proceed fully in parallel.

use crate::config::SigningConfig;
use crate::smb::key::SessionKeyMaterial;
use crate::smb::message::{Request, Response};
use crate::smb::signing::SigningContext;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mutex-guarded handle to a per-session [`SigningContext`].
///
/// Clones share the same context; the dispatching layer may hold one clone
/// per in-flight exchange without breaking serialization.
#[derive(Debug, Clone)]
pub struct SessionSigning {
    context: Arc<Mutex<SigningContext>>,
}

impl SessionSigning {
    /// Establish signing for a session whose authentication just
    /// completed. Fails when key derivation fails, which must abort the
    /// session.
    pub fn establish(
        material: &dyn SessionKeyMaterial,
        challenge: &[u8],
        config: &SigningConfig,
        bypass: bool,
    ) -> Result<Self> {
        let context =
            SigningContext::negotiate(material, challenge, config.lm_compatibility, bypass)?;
        Ok(Self::from_context(context))
    }

    /// Wrap an already-built context.
    pub fn from_context(context: SigningContext) -> Self {
        Self {
            context: Arc::new(Mutex::new(context)),
        }
    }

    /// Sign an outgoing request; exclusive for the duration of the call.
    pub async fn sign(
        &self,
        data: &mut [u8],
        offset: usize,
        length: usize,
        request: &mut Request,
        response: Option<&mut Response>,
    ) {
        self.context
            .lock()
            .await
            .sign(data, offset, length, request, response);
    }

    /// Verify an incoming response. Returns `true` when verification
    /// failed.
    pub async fn verify(&self, data: &[u8], offset: usize, response: &mut Response) -> bool {
        self.context.lock().await.verify(data, offset, response)
    }

    /// Sequence value the next signed request will receive.
    pub async fn sign_sequence(&self) -> u32 {
        self.context.lock().await.sign_sequence()
    }
}
