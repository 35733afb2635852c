//! Centralized configuration for the signing subsystem.
//!
//! All tunable parameters live here so they can be reviewed and adjusted
//! in a single place. Wire-format constants (signature offset, key and
//! sentinel lengths) stay in their respective modules.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

// ── Authentication ───────────────────────────────────────────────────────────

/// Default compatibility level when none is configured.
///
/// Levels 0-2 select the 40-byte extended signing key (session key followed
/// by the unicode hash), levels 3-5 the 16-byte session key alone.
pub const DEFAULT_LM_COMPATIBILITY: u32 = 3;

// ── Task submission ──────────────────────────────────────────────────────────

/// Default cap on concurrently running submitted tasks for the bounded
/// executor profile.
pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 100;

/// Runtime configuration, loadable from a TOML file.
///
/// Missing fields fall back to their defaults, so a config file only needs
/// to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Compatibility level selecting the signing-key construction (0-5).
    pub lm_compatibility: u32,
    /// Concurrency cap for the bounded executor profile.
    pub max_concurrent_tasks: usize,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            lm_compatibility: DEFAULT_LM_COMPATIBILITY,
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
        }
    }
}

impl SigningConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Load from `path` if one is given and exists, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p.exists() => Self::from_file(p).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default signing config");
                Self::default()
            }),
            _ => Self::default(),
        }
    }
}
