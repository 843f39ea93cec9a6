//! Durable slot for the current token pair. The store performs no validation;
//! it reads fail-soft and writes atomically (tmp file + rename) so a crashed
//! write never leaves a half-serialized record behind.

use super::tokens::AuthTokens;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the stored pair. Missing or corrupt data yields `None`.
    #[must_use]
    pub fn get(&self) -> Option<AuthTokens> {
        let raw = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Overwrites the stored pair.
    pub fn set(&self, tokens: &AuthTokens) -> Result<()> {
        let data = serde_json::to_string(tokens)?;
        let tmp = self.path.with_extension("json.tmp");

        fs::write(&tmp, data)
            .with_context(|| format!("Failed to write token file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace token file {}", self.path.display()))?;

        Ok(())
    }

    /// Removes the stored pair. A missing file is not an error.
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to clear token file {}: {}", self.path.display(), err);
            }
        }
    }
}
