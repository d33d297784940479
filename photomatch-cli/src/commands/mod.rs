//! Subcommand implementations.

pub mod compare;
pub mod hash;
pub mod search;

use std::path::Path;

use anyhow::{Context, Result};
use photomatch_core::{Fingerprint, PerceptualHasher};
use tracing::debug;

/// Read an image file and fingerprint it.
pub(crate) fn fingerprint_file(path: &Path, hasher: &PerceptualHasher) -> Result<Fingerprint> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Read image");

    let fingerprint = hasher
        .fingerprint_bytes(&bytes)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;

    debug!(path = %path.display(), %fingerprint, "Fingerprinted image");
    Ok(fingerprint)
}
