//! Hash command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use photomatch_core::{HashAlgorithm, PerceptualHasher};

use super::fingerprint_file;

/// Execute the hash command.
pub fn execute(file: PathBuf, algorithm: HashAlgorithm, json: bool, quiet: bool) -> Result<()> {
    let hasher = PerceptualHasher::new(algorithm);
    let fingerprint = fingerprint_file(&file, &hasher)?;

    if json {
        let output = serde_json::json!({
            "file": file.display().to_string(),
            "algorithm": algorithm,
            "fingerprint": fingerprint.to_hex(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if quiet {
        println!("{}", fingerprint.to_hex());
    } else {
        println!(
            "{}  {} {}",
            fingerprint.to_hex().bold(),
            format!("[{}]", algorithm).dimmed(),
            file.display()
        );
    }

    Ok(())
}
