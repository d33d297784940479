//! Compare command implementation.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use photomatch_core::{HashAlgorithm, PerceptualHasher, DEFAULT_THRESHOLD, FINGERPRINT_BITS};

use super::fingerprint_file;

/// Execute the compare command.
pub fn execute(
    first: PathBuf,
    second: PathBuf,
    algorithm: HashAlgorithm,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let hasher = PerceptualHasher::new(algorithm);
    let a = fingerprint_file(&first, &hasher)?;
    let b = fingerprint_file(&second, &hasher)?;
    let distance = a.hamming_distance(&b)?;
    let similarity = similarity_percent(distance);

    if json {
        let output = serde_json::json!({
            "algorithm": algorithm,
            "a": { "file": first.display().to_string(), "fingerprint": a.to_hex() },
            "b": { "file": second.display().to_string(), "fingerprint": b.to_hex() },
            "distance": distance,
            "similarity": similarity,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if quiet {
        println!("{}", distance);
        return Ok(());
    }

    let verdict = if distance <= DEFAULT_THRESHOLD {
        "similar".green().bold()
    } else {
        "different".yellow().bold()
    };

    println!("   {} {}  {}", "A:".dimmed(), a.to_hex(), first.display());
    println!("   {} {}  {}", "B:".dimmed(), b.to_hex(), second.display());
    println!(
        "   {} {} / {} bits ({:.1}% similar, {})",
        "Distance:".dimmed(),
        distance,
        FINGERPRINT_BITS,
        similarity,
        verdict
    );

    Ok(())
}

fn similarity_percent(distance: u32) -> f64 {
    (1.0 - f64::from(distance) / f64::from(FINGERPRINT_BITS)) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_percent() {
        assert_eq!(similarity_percent(0), 100.0);
        assert_eq!(similarity_percent(32), 50.0);
        assert_eq!(similarity_percent(64), 0.0);
    }
}
