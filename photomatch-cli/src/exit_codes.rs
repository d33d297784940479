//! Exit codes following sysexits.h conventions.
//!
//! These codes let scripts tell a bad invocation from an unreadable input
//! or an image that could not be decoded.

use photomatch_core::PhotomatchError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (undecodable image, malformed catalog).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (catalog or HTTP client).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Help text appended to `--help`.
pub const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (invalid arguments)
  65  Data error (undecodable image, malformed catalog)
  66  Input file not found or unreadable
  69  Service unavailable";

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

/// Marks an error as a usage error.
#[derive(Debug)]
pub struct UsageError(pub String);

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify by the first typed error in the chain
        let code = err
            .chain()
            .find_map(|cause| {
                if cause.downcast_ref::<UsageError>().is_some() {
                    return Some(USAGE_ERROR);
                }
                if cause.downcast_ref::<std::io::Error>().is_some() {
                    return Some(INPUT_ERROR);
                }
                cause.downcast_ref::<PhotomatchError>().map(|e| match e {
                    PhotomatchError::Io(_) => INPUT_ERROR,
                    PhotomatchError::UndecodableImage(_)
                    | PhotomatchError::InvalidFingerprint(_)
                    | PhotomatchError::SerializationError(_) => DATA_ERROR,
                    PhotomatchError::Catalog(_) | PhotomatchError::HttpClient(_) => UNAVAILABLE,
                    PhotomatchError::Config(_) => USAGE_ERROR,
                    PhotomatchError::IncomparableFingerprints { .. } => GENERAL_ERROR,
                })
            })
            .unwrap_or(GENERAL_ERROR);

        Self {
            code,
            message: Some(message),
        }
    }
}
