//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

#![allow(dead_code)] // SUCCESS completes the table; success exits normally

/// Successful execution.
pub const SUCCESS: i32 = 0;

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

/// Service unavailable (network, catalog backend).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if message.contains("Failed to read") {
            INPUT_ERROR
        } else if message.contains("Invalid threshold") {
            USAGE_ERROR
        } else if message.contains("Failed to parse")
            || message.contains("Failed to decode")
            || message.contains("could not be fingerprinted")
            || message.contains("Invalid image dimensions")
        {
            DATA_ERROR
        } else if message.contains("Network error")
            || message.contains("Timed out")
            || message.contains("Catalog unavailable")
            || message.contains("HTTP client")
        {
            UNAVAILABLE
        } else if message.contains("Failed to write") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    fn classify(err: anyhow::Error) -> i32 {
        ExitCode::from_anyhow(&err).code
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify(anyhow!("Failed to read image file: a.jpg")), INPUT_ERROR);
        assert_eq!(
            classify(anyhow!("Invalid threshold 150: must be between 0 and 100")),
            USAGE_ERROR
        );
        assert_eq!(
            classify(anyhow!("Failed to decode image: bad magic")),
            DATA_ERROR
        );
        assert_eq!(classify(anyhow!("Catalog unavailable: offline")), UNAVAILABLE);
        assert_eq!(classify(anyhow!("Failed to write catalog file")), IO_ERROR);
        assert_eq!(classify(anyhow!("something else")), GENERAL_ERROR);
        assert_ne!(classify(anyhow!("something else")), SUCCESS);
    }

    #[test]
    fn test_classification_sees_whole_chain() {
        let err = Err::<(), _>(anyhow!("Failed to decode image: truncated"))
            .context("Search failed")
            .unwrap_err();
        let exit = ExitCode::from_anyhow(&err);
        assert_eq!(exit.code, DATA_ERROR);
        assert!(exit.message.unwrap().starts_with("Search failed"));
    }
}
