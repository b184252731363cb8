//! Error types for the barcode-batch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`]: **Fatal**: the batch cannot proceed at all
//!   (unreadable input, malformed XLSX/CSV/JSON, archive serialisation failure,
//!   invalid configuration, cancellation). Returned as `Err(BatchError)` from
//!   the top-level `run*` functions.
//!
//! * [`EncodeError`]: **Non-fatal**: a single payload could not be encoded
//!   for the chosen symbology (wrong length, bad checksum, unsupported
//!   characters). Stored inside [`crate::pipeline::render::RenderFailure`] so
//!   the rest of the batch still lands in the archive.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the barcode-batch library.
///
/// Per-item failures use [`EncodeError`] and are recorded in the
/// [`crate::pipeline::render::RenderOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Input structure errors ────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The tabular source (XLSX / CSV / JSON) cannot be interpreted as rows.
    ///
    /// `row` is 1-indexed: the line of a CSV file or the element of a JSON
    /// array. 0 means the problem is not tied to a row.
    #[error("Invalid tabular input at row {row}: {detail}")]
    InvalidTabular { row: u64, detail: String },

    /// The text source could not be read as UTF-8 text.
    #[error("Invalid text input: {detail}")]
    InvalidText { detail: String },

    // ── Archive errors ────────────────────────────────────────────────────
    /// The ZIP container could not be serialised.
    #[error("Failed to build archive: {detail}")]
    Archive { detail: String },

    /// Could not create or write the output archive file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Run control ───────────────────────────────────────────────────────
    /// The cancellation token fired before every item was rendered.
    #[error("Batch cancelled after {completed}/{total} items")]
    Cancelled { completed: usize, total: usize },

    /// Some items succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the caller
    /// wants to treat any item failure as an error.
    #[error("{failed}/{total} barcodes failed to encode")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    /// True for the errors that mean "the input could not be read as rows or
    /// lines at all".
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            BatchError::FileNotFound { .. }
                | BatchError::PermissionDenied { .. }
                | BatchError::InvalidTabular { .. }
                | BatchError::InvalidText { .. }
        )
    }
}

/// A non-fatal error for a single payload.
///
/// The batch continues; the error is reported next to the payload that
/// caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum EncodeError {
    /// Payload has the wrong number of characters for the symbology.
    #[error("{format} expects {expected}, got {actual} characters")]
    InvalidLength {
        format: String,
        expected: String,
        actual: usize,
    },

    /// Payload contains characters the symbology cannot represent.
    #[error("{format} cannot encode {chars:?}")]
    InvalidCharacters { format: String, chars: String },

    /// The supplied check digit does not match the computed one.
    #[error("{format} check digit mismatch: expected {expected}, got {actual}")]
    Checksum {
        format: String,
        expected: u8,
        actual: u8,
    },

    /// The symbology library rejected the payload.
    #[error("{format} encoder rejected payload: {detail}")]
    Symbology { format: String, detail: String },

    /// PNG serialisation failed.
    #[error("PNG encoding failed: {0}")]
    Image(String),

    /// The encoder panicked while processing this payload.
    #[error("encoder panicked: {0}")]
    Panicked(String),
}
