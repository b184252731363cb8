//! # barcode-batch
//!
//! Turn a spreadsheet export or a list of lines into one barcode image per
//! value, packed into a single ZIP.
//!
//! ## Pipeline Overview
//!
//! ```text
//! rows / text
//!  │
//!  ├─ 1. Input         decode CSV / TSV / JSON / plain text
//!  ├─ 2. Canonicalize  row cells joined with "-", blank rows and lines dropped
//!  ├─ 3. Render        one PNG per payload (CPU-bound, spawn_blocking)
//!  ├─ 4. Preview       first N successes
//!  └─ 5. Archive       ZIP of <payload>[-N].png + per-item failure report
//! ```
//!
//! A payload the chosen symbology cannot represent is reported next to its
//! position and left out of the archive; it never fails the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use barcode_batch::{run, BatchConfig, BatchInput, RawRecord, SymbolFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rows = vec![
//!         RawRecord::new().with("Rak", "RAK1").with("Kode", 1234_i64),
//!         RawRecord::new().with("Rak", "RAK2").with("Kode", 5678_i64),
//!     ];
//!     let config = BatchConfig::builder().format(SymbolFormat::Code128).build()?;
//!     let output = run(&BatchInput::from(rows), &config).await?;
//!     std::fs::write("barcodes.zip", &output.archive)?;
//!     eprintln!("{} images, {} failed", output.entries.len(), output.failure_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `barcode-batch` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! barcode-batch = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod cancel;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{inspect, run, run_sync, run_to_file};
pub use cancel::CancelToken;
pub use config::{ArchiveCompression, BatchConfig, BatchConfigBuilder, RenderStyle, SymbolFormat};
pub use error::{BatchError, EncodeError};
pub use output::{BatchOutput, BatchReport, BatchStats, ItemFailure};
pub use pipeline::archive::{Archive, DEFAULT_ARCHIVE_NAME};
pub use pipeline::canonicalize::{BatchInput, CellValue, Payload, PayloadBatch, RawRecord};
pub use pipeline::encode::{BarcodeEncoder, SymbolEncoder};
pub use pipeline::input::{load_file, InputKind};
pub use pipeline::preview::PreviewImage;
pub use pipeline::render::{RenderFailure, RenderOutcome, RenderResult, RenderedSymbol};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{render_stream, ItemStream};
