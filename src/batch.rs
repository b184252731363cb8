//! Eager (whole-batch) entry points.
//!
//! [`run`] waits for every payload, then returns the archive, preview and
//! failure report together. Use [`crate::stream::render_stream`] instead to
//! observe items as they complete.

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::output::{BatchOutput, BatchStats, ItemFailure};
use crate::pipeline::canonicalize::{self, BatchInput, PayloadBatch};
use crate::pipeline::encode::{BarcodeEncoder, SymbolEncoder};
use crate::pipeline::render::RenderedSymbol;
use crate::pipeline::{archive, preview, render};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Generate barcodes for every payload in `input`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BatchOutput)` even when some or all payloads were rejected by the
/// encoder (check `output.failure_count`). Use
/// [`BatchOutput::into_result`] to treat any rejection as an error.
///
/// # Errors
/// Returns `Err(BatchError)` only for fatal errors:
/// - the archive could not be serialised
/// - the cancel token fired before every payload was attempted
///
/// # Example
/// ```rust,no_run
/// use barcode_batch::{run, BatchConfig, BatchInput};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let input = BatchInput::from("RAK1-1234\nRAK1-1235\n");
/// let output = run(&input, &BatchConfig::default()).await?;
/// std::fs::write("barcodes.zip", &output.archive)?;
/// # Ok(())
/// # }
/// ```
pub async fn run(input: &BatchInput, config: &BatchConfig) -> Result<BatchOutput, BatchError> {
    let total_start = Instant::now();
    info!(
        "Starting batch: {} input, format {}",
        input.kind(),
        config.format
    );

    // ── Step 1: Canonicalize ─────────────────────────────────────────────
    let payloads = canonicalize::canonicalize(input);
    info!("Canonicalized {} payloads", payloads.len());

    // ── Step 2: Resolve encoder ──────────────────────────────────────────
    let encoder = resolve_encoder(config);
    debug!("Using encoder '{}'", encoder.name());

    // ── Step 3: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let outcome = render::render_batch(&payloads, encoder, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 4: Preview + archive ────────────────────────────────────────
    let successes: Vec<&RenderedSymbol> = outcome.successes().collect();
    let preview = preview::sample(successes.iter().copied(), config.preview_limit);

    let archive_start = Instant::now();
    let archive = archive::build_archive(&successes, config.compression)?;
    let archive_duration_ms = archive_start.elapsed().as_millis() as u64;

    // ── Step 5: Stats ────────────────────────────────────────────────────
    let failures: Vec<ItemFailure> = outcome.failures().map(ItemFailure::from).collect();
    let stats = BatchStats {
        format: config.format,
        total_count: payloads.len(),
        success_count: successes.len(),
        failure_count: failures.len(),
        archive_bytes: archive.bytes.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        archive_duration_ms,
    };

    info!(
        "Batch complete: {}/{} barcodes, {} bytes archive, {}ms total",
        stats.success_count, stats.total_count, stats.archive_bytes, stats.total_duration_ms
    );

    Ok(BatchOutput {
        archive: archive.bytes,
        entries: archive.entries,
        preview,
        total_count: payloads.len(),
        failure_count: failures.len(),
        failures,
        stats,
    })
}

/// Run a batch and write the archive to `output_path`.
///
/// The archive is written to a temporary file in the target directory and
/// then renamed into place, so a reader never observes a partial file.
pub async fn run_to_file(
    input: &BatchInput,
    output_path: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchOutput, BatchError> {
    let output = run(input, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let bytes = output.archive.clone();

    let written = path.clone();
    tokio::task::spawn_blocking(move || write_atomic(&written, &bytes))
        .await
        .map_err(|e| BatchError::Internal(format!("Write task panicked: {}", e)))??;

    info!(
        "Wrote {} entries to {}",
        output.entries.len(),
        path.display()
    );
    Ok(output)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(input: &BatchInput, config: &BatchConfig) -> Result<BatchOutput, BatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(input, config))
}

/// Canonicalize without encoding anything.
///
/// Shows exactly which payloads a run would attempt, in order.
pub fn inspect(input: &BatchInput) -> PayloadBatch {
    canonicalize::canonicalize(input)
}

pub(crate) fn resolve_encoder(config: &BatchConfig) -> Arc<dyn SymbolEncoder> {
    match config.encoder {
        Some(ref encoder) => Arc::clone(encoder),
        None => Arc::new(BarcodeEncoder),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BatchError> {
    let write_failed = |source: std::io::Error| BatchError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RenderStyle, SymbolFormat};
    use crate::error::EncodeError;

    struct LenEncoder;

    impl SymbolEncoder for LenEncoder {
        fn encode(
            &self,
            payload: &str,
            _: SymbolFormat,
            _: &RenderStyle,
        ) -> Result<Vec<u8>, EncodeError> {
            Ok(vec![payload.len() as u8])
        }

        fn name(&self) -> &str {
            "len"
        }
    }

    #[test]
    fn resolve_prefers_configured_encoder() {
        let config = BatchConfig::builder()
            .encoder(Arc::new(LenEncoder))
            .build()
            .unwrap();
        assert_eq!(resolve_encoder(&config).name(), "len");
        assert_eq!(resolve_encoder(&BatchConfig::default()).name(), "barcoders");
    }

    #[test]
    fn inspect_only_canonicalizes() {
        let batch = inspect(&BatchInput::from("  A \n\nB\n"));
        assert_eq!(batch.values(), vec!["A", "B"]);
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.zip");
        write_atomic(&path, b"zip").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"zip");
    }

    #[test]
    fn run_sync_works_outside_a_runtime() {
        let config = BatchConfig::builder()
            .encoder(Arc::new(LenEncoder))
            .build()
            .unwrap();
        let out = run_sync(&BatchInput::from("A\nBB"), &config).unwrap();
        assert_eq!(out.entries, vec!["A.png", "BB.png"]);
        assert_eq!(out.stats.success_count, 2);
    }
}
