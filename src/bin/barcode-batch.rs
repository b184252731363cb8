//! CLI binary for barcode-batch.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! writes the archive and prints a summary.

use anyhow::{Context, Result};
use barcode_batch::pipeline::archive::entry_names;
use barcode_batch::pipeline::input;
use barcode_batch::{
    inspect, run_to_file, ArchiveCompression, BatchConfig, BatchInput, BatchOutput,
    BatchProgressCallback, CancelToken, InputKind, ProgressCallback, SymbolFormat,
    DEFAULT_ARCHIVE_NAME,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar; rejected payloads are logged above it as they happen
/// and counted for the closing line.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>5}/{len} barcodes  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Encoding");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Encoding {total} barcodes…"))
        ));
    }

    fn on_item_complete(&self, _position: usize, _total: usize, _png_len: usize) {
        self.bar.inc(1);
    }

    fn on_item_error(&self, position: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} #{:>5}/{:<5}  {}",
            red("✗"),
            position,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} barcodes encoded successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} barcodes encoded  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One barcode per line of a text file
  barcode-batch codes.txt

  # First sheet of a workbook, every row's cells joined with "-"
  barcode-batch inventory.xlsx -o inventory.zip

  # EAN-13 with shorter bars and no text, 8 encoders at once
  barcode-batch --format ean13 --bar-height 60 --no-value -c 8 products.json

  # Read from stdin, save the first three images for a quick look
  cat codes.txt | barcode-batch - --preview 3 --preview-dir preview/

  # Show which payloads would be encoded, without encoding anything
  barcode-batch --dry-run inventory.csv

  # Machine-readable report; fail if any payload is rejected
  barcode-batch --json --strict inventory.csv > report.json

FORMATS:
  CODE128   any printable ASCII (default)
  EAN13     12 digits, or 13 with a valid check digit
  UPC       11 digits, or 12 with a valid check digit
  CODE39    0-9 A-Z - . space $ / + %  (lowercase is upper-cased)
  ITF14     13 digits, or 14 with a valid check digit

ENVIRONMENT VARIABLES:
  Every flag can also be set as BARCODE_BATCH_<FLAG>, e.g.
  BARCODE_BATCH_FORMAT=ean13, BARCODE_BATCH_CONCURRENCY=4.
  RUST_LOG overrides the log filter.
"#;

/// Generate a ZIP of barcode images from a spreadsheet export or a text list.
#[derive(Parser, Debug)]
#[command(
    name = "barcode-batch",
    version,
    about = "Generate a ZIP of barcode images from XLSX, CSV, JSON or text input",
    long_about = "Generate one barcode image per row (XLSX first sheet / CSV / TSV / JSON \
array) or per line (plain text) and pack them into a single ZIP archive. Rows are flattened \
by joining their non-empty cells with '-'. Values the chosen symbology cannot encode are \
reported and skipped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input file, or `-` for stdin.
    input: String,

    /// How to read the input. `auto` picks by file extension.
    #[arg(long, env = "BARCODE_BATCH_INPUT_KIND", value_enum, default_value = "auto")]
    input_kind: InputKindArg,

    /// Symbology: CODE128, EAN13, UPC, CODE39, ITF14.
    #[arg(short, long, env = "BARCODE_BATCH_FORMAT", default_value = "CODE128",
          value_parser = parse_format)]
    format: SymbolFormat,

    /// Width of the narrowest bar in pixels (1–10).
    #[arg(long, env = "BARCODE_BATCH_LINE_WIDTH", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=10))]
    line_width: u32,

    /// Bar height in pixels (10–1000).
    #[arg(long, env = "BARCODE_BATCH_BAR_HEIGHT", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(10..=1000))]
    bar_height: u32,

    /// Do not print the value under the bars.
    #[arg(long, env = "BARCODE_BATCH_NO_VALUE")]
    no_value: bool,

    /// Quiet zone around each symbol in pixels (0–200).
    #[arg(long, env = "BARCODE_BATCH_MARGIN", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(0..=200))]
    margin: u32,

    /// Text height in pixels (7–72).
    #[arg(long, env = "BARCODE_BATCH_FONT_SIZE", default_value_t = 14,
          value_parser = clap::value_parser!(u32).range(7..=72))]
    font_size: u32,

    /// Number of successful images to keep as preview.
    #[arg(long, env = "BARCODE_BATCH_PREVIEW", default_value_t = 1)]
    preview: usize,

    /// Write the preview images into this directory.
    #[arg(long, env = "BARCODE_BATCH_PREVIEW_DIR")]
    preview_dir: Option<PathBuf>,

    /// Archive path.
    #[arg(short, long, env = "BARCODE_BATCH_OUTPUT", default_value = DEFAULT_ARCHIVE_NAME)]
    output: PathBuf,

    /// Number of payloads encoded at once.
    #[arg(short, long, env = "BARCODE_BATCH_CONCURRENCY", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..=256))]
    concurrency: u64,

    /// Store archive entries without compression.
    #[arg(long, env = "BARCODE_BATCH_STORED")]
    stored: bool,

    /// Print a JSON report to stdout.
    #[arg(long, env = "BARCODE_BATCH_JSON")]
    json: bool,

    /// Exit with an error if any payload was rejected.
    #[arg(long, env = "BARCODE_BATCH_STRICT")]
    strict: bool,

    /// List the payloads that would be encoded and exit.
    #[arg(long)]
    dry_run: bool,

    /// Disable progress bar.
    #[arg(long, env = "BARCODE_BATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BARCODE_BATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BARCODE_BATCH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum InputKindArg {
    Auto,
    Text,
    Csv,
    Tsv,
    Json,
    Xlsx,
}

impl From<InputKindArg> for InputKind {
    fn from(v: InputKindArg) -> Self {
        match v {
            InputKindArg::Auto => InputKind::Auto,
            InputKindArg::Text => InputKind::Text,
            InputKindArg::Csv => InputKind::Csv,
            InputKindArg::Tsv => InputKind::Tsv,
            InputKindArg::Json => InputKind::Json,
            InputKindArg::Xlsx => InputKind::Xlsx,
        }
    }
}

fn parse_format(s: &str) -> Result<SymbolFormat, String> {
    s.parse::<SymbolFormat>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless verbose output is requested.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read input ───────────────────────────────────────────────────────
    let input = read_input(&cli.input, cli.input_kind.into()).await?;

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let payloads = inspect(&input);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&payloads).context("Failed to serialise payloads")?
            );
        } else {
            for (i, p) in payloads.iter().enumerate() {
                println!("{:>5}  {}", dim(&(i + 1).to_string()), p);
            }
            if !cli.quiet {
                eprintln!("{} payloads", bold(&payloads.len().to_string()));
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let cancel = CancelToken::new();
    let config = build_config(&cli, progress_cb, cancel.clone())?;

    // Ctrl-C stops the batch before the next payload starts.
    let quiet = cli.quiet;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if !quiet {
                eprintln!("{} cancelling…", cyan("◆"));
            }
            cancel.cancel();
        }
    });

    // ── Run batch ────────────────────────────────────────────────────────
    let output = run_to_file(&input, &cli.output, &config)
        .await
        .context("Batch failed")?;

    if let Some(ref dir) = cli.preview_dir {
        write_previews(&output, dir).await?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output.report())
            .context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, &cli.output, show_progress);
    }

    if cli.strict {
        output.into_result().context("Strict mode")?;
    }

    Ok(())
}

/// Read `path` (or stdin for `-`) into a batch input.
async fn read_input(path: &str, kind: InputKind) -> Result<BatchInput> {
    if path == "-" {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read stdin")?;
        return input::decode(&bytes, kind).context("Failed to decode stdin");
    }

    input::load_file(Path::new(path), kind)
        .await
        .with_context(|| format!("Failed to load {path}"))
}

/// Map CLI args to `BatchConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .format(cli.format)
        .line_width(cli.line_width)
        .bar_height(cli.bar_height)
        .show_value(!cli.no_value)
        .margin(cli.margin)
        .font_size(cli.font_size)
        .preview_limit(cli.preview)
        .concurrency(cli.concurrency as usize)
        .compression(if cli.stored {
            ArchiveCompression::Stored
        } else {
            ArchiveCompression::Deflated
        })
        .cancel_token(cancel);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn write_previews(output: &BatchOutput, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let names = entry_names(output.preview.iter().map(|p| p.payload.as_str()));
    for (name, image) in names.iter().zip(&output.preview) {
        let path = dir.join(name);
        tokio::fs::write(&path, &image.png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn print_summary(output: &BatchOutput, path: &Path, progress_shown: bool) {
    let stats = &output.stats;
    if !progress_shown {
        for f in &output.failures {
            eprintln!(
                "  {} #{:>5}  {}  {}",
                red("✗"),
                f.position,
                f.payload,
                dim(&f.reason.to_string())
            );
        }
    }
    eprintln!(
        "{}  {}/{} barcodes  {}ms  →  {}",
        if stats.failure_count == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.success_count,
        stats.total_count,
        stats.total_duration_ms,
        bold(&path.display().to_string()),
    );
    eprintln!(
        "   {} format  /  {} bytes archive",
        dim(stats.format.as_str()),
        dim(&stats.archive_bytes.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_counts_failed_items() {
        let cb = CliProgressCallback {
            bar: ProgressBar::hidden(),
            errors: AtomicUsize::new(0),
        };
        cb.on_batch_start(3);
        cb.on_item_complete(1, 3, 10);
        cb.on_item_error(2, 3, "invalid characters");
        cb.on_item_error(3, 3, &"x".repeat(200));
        cb.on_batch_complete(3, 1);

        assert_eq!(cb.errors.load(Ordering::SeqCst), 2);
        assert_eq!(cb.bar.position(), 3);
    }
}
