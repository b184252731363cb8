//! Configuration types for batch barcode generation.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. The symbology and render style are chosen once per
//! batch and applied uniformly to every payload; calling [`crate::run`] again
//! with a different format is simply a fresh, independent invocation.

use crate::cancel::CancelToken;
use crate::error::BatchError;
use crate::pipeline::encode::SymbolEncoder;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for one batch run.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use barcode_batch::{BatchConfig, SymbolFormat};
///
/// let config = BatchConfig::builder()
///     .format(SymbolFormat::Ean13)
///     .bar_height(60)
///     .preview_limit(3)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.format, SymbolFormat::Ean13);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Symbology applied to every payload. Default: CODE128.
    pub format: SymbolFormat,

    /// Bar geometry and human-readable text options.
    pub style: RenderStyle,

    /// How many successfully rendered images to return as preview. Default: 1.
    pub preview_limit: usize,

    /// Number of payloads encoded at once. Default: 1 (sequential).
    ///
    /// Encoding is CPU-bound and runs on tokio's blocking pool; values above
    /// the number of cores rarely help.
    pub concurrency: usize,

    /// Compression used for archive entries. Default: Deflated.
    pub compression: ArchiveCompression,

    /// Pre-constructed encoder. When `None` the built-in
    /// [`crate::pipeline::encode::BarcodeEncoder`] is used.
    pub encoder: Option<Arc<dyn SymbolEncoder>>,

    /// Receives per-item progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Checked between items; firing it aborts the batch with
    /// [`BatchError::Cancelled`].
    pub cancel_token: Option<CancelToken>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            format: SymbolFormat::default(),
            style: RenderStyle::default(),
            preview_limit: 1,
            concurrency: 1,
            compression: ArchiveCompression::default(),
            encoder: None,
            progress_callback: None,
            cancel_token: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoder = self.encoder.as_ref().map(|e| e.name().to_string());
        let progress_callback = self.progress_callback.as_ref().map(|_| "<callback>");
        f.debug_struct("BatchConfig")
            .field("format", &self.format)
            .field("style", &self.style)
            .field("preview_limit", &self.preview_limit)
            .field("concurrency", &self.concurrency)
            .field("compression", &self.compression)
            .field("encoder", &encoder)
            .field("progress_callback", &progress_callback)
            .field("cancel_token", &self.cancel_token)
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn format(mut self, format: SymbolFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Replace the whole style at once. Numeric fields are clamped the same
    /// way the individual setters clamp them.
    pub fn style(mut self, style: RenderStyle) -> Self {
        self.config.style = style.clamped();
        self
    }

    pub fn line_width(mut self, px: u32) -> Self {
        self.config.style.line_width = px.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH);
        self
    }

    pub fn bar_height(mut self, px: u32) -> Self {
        self.config.style.bar_height = px.clamp(MIN_BAR_HEIGHT, MAX_BAR_HEIGHT);
        self
    }

    pub fn show_value(mut self, v: bool) -> Self {
        self.config.style.show_value = v;
        self
    }

    pub fn margin(mut self, px: u32) -> Self {
        self.config.style.margin = px.min(MAX_MARGIN);
        self
    }

    pub fn font_size(mut self, px: u32) -> Self {
        self.config.style.font_size = px.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self
    }

    pub fn preview_limit(mut self, n: usize) -> Self {
        self.config.preview_limit = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn compression(mut self, compression: ArchiveCompression) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn SymbolEncoder>) -> Self {
        self.config.encoder = Some(encoder);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.config.cancel_token = Some(token);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        if self.config.concurrency == 0 {
            return Err(BatchError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The closed set of supported linear symbologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SymbolFormat {
    /// Code 128, any printable ASCII. (default)
    #[default]
    #[serde(rename = "CODE128")]
    Code128,
    /// EAN-13: 12 digits plus check digit.
    #[serde(rename = "EAN13")]
    Ean13,
    /// UPC-A: 11 digits plus check digit.
    #[serde(rename = "UPC")]
    Upc,
    /// Code 39: digits, upper-case letters and `-. $/+%`.
    #[serde(rename = "CODE39")]
    Code39,
    /// ITF-14: 13 digits plus check digit, interleaved 2 of 5.
    #[serde(rename = "ITF14")]
    Itf14,
}

impl SymbolFormat {
    /// Every supported format, in menu order.
    pub const ALL: [SymbolFormat; 5] = [
        SymbolFormat::Code128,
        SymbolFormat::Ean13,
        SymbolFormat::Upc,
        SymbolFormat::Code39,
        SymbolFormat::Itf14,
    ];

    /// Canonical upper-case name, e.g. `"EAN13"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolFormat::Code128 => "CODE128",
            SymbolFormat::Ean13 => "EAN13",
            SymbolFormat::Upc => "UPC",
            SymbolFormat::Code39 => "CODE39",
            SymbolFormat::Itf14 => "ITF14",
        }
    }
}

impl fmt::Display for SymbolFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolFormat {
    type Err = BatchError;

    /// Case-insensitive; `-` and `_` are ignored so `ean-13` and `UPC_A` parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        match key.as_str() {
            "CODE128" => Ok(SymbolFormat::Code128),
            "EAN13" => Ok(SymbolFormat::Ean13),
            "UPC" | "UPCA" => Ok(SymbolFormat::Upc),
            "CODE39" => Ok(SymbolFormat::Code39),
            "ITF14" => Ok(SymbolFormat::Itf14),
            _ => Err(BatchError::InvalidConfig(format!(
                "Unknown barcode format '{s}' (expected one of CODE128, EAN13, UPC, CODE39, ITF14)"
            ))),
        }
    }
}

// ── Style limits ─────────────────────────────────────────────────────────

const MIN_LINE_WIDTH: u32 = 1;
const MAX_LINE_WIDTH: u32 = 10;
const MIN_BAR_HEIGHT: u32 = 10;
const MAX_BAR_HEIGHT: u32 = 1000;
const MIN_FONT_SIZE: u32 = 7;
const MAX_FONT_SIZE: u32 = 72;
const MAX_MARGIN: u32 = 200;
const MAX_TEXT_MARGIN: u32 = 200;

/// Visual parameters shared by every image in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStyle {
    /// Width of the narrowest bar in pixels. Default: 2.
    pub line_width: u32,
    /// Bar height in pixels. Default: 100.
    pub bar_height: u32,
    /// Draw the payload text under the bars. Default: true.
    pub show_value: bool,
    /// Quiet zone around the symbol in pixels. Default: 10.
    pub margin: u32,
    /// Approximate text height in pixels. Default: 14.
    pub font_size: u32,
    /// Gap between bars and text in pixels. Default: 2.
    pub text_margin: u32,
    /// Bar and text colour, RGBA. Default: opaque black.
    pub foreground: [u8; 4],
    /// Background colour, RGBA. Default: opaque white.
    pub background: [u8; 4],
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            line_width: 2,
            bar_height: 100,
            show_value: true,
            margin: 10,
            font_size: 14,
            text_margin: 2,
            foreground: [0, 0, 0, 255],
            background: [255, 255, 255, 255],
        }
    }
}

impl RenderStyle {
    /// Pull every numeric field into its supported range.
    ///
    /// Line width 1–10, bar height 10–1000, font size 7–72, margin and text
    /// margin at most 200. Colours and `show_value` are left alone.
    pub fn clamped(self) -> Self {
        Self {
            line_width: self.line_width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH),
            bar_height: self.bar_height.clamp(MIN_BAR_HEIGHT, MAX_BAR_HEIGHT),
            margin: self.margin.min(MAX_MARGIN),
            font_size: self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
            text_margin: self.text_margin.min(MAX_TEXT_MARGIN),
            ..self
        }
    }
}

/// How archive entries are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArchiveCompression {
    /// No compression; fastest, PNG data is already compressed.
    Stored,
    /// DEFLATE. (default)
    #[default]
    Deflated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.format, SymbolFormat::Code128);
        assert_eq!(config.preview_limit, 1);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.compression, ArchiveCompression::Deflated);
        assert!(config.style.show_value);
    }

    #[test]
    fn builder_clamps_style() {
        let config = BatchConfig::builder()
            .line_width(50)
            .bar_height(1)
            .margin(999)
            .font_size(2)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(config.style.line_width, 10);
        assert_eq!(config.style.bar_height, 10);
        assert_eq!(config.style.margin, 200);
        assert_eq!(config.style.font_size, 7);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn style_setter_clamps_like_field_setters() {
        let style = RenderStyle {
            line_width: 0,
            bar_height: u32::MAX,
            margin: u32::MAX / 2 + 1,
            font_size: 1,
            text_margin: u32::MAX,
            ..RenderStyle::default()
        };
        let config = BatchConfig::builder().style(style).build().unwrap();
        assert_eq!(config.style.line_width, 1);
        assert_eq!(config.style.bar_height, 1000);
        assert_eq!(config.style.margin, 200);
        assert_eq!(config.style.font_size, 7);
        assert_eq!(config.style.text_margin, 200);
    }

    #[test]
    fn clamping_keeps_in_range_styles() {
        let style = RenderStyle::default();
        assert_eq!(style.clone().clamped(), style);
    }

    #[test]
    fn format_parsing() {
        let parse = |s: &str| s.parse::<SymbolFormat>().unwrap();
        assert_eq!(parse("code128"), SymbolFormat::Code128);
        assert_eq!(parse("EAN-13"), SymbolFormat::Ean13);
        assert_eq!(parse("upc_a"), SymbolFormat::Upc);
        assert_eq!(parse("Itf14"), SymbolFormat::Itf14);
        assert!("qr".parse::<SymbolFormat>().is_err());
    }

    #[test]
    fn format_round_trips_through_display() {
        for format in SymbolFormat::ALL {
            assert_eq!(format.to_string().parse::<SymbolFormat>().unwrap(), format);
        }
    }

    #[test]
    fn format_serialises_upper_case() {
        let json = serde_json::to_string(&SymbolFormat::Code39).unwrap();
        assert_eq!(json, "\"CODE39\"");
    }

    #[test]
    fn debug_hides_callbacks() {
        let dbg = format!("{:?}", BatchConfig::default());
        assert!(dbg.contains("BatchConfig"));
        assert!(dbg.contains("Code128"));
    }
}
