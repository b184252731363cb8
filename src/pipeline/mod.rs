//! Pipeline stages for batch barcode generation.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ canonicalize ──▶ render ──▶ preview
//! (rows/text)  (payloads)    (PNG/item)  └──▶ archive
//! ```
//!
//! 1. [`input`]: decode CSV / TSV / JSON / text bytes into a batch input
//! 2. [`canonicalize`]: flatten records or lines into non-empty payloads
//! 3. [`encode`]: the [`encode::SymbolEncoder`] seam and its default
//!    implementation, built on [`symbology`], [`raster`] and [`glyphs`]
//! 4. [`render`]: run the encoder over the batch; a failed payload
//!    never aborts the rest
//! 5. [`preview`]: pick the first few successes for display
//! 6. [`archive`]: pack every success into one ZIP with unique names

pub mod archive;
pub mod canonicalize;
pub mod encode;
pub mod glyphs;
pub mod input;
pub mod preview;
pub mod raster;
pub mod render;
pub mod symbology;
