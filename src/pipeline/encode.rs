//! Symbol encoding seam: payload → PNG bytes.
//!
//! [`SymbolEncoder`] is the boundary between the batch machinery and the
//! symbology implementation. The renderer only ever sees this trait, so tests
//! and embedders can substitute their own encoder through
//! [`crate::config::BatchConfigBuilder::encoder`].
//!
//! [`BarcodeEncoder`] is the built-in implementation: `barcoders` produces the
//! module pattern, [`crate::pipeline::raster`] draws it, and the result is
//! written out as a lossless PNG.

use crate::config::{RenderStyle, SymbolFormat};
use crate::error::EncodeError;
use crate::pipeline::{raster, symbology};
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Turns one payload into one image.
///
/// Implementations are called from blocking-pool threads, possibly several at
/// once, and must be deterministic: the same payload, format and style yield
/// the same bytes.
pub trait SymbolEncoder: Send + Sync {
    /// Encode `payload` as a PNG.
    fn encode(
        &self,
        payload: &str,
        format: SymbolFormat,
        style: &RenderStyle,
    ) -> Result<Vec<u8>, EncodeError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// Default encoder backed by `barcoders` and the built-in rasteriser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarcodeEncoder;

impl SymbolEncoder for BarcodeEncoder {
    fn encode(
        &self,
        payload: &str,
        format: SymbolFormat,
        style: &RenderStyle,
    ) -> Result<Vec<u8>, EncodeError> {
        let symbol = symbology::encode_symbol(payload, format)?;
        let img = raster::draw(&symbol, style)?;
        encode_png(img)
    }

    fn name(&self) -> &str {
        "barcoders"
    }
}

/// Serialise a raster as PNG bytes.
pub fn encode_png(img: RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let (w, h) = img.dimensions();
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| EncodeError::Image(e.to_string()))?;

    debug!("Encoded {}x{} raster → {} bytes PNG", w, h, buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn encode_small_image() {
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let png = encode_png(img).expect("encode should succeed");
        assert!(png.starts_with(PNG_MAGIC));
    }

    #[test]
    fn barcode_encoder_produces_decodable_png() {
        let style = RenderStyle::default();
        let png = BarcodeEncoder
            .encode("RAK1-1234", SymbolFormat::Code128, &style)
            .expect("encode");
        assert!(png.starts_with(PNG_MAGIC));

        let decoded = image::load_from_memory(&png).expect("valid png");
        assert!(decoded.width() > 2 * style.margin);
        assert!(decoded.height() > style.bar_height);
    }

    #[test]
    fn barcode_encoder_is_deterministic() {
        let style = RenderStyle::default();
        let a = BarcodeEncoder.encode("4006381333931", SymbolFormat::Ean13, &style);
        let b = BarcodeEncoder.encode("4006381333931", SymbolFormat::Ean13, &style);
        assert_eq!(a, b);
    }

    #[test]
    fn barcode_encoder_reports_symbology_errors() {
        let err = BarcodeEncoder
            .encode("RAK1", SymbolFormat::Ean13, &RenderStyle::default())
            .unwrap_err();
        assert!(matches!(err, EncodeError::InvalidCharacters { .. }));
    }

    #[test]
    fn out_of_range_style_fails_the_item_without_panicking() {
        let style = RenderStyle {
            margin: u32::MAX / 2 + 1,
            ..Default::default()
        };
        let err = BarcodeEncoder
            .encode("RAK1", SymbolFormat::Code128, &style)
            .unwrap_err();
        assert!(matches!(err, EncodeError::Image(_)));
    }

    #[test]
    fn hiding_the_value_shrinks_the_image() {
        let with = RenderStyle::default();
        let without = RenderStyle {
            show_value: false,
            ..Default::default()
        };
        let a = BarcodeEncoder
            .encode("ABC", SymbolFormat::Code39, &with)
            .unwrap();
        let b = BarcodeEncoder
            .encode("ABC", SymbolFormat::Code39, &without)
            .unwrap();
        let a = image::load_from_memory(&a).unwrap();
        let b = image::load_from_memory(&b).unwrap();
        assert!(a.height() > b.height());
    }
}
