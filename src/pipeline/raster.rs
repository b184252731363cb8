//! Rasterisation: module pattern + [`RenderStyle`] → `RgbaImage`.
//!
//! Layout, top to bottom: margin, bars, `text_margin`, value line, margin.
//! Bars and text are centred horizontally on the wider of the two.

use crate::config::RenderStyle;
use crate::error::EncodeError;
use crate::pipeline::glyphs::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use crate::pipeline::symbology::Symbol;
use image::{Rgba, RgbaImage};

/// Integer glyph scale for a requested font size in pixels.
pub fn font_scale(font_size: u32) -> u32 {
    (font_size / GLYPH_HEIGHT).max(1)
}

/// Largest raster [`draw`] will allocate, in pixels.
pub const MAX_PIXELS: u64 = 1 << 28;

/// Draw `symbol` with `style`.
///
/// Geometry is computed in 64-bit arithmetic. A style that would need more
/// than [`MAX_PIXELS`] pixels is rejected as [`EncodeError::Image`].
pub fn draw(symbol: &Symbol, style: &RenderStyle) -> Result<RgbaImage, EncodeError> {
    let line_width = u64::from(style.line_width.max(1));
    let margin = u64::from(style.margin);
    let bar_height = u64::from(style.bar_height);
    let bars_w = symbol.modules.len() as u64 * line_width;

    let scale = font_scale(style.font_size);
    let (text_w, text_h) = if style.show_value && !symbol.text.is_empty() {
        let w = glyphs::text_width(&symbol.text, scale);
        (w, u64::from(GLYPH_HEIGHT) * u64::from(scale))
    } else {
        (0, 0)
    };

    let content_w = bars_w.max(text_w);
    let width = content_w + 2 * margin;
    let mut height = bar_height + 2 * margin;
    if text_h > 0 {
        height += u64::from(style.text_margin) + text_h;
    }

    let (width, height) = (width.max(1), height.max(1));
    if width.checked_mul(height).is_none_or(|px| px > MAX_PIXELS) {
        return Err(EncodeError::Image(format!(
            "raster of {width}x{height} pixels exceeds the {MAX_PIXELS} pixel limit"
        )));
    }

    let fg = Rgba(style.foreground);
    let mut img = RgbaImage::from_pixel(width as u32, height as u32, Rgba(style.background));

    // Every offset below is inside the image, which fits in u32.
    let line_width = line_width as u32;
    let margin = style.margin;
    let bars_x = margin + ((content_w - bars_w) / 2) as u32;
    for (i, module) in symbol.modules.iter().enumerate() {
        if *module == 1 {
            let x0 = bars_x + i as u32 * line_width;
            fill_rect(&mut img, x0, margin, line_width, style.bar_height, fg);
        }
    }

    if text_h > 0 {
        let mut x = margin + ((content_w - text_w) / 2) as u32;
        let y = margin + style.bar_height + style.text_margin;
        for c in symbol.text.chars() {
            draw_glyph(&mut img, c, x, y, scale, fg);
            x = x.saturating_add((GLYPH_WIDTH + GLYPH_SPACING) * scale);
        }
    }

    Ok(img)
}

fn draw_glyph(img: &mut RgbaImage, c: char, x: u32, y: u32, scale: u32, color: Rgba<u8>) {
    for (row, bits) in glyphs::glyph(c).iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                let px = x.saturating_add(col * scale);
                let py = y.saturating_add(row as u32 * scale);
                fill_rect(img, px, py, scale, scale, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = x.saturating_add(w).min(img.width());
    let y_end = y.saturating_add(h).min(img.height());
    for py in y..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(modules: &[u8], text: &str) -> Symbol {
        Symbol {
            text: text.into(),
            modules: modules.to_vec(),
        }
    }

    #[test]
    fn dimensions_without_text() {
        let style = RenderStyle {
            line_width: 3,
            bar_height: 20,
            show_value: false,
            margin: 4,
            ..Default::default()
        };
        let img = draw(&symbol(&[1, 0, 1, 1], "X"), &style).unwrap();
        assert_eq!(img.dimensions(), (4 * 3 + 8, 20 + 8));
    }

    #[test]
    fn bars_use_foreground_and_spaces_background() {
        let style = RenderStyle {
            line_width: 2,
            bar_height: 10,
            show_value: false,
            margin: 0,
            ..Default::default()
        };
        let img = draw(&symbol(&[1, 0, 1], ""), &style).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba(style.foreground));
        assert_eq!(img.get_pixel(1, 9), &Rgba(style.foreground));
        assert_eq!(img.get_pixel(2, 5), &Rgba(style.background));
        assert_eq!(img.get_pixel(4, 5), &Rgba(style.foreground));
    }

    #[test]
    fn text_adds_height_and_can_widen() {
        let style = RenderStyle {
            line_width: 1,
            bar_height: 10,
            show_value: true,
            margin: 0,
            font_size: 14,
            text_margin: 2,
            ..Default::default()
        };
        let img = draw(&symbol(&[1, 0, 1], "ABCD"), &style).unwrap();
        // 4 glyphs at scale 2: (4*6 - 1) * 2 = 46 wide, 14 tall.
        assert_eq!(img.dimensions(), (46, 10 + 2 + 14));
    }

    #[test]
    fn oversized_margin_is_an_image_error() {
        let style = RenderStyle {
            margin: u32::MAX / 2 + 1,
            ..Default::default()
        };
        let err = draw(&symbol(&[1, 0, 1], "ABC"), &style).unwrap_err();
        assert!(matches!(err, EncodeError::Image(_)));
    }

    #[test]
    fn raster_over_the_pixel_limit_is_rejected() {
        let style = RenderStyle {
            line_width: 1,
            bar_height: 1 << 20,
            show_value: false,
            margin: 0,
            ..Default::default()
        };
        let modules = vec![1u8; 1 << 9];
        let err = draw(&symbol(&modules, ""), &style).unwrap_err();
        assert!(matches!(err, EncodeError::Image(_)));
    }

    #[test]
    fn scale_never_drops_below_one() {
        assert_eq!(font_scale(0), 1);
        assert_eq!(font_scale(7), 1);
        assert_eq!(font_scale(21), 3);
    }
}
