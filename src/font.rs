//! The fixed bitmap font used for annotations.
//!
//! Glyphs come from the `font8x8` basic set: 8x8 cells, one byte per row,
//! least significant bit on the left. Every font pixel is drawn as a
//! `SCALE` x `SCALE` block.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use imageproc::{
    drawing::{Canvas, draw_filled_rect_mut},
    rect::Rect,
};

/// Cell size; spacing between glyphs is part of the cell.
pub const GLYPH_SIZE: u32 = 8;
/// Blank rows between lines.
pub const LINE_SPACING: u32 = 2;
pub const SCALE: u32 = 2;

const FALLBACK_GLYPH: char = '?';

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| BASIC_FONTS.get(FALLBACK_GLYPH))
        .unwrap_or_default()
}

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.trim_end_matches('\r'))
}

fn clamp_to_u32(value: u64) -> u32 {
    value.min(u64::from(u32::MAX)) as u32
}

/// Pixel width and height of `text` when drawn with [`draw_text_mut`].
/// Saturates at `u32::MAX` for absurdly long input.
pub fn text_size(text: &str) -> (u32, u32) {
    if text.is_empty() {
        return (0, 0);
    }

    let mut columns: u64 = 0;
    let mut line_count: u64 = 0;
    for line in lines(text) {
        columns = columns.max(line.chars().count() as u64);
        line_count += 1;
    }

    extent(columns, line_count)
}

/// Size of a block of `columns` x `line_count` cells.
fn extent(columns: u64, line_count: u64) -> (u32, u32) {
    let cell = u64::from(GLYPH_SIZE);
    let width = columns.saturating_mul(cell * u64::from(SCALE));
    let height = line_count
        .saturating_mul(cell)
        .saturating_add(line_count.saturating_sub(1).saturating_mul(u64::from(LINE_SPACING)))
        .saturating_mul(u64::from(SCALE));
    (clamp_to_u32(width), clamp_to_u32(height))
}

/// Draws `text` with its top-left corner at (`x`, `y`). Blocks that fall
/// outside the canvas are clipped by `draw_filled_rect_mut`.
pub fn draw_text_mut<C>(canvas: &mut C, color: C::Pixel, x: i32, y: i32, text: &str)
where
    C: Canvas,
{
    let (width, height) = canvas.dimensions();
    let advance = i64::from(GLYPH_SIZE * SCALE);
    let line_advance = i64::from((GLYPH_SIZE + LINE_SPACING) * SCALE);
    let scale = i64::from(SCALE);

    for (row_index, line) in lines(text).enumerate() {
        let top = i64::from(y) + row_index as i64 * line_advance;
        if top >= i64::from(height) {
            break;
        }
        if top + advance <= 0 {
            continue;
        }

        for (column_index, c) in line.chars().enumerate() {
            let left = i64::from(x) + column_index as i64 * advance;
            if left >= i64::from(width) {
                break;
            }
            if left + advance <= 0 {
                continue;
            }

            for (dy, bits) in glyph(c).iter().enumerate() {
                for dx in 0..GLYPH_SIZE {
                    if (bits >> dx) & 1 == 0 {
                        continue;
                    }
                    // the cell overlaps the canvas, so both fit in i32
                    let block_x = (left + i64::from(dx) * scale) as i32;
                    let block_y = (top + dy as i64 * scale) as i32;
                    let block = Rect::at(block_x, block_y).of_size(SCALE, SCALE);
                    draw_filled_rect_mut(canvas, block, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn lit_bounds(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, pixel) in img.enumerate_pixels() {
            if *pixel == WHITE {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    #[test]
    fn test_text_size_empty() {
        assert_eq!(text_size(""), (0, 0));
    }

    #[test]
    fn test_text_size_single_line() {
        assert_eq!(text_size("A"), (16, 16));
        assert_eq!(text_size("Hello"), (80, 16));
    }

    #[test]
    fn test_text_size_multi_line() {
        // widest line wins, two lines plus one gap
        assert_eq!(text_size("ab\nabcd"), (64, 36));
        assert_eq!(text_size("ab\r\nabcd"), (64, 36));
    }

    #[test]
    fn test_text_size_saturates() {
        assert_eq!(extent(300_000_000, 1), (u32::MAX, 16));
        assert_eq!(extent(1, u64::MAX), (16, u32::MAX));
    }

    #[test]
    fn test_unknown_characters_use_fallback_glyph() {
        assert_eq!(glyph('é'), glyph('?'));
        assert_eq!(glyph('漢'), glyph('?'));
        assert_ne!(glyph('A'), glyph('?'));
        assert_eq!(text_size("é"), text_size("?"));
    }

    #[test]
    fn test_draw_stays_within_measured_box() {
        let mut img = RgbaImage::from_pixel(100, 40, BLACK);
        let (width, height) = text_size("H1");
        draw_text_mut(&mut img, WHITE, 7, 5, "H1");

        let (x0, y0, x1, y1) = lit_bounds(&img).unwrap();
        assert!(x0 >= 7 && y0 >= 5);
        assert!(x1 < 7 + width && y1 < 5 + height);
        // 'H' starts in the first column and row of its cell
        assert_eq!((x0, y0), (7, 5));
    }

    #[test]
    fn test_draw_clips_off_canvas() {
        let mut img = RgbaImage::from_pixel(8, 8, BLACK);
        draw_text_mut(&mut img, WHITE, -4, -4, "H");
        // right-hand stroke of the H survives, left-hand stroke is cut off
        assert_eq!(*img.get_pixel(4, 0), WHITE);
        assert_eq!(*img.get_pixel(0, 0), BLACK);

        let mut img = RgbaImage::from_pixel(8, 8, BLACK);
        draw_text_mut(&mut img, WHITE, -100, -100, "H");
        assert!(lit_bounds(&img).is_none());
    }

    #[test]
    fn test_draws_on_dynamic_image_in_place() {
        let mut img = DynamicImage::ImageRgb8(image::RgbImage::new(40, 20));
        draw_text_mut(&mut img, WHITE, -6, 2, "HH");
        assert!(matches!(img, DynamicImage::ImageRgb8(_)));
        assert!(img.to_rgb8().pixels().any(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_space_draws_nothing() {
        let mut img = RgbaImage::from_pixel(20, 20, BLACK);
        draw_text_mut(&mut img, WHITE, 0, 0, " ");
        assert!(lit_bounds(&img).is_none());
    }
}
