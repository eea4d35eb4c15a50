//! Text watermark stamped into the lower-right corner of every generated
//! image.
//!
//! A TrueType font is used when one can be loaded from the configured path or
//! from a handful of well-known system locations. Otherwise the stamper falls
//! back to a built-in 8x8 bitmap font, so stamping itself never fails.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, ImageBuffer, Pixel, Rgb, Rgba};
use imageproc::drawing::{draw_text_mut, text_size};

pub const WATERMARK_TEXT: &str = "AI Generated | Talrn";

const FONT_SIZE: f32 = 20.0;
const MARGIN: u32 = 10;
const BITMAP_GLYPH_SIZE: u32 = 8;
const BITMAP_SCALE: u32 = 2;

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "Arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

enum WatermarkFont {
    TrueType(FontVec),
    Bitmap,
}

pub struct Watermark {
    text: String,
    font: WatermarkFont,
}

impl Watermark {
    /// Watermark with the fixed text, rendered with the first font that loads
    /// from `preferred` followed by the system candidates.
    pub fn new(preferred: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = preferred.into_iter().map(Path::to_path_buf).collect();
        if let Some(user_fonts) = dirs::font_dir() {
            candidates.push(user_fonts.join("arial.ttf"));
            candidates.push(user_fonts.join("Arial.ttf"));
        }
        candidates.extend(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

        let font = candidates
            .iter()
            .find_map(|path| load_font(path))
            .unwrap_or_else(|| {
                tracing::debug!("No TrueType font available, using bitmap watermark font");
                WatermarkFont::Bitmap
            });
        Self {
            text: WATERMARK_TEXT.to_string(),
            font,
        }
    }

    /// Watermark that always uses the built-in bitmap font.
    pub fn bitmap() -> Self {
        Self {
            text: WATERMARK_TEXT.to_string(),
            font: WatermarkFont::Bitmap,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn uses_bitmap_font(&self) -> bool {
        matches!(self.font, WatermarkFont::Bitmap)
    }

    /// Draws the watermark into `image` in place. RGB and RGBA images keep
    /// their color type; anything else is converted to RGBA first.
    pub fn stamp(&self, image: &mut DynamicImage) {
        match image {
            DynamicImage::ImageRgb8(buffer) => self.draw(buffer, Rgb([255, 255, 255])),
            DynamicImage::ImageRgba8(buffer) => self.draw(buffer, Rgba([255, 255, 255, 255])),
            other => {
                let mut buffer = other.to_rgba8();
                self.draw(&mut buffer, Rgba([255, 255, 255, 255]));
                *other = DynamicImage::ImageRgba8(buffer);
            }
        }
    }

    fn draw<P>(&self, canvas: &mut ImageBuffer<P, Vec<u8>>, color: P)
    where
        P: Pixel<Subpixel = u8>,
    {
        let (text_width, text_height) = self.text_size();
        let x = canvas.width() as i32 - text_width as i32 - MARGIN as i32;
        let y = canvas.height() as i32 - text_height as i32 - MARGIN as i32;

        match &self.font {
            WatermarkFont::TrueType(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(FONT_SIZE), font, &self.text)
            }
            WatermarkFont::Bitmap => draw_bitmap_text(canvas, color, x, y, &self.text),
        }
    }

    fn text_size(&self) -> (u32, u32) {
        match &self.font {
            WatermarkFont::TrueType(font) => text_size(PxScale::from(FONT_SIZE), font, &self.text),
            WatermarkFont::Bitmap => {
                let glyph = BITMAP_GLYPH_SIZE * BITMAP_SCALE;
                (glyph * self.text.chars().count() as u32, glyph)
            }
        }
    }
}

fn load_font(path: &Path) -> Option<WatermarkFont> {
    let bytes = std::fs::read(path).ok()?;
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            tracing::debug!(path = %path.display(), "Loaded watermark font");
            Some(WatermarkFont::TrueType(font))
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Ignoring unreadable font");
            None
        }
    }
}

/// Renders `text` with the 8x8 bitmap font, clipping anything outside the
/// canvas. Characters without a glyph are left blank.
fn draw_bitmap_text<P>(canvas: &mut ImageBuffer<P, Vec<u8>>, color: P, x: i32, y: i32, text: &str)
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);
    let advance = (BITMAP_GLYPH_SIZE * BITMAP_SCALE) as i64;

    for (index, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let origin_x = x as i64 + index as i64 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..BITMAP_GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..BITMAP_SCALE {
                    for dx in 0..BITMAP_SCALE {
                        let px = origin_x + (col * BITMAP_SCALE + dx) as i64;
                        let py = y as i64 + (row as u32 * BITMAP_SCALE + dy) as i64;
                        if (0..width).contains(&px) && (0..height).contains(&py) {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}
