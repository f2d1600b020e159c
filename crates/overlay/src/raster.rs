//! Text rasterization primitive.
//!
//! The compositor only orchestrates these calls; any backend that can measure
//! and draw a line of text onto an 8-bit single-channel image can be plugged
//! in through [`TextRasterizer`].

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{GrayImage, Luma};

/// Axis-aligned rectangle in target pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole image.
    pub fn of(image: &GrayImage) -> Self {
        Self::new(0, 0, image.width(), image.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection with `[0, w) x [0, h)` as unsigned ranges.
    fn clip_to(&self, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x.clamp(0, w as i64);
        let y0 = self.y.clamp(0, h as i64);
        let x1 = self.right().clamp(0, w as i64);
        let y1 = self.bottom().clamp(0, h as i64);
        (x1 > x0 && y1 > y0).then_some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Measured extent of a line of text.
///
/// `height` is the ascent above the baseline; `baseline` is the descent below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextMetrics {
    pub width: u32,
    pub height: u32,
    pub baseline: u32,
}

/// Measure/draw contract the compositor renders through.
pub trait TextRasterizer: Send {
    /// Glyph extent of `text` at the given scale and stroke thickness.
    fn measure(&self, text: &str, scale: f64, thickness: u32) -> TextMetrics;

    /// Draw `text` with its baseline-left point at `origin`.
    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &self,
        target: &mut GrayImage,
        text: &str,
        origin: (i64, i64),
        scale: f64,
        color: u8,
        thickness: u32,
        antialiased: bool,
    );

    /// Fill `rect` (clipped to the target) with `color`.
    fn fill_rect(&self, target: &mut GrayImage, rect: Rect, color: u8) {
        fill_rect(target, rect, color);
    }

    /// Stroke the inside of `rect` with a `width`-pixel frame.
    fn stroke_rect(&self, target: &mut GrayImage, rect: Rect, color: u8, width: u32) {
        stroke_rect(target, rect, color, width);
    }
}

/// Fill `rect` clipped to the image.
pub fn fill_rect(target: &mut GrayImage, rect: Rect, color: u8) {
    let Some((x0, y0, x1, y1)) = rect.clip_to(target.width(), target.height()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            target.put_pixel(x, y, Luma([color]));
        }
    }
}

/// Stroke a frame of `width` pixels along the inside edge of `rect`.
///
/// A width of half the shorter side or more fills the rectangle.
pub fn stroke_rect(target: &mut GrayImage, rect: Rect, color: u8, width: u32) {
    if width == 0 || rect.is_empty() {
        return;
    }
    let w = width.min(rect.width);
    let h = width.min(rect.height);
    fill_rect(target, Rect::new(rect.x, rect.y, rect.width, h), color);
    fill_rect(
        target,
        Rect::new(rect.x, rect.bottom() - h as i64, rect.width, h),
        color,
    );
    fill_rect(target, Rect::new(rect.x, rect.y, w, rect.height), color);
    fill_rect(
        target,
        Rect::new(rect.right() - w as i64, rect.y, w, rect.height),
        color,
    );
}

/// Pixels per font unit at scale 1.0.
const UNIT_PX: f64 = 3.0;
/// Glyph cell is 8x8 font units.
const CELL: f64 = 8.0;
/// Rows above the baseline.
const CAP_UNITS: f64 = 7.0;
/// Rows below the baseline.
const DESCENT_UNITS: f64 = 1.0;
/// Subsamples per axis when antialiasing.
const SUPERSAMPLE: u32 = 4;

/// Built-in rasterizer over the 8x8 `font8x8` glyph set.
///
/// Metrics follow the stroke-font convention of camera overlay tooling: the
/// ascent and advance grow with `scale`, and half the stroke thickness is
/// added on each side. Characters without a glyph draw as `?`.
///
/// # Example
/// ```rust
/// use burnin::raster::{BitmapFont, TextRasterizer};
///
/// let m = BitmapFont.measure("AB", 1.0, 2);
/// assert_eq!((m.width, m.height, m.baseline), (50, 22, 4));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapFont;

impl BitmapFont {
    fn glyph(c: char) -> [u8; 8] {
        BASIC_FONTS
            .get(c)
            .or_else(|| LATIN_FONTS.get(c))
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8])
    }

    fn unit(scale: f64) -> f64 {
        (scale * UNIT_PX).max(0.0)
    }
}

impl TextRasterizer for BitmapFont {
    fn measure(&self, text: &str, scale: f64, thickness: u32) -> TextMetrics {
        let u = Self::unit(scale);
        let t = thickness as f64;
        let chars = text.chars().count() as f64;
        TextMetrics {
            width: (CELL * u * chars + t).round() as u32,
            height: (CAP_UNITS * u + (thickness as u64 + 1).div_euclid(2) as f64).round() as u32,
            baseline: (DESCENT_UNITS * u + t * 0.5).round() as u32,
        }
    }

    fn draw_text(
        &self,
        target: &mut GrayImage,
        text: &str,
        origin: (i64, i64),
        scale: f64,
        color: u8,
        thickness: u32,
        antialiased: bool,
    ) {
        let glyphs: Vec<[u8; 8]> = text.chars().map(Self::glyph).collect();
        let u = Self::unit(scale);
        if glyphs.is_empty() || u <= 0.0 {
            return;
        }
        let layout = GlyphRun {
            glyphs: &glyphs,
            u,
            dilate: (thickness.max(1) as f64 - 1.0) / 2.0,
            left: origin.0 as f64 + thickness as f64 / 2.0,
            top: origin.1 as f64 - CAP_UNITS * u,
        };
        let (bx0, by0, bx1, by1) = layout.bounds();
        let bounds = Rect::new(
            bx0.floor() as i64,
            by0.floor() as i64,
            (bx1.ceil() - bx0.floor()).max(0.0) as u32,
            (by1.ceil() - by0.floor()).max(0.0) as u32,
        );
        let Some((x0, y0, x1, y1)) = bounds.clip_to(target.width(), target.height()) else {
            return;
        };
        let ss = if antialiased { SUPERSAMPLE } else { 1 };
        let samples = (ss * ss) as f64;
        for py in y0..y1 {
            for px in x0..x1 {
                let mut hits = 0u32;
                for sy in 0..ss {
                    for sx in 0..ss {
                        let fx = px as f64 + (sx as f64 + 0.5) / ss as f64;
                        let fy = py as f64 + (sy as f64 + 0.5) / ss as f64;
                        if layout.covers(fx, fy) {
                            hits += 1;
                        }
                    }
                }
                if hits == 0 {
                    continue;
                }
                let coverage = hits as f64 / samples;
                let dst = target.get_pixel_mut(px, py);
                let blended = dst.0[0] as f64 + (color as f64 - dst.0[0] as f64) * coverage;
                dst.0[0] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Positioned run of glyphs in continuous target coordinates.
struct GlyphRun<'a> {
    glyphs: &'a [[u8; 8]],
    /// Pixels per font unit.
    u: f64,
    /// Stroke growth on every side of a lit font cell.
    dilate: f64,
    left: f64,
    /// Top of the 8-unit cell row.
    top: f64,
}

impl GlyphRun<'_> {
    fn advance(&self) -> f64 {
        CELL * self.u
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.left - self.dilate,
            self.top - self.dilate,
            self.left + self.advance() * self.glyphs.len() as f64 + self.dilate,
            self.top + CELL * self.u + self.dilate,
        )
    }

    fn covers(&self, x: f64, y: f64) -> bool {
        let ly = y - self.top;
        let rows = self.cell_span(ly);
        if rows.is_empty() {
            return false;
        }
        let lx_run = x - self.left;
        let first = ((lx_run - self.dilate) / self.advance()).floor() as i64;
        let last = ((lx_run + self.dilate) / self.advance()).floor() as i64;
        for ci in first.max(0)..=last.min(self.glyphs.len() as i64 - 1) {
            let glyph = &self.glyphs[ci as usize];
            let lx = lx_run - ci as f64 * self.advance();
            for col in self.cell_span(lx) {
                for row in rows.clone() {
                    if glyph[row] & (1 << col) != 0 {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Font cells (0..8) whose dilated extent contains local coordinate `v`.
    fn cell_span(&self, v: f64) -> std::ops::Range<usize> {
        let lo = ((v - self.dilate) / self.u).floor().max(0.0);
        let hi = ((v + self.dilate) / self.u).floor().min(7.0);
        if hi < lo {
            0..0
        } else {
            lo as usize..hi as usize + 1
        }
    }
}
