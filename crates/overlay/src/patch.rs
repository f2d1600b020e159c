//! Pre-rasterized overlay patches.

use image::GrayImage;

use crate::config::CompositeMode;
use crate::geometry::ResolvedOverlay;
use crate::raster::{Rect, TextMetrics, TextRasterizer};

/// Cached rendering of one overlay.
///
/// `luma` holds the colour of every stroke pixel and `mask` its coverage
/// (0 = untouched background, 255 = opaque). Both images are
/// `(width + 2*inset) x (height + baseline + 2*inset)`.
#[derive(Debug, Clone)]
pub struct Patch {
    pub luma: GrayImage,
    pub mask: GrayImage,
    pub metrics: TextMetrics,
    /// Border width the text is pushed in by.
    pub inset: u32,
    /// Background is baked into `luma`/`mask` (stamp mode with a visible background).
    pub opaque_background: bool,
}

impl Patch {
    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }

    /// Render `text` for `overlay` using previously measured `metrics`.
    pub fn render(
        raster: &dyn TextRasterizer,
        overlay: &ResolvedOverlay,
        text: &str,
        metrics: TextMetrics,
    ) -> Self {
        let cfg = &overlay.config;
        let inset = overlay.inset();
        let width = metrics.width + 2 * inset;
        let height = metrics.height + metrics.baseline + 2 * inset;
        let opaque_background = cfg.mode == CompositeMode::Stamp && cfg.has_bg && cfg.alpha > 0.0;
        let fg = saturate(cfg.fg);

        let mut luma = GrayImage::new(width, height);
        let mut mask = GrayImage::new(width, height);
        let full = Rect::new(0, 0, width, height);
        if opaque_background {
            raster.fill_rect(&mut luma, full, saturate(cfg.bg));
            raster.fill_rect(&mut mask, full, u8::MAX);
        } else {
            raster.fill_rect(&mut luma, full, fg);
        }
        if inset > 0 {
            raster.stroke_rect(&mut luma, full, saturate(cfg.border_color), inset);
            raster.stroke_rect(&mut mask, full, u8::MAX, inset);
        }
        let origin = (inset as i64, (inset + metrics.height) as i64);
        if opaque_background {
            raster.draw_text(&mut luma, text, origin, overlay.scale, fg, overlay.thickness, true);
        } else {
            raster.draw_text(
                &mut mask,
                text,
                origin,
                overlay.scale,
                u8::MAX,
                overlay.thickness,
                true,
            );
        }

        Self {
            luma,
            mask,
            metrics,
            inset,
            opaque_background,
        }
    }
}

/// Clamp an authored luminance to the 8-bit range.
pub(crate) fn saturate(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}
