//! Per-frame overlay compositing onto the luma plane.
//!
//! Each overlay owns a cached [`Patch`]. Static overlays render once; dynamic
//! overlays re-render when their update interval has elapsed on the monotonic
//! clock. Overlays are drawn in configuration order, later ones on top.

use std::{sync::Arc, time::Instant};

use burnin_core::prelude::{Metrics, PlaneMut};
use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::clock::Clock;
use crate::config::{CompositeMode, OverlayConfig};
use crate::error::StageError;
use crate::geometry::{Placement, ResolvedOverlay, place, place_patch, resolve_overlays};
use crate::patch::{Patch, saturate};
use crate::raster::{Rect, TextRasterizer};
use crate::text::{MetadataFormatter, expand_template};

/// Dimensions of the luma plane the compositor writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumaGeometry {
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes; at least `width`.
    pub stride: usize,
}

impl LumaGeometry {
    /// Bytes the plane must span: `stride * height`.
    pub fn required_len(&self) -> Option<usize> {
        self.stride.checked_mul(self.height as usize)
    }
}

/// Why an overlay was not drawn on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Text expanded to the empty string.
    EmptyExpansion,
    /// Patch does not fit in the frame.
    ClippedOut,
}

/// What happened to one overlay during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// Patch composited at `rect`; `rendered` is true when it was re-rasterized this frame.
    Drawn { rect: Rect, rendered: bool },
    Skipped(Skip),
}

/// Counter snapshot for an overlay stage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OverlayStats {
    pub frames: u64,
    pub renders: u64,
    pub cache_hits: u64,
    pub skipped_empty: u64,
    pub skipped_clipped: u64,
    pub last_frame_millis: Option<f64>,
}

impl From<&Metrics> for OverlayStats {
    fn from(m: &Metrics) -> Self {
        Self {
            frames: m.frames(),
            renders: m.renders(),
            cache_hits: m.cache_hits(),
            skipped_empty: m.skipped_empty(),
            skipped_clipped: m.skipped_clipped(),
            last_frame_millis: m.last_millis(),
        }
    }
}

/// Overlay cache plus the compositing loop.
pub struct Compositor {
    overlays: Vec<ResolvedOverlay>,
    geometry: LumaGeometry,
    raster: Box<dyn TextRasterizer>,
    metrics: Arc<Metrics>,
}

impl Compositor {
    /// Resolve `configs` against `geometry`.
    pub fn new(
        configs: &[OverlayConfig],
        geometry: LumaGeometry,
        raster: Box<dyn TextRasterizer>,
    ) -> Self {
        Self {
            overlays: resolve_overlays(configs, geometry.width, geometry.height),
            geometry,
            raster,
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Share an existing counter set (e.g. one owned by the stage).
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn overlays(&self) -> &[ResolvedOverlay] {
        &self.overlays
    }

    pub fn geometry(&self) -> LumaGeometry {
        self.geometry
    }

    pub fn stats(&self) -> OverlayStats {
        OverlayStats::from(self.metrics.as_ref())
    }

    /// Drop the overlay cache and hand back the rasterizer.
    pub fn into_rasterizer(self) -> Box<dyn TextRasterizer> {
        self.raster
    }

    /// Composite every overlay onto `luma`, in configuration order.
    ///
    /// Fails without touching the plane when it is shorter than
    /// `stride * height`.
    pub fn process(
        &mut self,
        luma: &mut PlaneMut<'_>,
        info: &dyn MetadataFormatter,
        clock: &dyn Clock,
    ) -> Result<Vec<OverlayOutcome>, StageError> {
        let started = Instant::now();
        let geometry = self.geometry;
        let required = geometry.required_len().ok_or_else(|| {
            StageError::FrameGeometry(format!(
                "stride {} x height {} overflows",
                geometry.stride, geometry.height
            ))
        })?;
        let span = luma.data().len();
        if span < required {
            return Err(StageError::FrameGeometry(format!(
                "luma span {span} bytes, need {required} (stride {} x height {})",
                geometry.stride, geometry.height
            )));
        }
        let plane = &mut luma.data_mut()[..required];

        let now_ms = clock.monotonic_ms();
        let mut wall: Option<DateTime<FixedOffset>> = None;
        let mut outcomes = Vec::with_capacity(self.overlays.len());
        for (index, overlay) in self.overlays.iter_mut().enumerate() {
            let outcome = if overlay.patch.is_some() && !refresh_due(overlay, now_ms) {
                reuse(overlay, geometry)
            } else {
                let text = if overlay.is_dynamic() {
                    let at = *wall.get_or_insert_with(|| clock.wall_time());
                    expand_template(&overlay.config.text, info, &at)
                } else {
                    overlay.config.text.clone()
                };
                rerender(index, overlay, &text, self.raster.as_ref(), geometry, now_ms)
            };
            match outcome {
                Ok((placement, rendered)) => {
                    if rendered {
                        self.metrics.render();
                    } else {
                        self.metrics.cache_hit();
                    }
                    if let Some(patch) = overlay.patch.as_ref() {
                        composite(plane, geometry.stride, placement.rect, patch, &overlay.config);
                    }
                    outcomes.push(OverlayOutcome::Drawn {
                        rect: placement.rect,
                        rendered,
                    });
                }
                Err(skip) => {
                    match skip {
                        Skip::EmptyExpansion => self.metrics.skip_empty(),
                        Skip::ClippedOut => self.metrics.skip_clipped(),
                    }
                    outcomes.push(OverlayOutcome::Skipped(skip));
                }
            }
        }
        self.metrics.frame();
        self.metrics.record_duration(started.elapsed());
        Ok(outcomes)
    }
}

/// Whether a cached patch has gone stale. Static patches never do.
fn refresh_due(overlay: &ResolvedOverlay, now_ms: u64) -> bool {
    if !overlay.is_dynamic() {
        return false;
    }
    match overlay.last_update_ms {
        Some(last) => now_ms.saturating_sub(last) >= overlay.config.update_interval_ms,
        None => true,
    }
}

/// Place the cached patch again.
fn reuse(overlay: &ResolvedOverlay, geometry: LumaGeometry) -> Result<(Placement, bool), Skip> {
    overlay
        .patch
        .as_ref()
        .and_then(|patch| place_patch(overlay, patch, geometry.width, geometry.height))
        .map(|placement| (placement, false))
        .ok_or(Skip::ClippedOut)
}

/// Measure, place and re-rasterize one overlay; the cache is only replaced
/// when the new text is non-empty and fits the frame.
fn rerender(
    index: usize,
    overlay: &mut ResolvedOverlay,
    text: &str,
    raster: &dyn TextRasterizer,
    geometry: LumaGeometry,
    now_ms: u64,
) -> Result<(Placement, bool), Skip> {
    if text.is_empty() {
        debug!(overlay = index, "text expanded to empty string; skipping");
        return Err(Skip::EmptyExpansion);
    }
    let metrics = raster.measure(text, overlay.scale, overlay.thickness);
    let Some(placement) = place(
        overlay.x,
        overlay.y,
        metrics,
        overlay.inset(),
        geometry.width,
        geometry.height,
    ) else {
        debug!(
            overlay = index,
            text_width = metrics.width,
            text_height = metrics.height.saturating_add(metrics.baseline),
            frame_width = geometry.width,
            frame_height = geometry.height,
            "overlay does not fit in frame; skipping"
        );
        return Err(Skip::ClippedOut);
    };
    debug!(overlay = index, text, now_ms, "rendering overlay patch");
    overlay.patch = Some(Patch::render(raster, overlay, text, metrics));
    overlay.last_update_ms = Some(now_ms);
    Ok((placement, true))
}

/// Blend the background (if any) under `rect`, then lay strokes on top.
fn composite(plane: &mut [u8], stride: usize, rect: Rect, patch: &Patch, cfg: &OverlayConfig) {
    let width = patch.width() as usize;
    if width == 0 {
        return;
    }
    let blend_bg = cfg.has_bg && cfg.mode == CompositeMode::Blend && !patch.opaque_background;
    let alpha = cfg.alpha;
    let bg = cfg.bg as f64;
    let (x0, y0) = (rect.x as usize, rect.y as usize);
    let rows = patch
        .luma
        .as_raw()
        .chunks_exact(width)
        .zip(patch.mask.as_raw().chunks_exact(width));
    for (r, (luma_row, mask_row)) in rows.enumerate() {
        let start = (y0 + r) * stride + x0;
        let Some(dst) = plane.get_mut(start..start + width) else {
            break;
        };
        for ((d, &l), &m) in dst.iter_mut().zip(luma_row).zip(mask_row) {
            if blend_bg {
                *d = saturate((*d as f64 * (1.0 - alpha) + bg * alpha).round() as i64);
            }
            *d = match m {
                0 => *d,
                u8::MAX => l,
                m => ((*d as u32 * (255 - m as u32) + l as u32 * m as u32 + 127) / 255) as u8,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{Position, load_overlays};
    use crate::raster::{BitmapFont, TextMetrics};
    use crate::text::FrameInfo;
    use burnin_core::prelude::*;
    use image::GrayImage;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the bitmap font and counts rasterization calls.
    #[derive(Clone, Default)]
    struct CountingFont {
        draws: Arc<AtomicUsize>,
    }

    impl TextRasterizer for CountingFont {
        fn measure(&self, text: &str, scale: f64, thickness: u32) -> TextMetrics {
            BitmapFont.measure(text, scale, thickness)
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
            self.draws.fetch_add(1, Ordering::Relaxed);
            BitmapFont.draw_text(target, text, origin, scale, color, thickness, antialiased);
        }
    }

    fn frame(width: u32, height: u32, stride: usize, fill: u8) -> FrameBuffer {
        let res = Resolution::new(width, height).unwrap();
        let fmt = MediaFormat::new(FourCc::YU12, res, ColorSpace::Bt709);
        let mut frame = FrameBuffer::yuv420(FrameMeta::new(fmt), stride).unwrap();
        frame.plane_mut(0).unwrap().data_mut().fill(fill);
        frame
    }

    fn compositor(configs: &[OverlayConfig], width: u32, height: u32, font: CountingFont) -> Compositor {
        let geometry = LumaGeometry {
            width,
            height,
            stride: width as usize,
        };
        Compositor::new(configs, geometry, Box::new(font))
    }

    fn run(c: &mut Compositor, frame: &mut FrameBuffer, clock: &ManualClock) -> Vec<OverlayOutcome> {
        let mut luma = frame.plane_mut(0).unwrap();
        c.process(&mut luma, &FrameInfo::default(), clock).unwrap()
    }

    fn run_with(
        c: &mut Compositor,
        frame: &mut FrameBuffer,
        info: &FrameInfo,
        clock: &ManualClock,
    ) -> Vec<OverlayOutcome> {
        let mut luma = frame.plane_mut(0).unwrap();
        c.process(&mut luma, info, clock).unwrap()
    }

    /// Reports text as zero pixels wide.
    struct ZeroWidth;

    impl TextRasterizer for ZeroWidth {
        fn measure(&self, _text: &str, _scale: f64, _thickness: u32) -> TextMetrics {
            TextMetrics {
                width: 0,
                height: 10,
                baseline: 2,
            }
        }

        fn draw_text(
            &self,
            _target: &mut GrayImage,
            _text: &str,
            _origin: (i64, i64),
            _scale: f64,
            _color: u8,
            _thickness: u32,
            _antialiased: bool,
        ) {
        }
    }

    fn luma(frame: &FrameBuffer) -> Vec<u8> {
        frame.planes()[0].data().to_vec()
    }

    fn drawn_rect(outcome: OverlayOutcome) -> Rect {
        match outcome {
            OverlayOutcome::Drawn { rect, .. } => rect,
            other => panic!("expected a drawn overlay, got {other:?}"),
        }
    }

    #[test]
    fn static_centered_overlay_touches_only_its_patch() {
        let mut cfg = OverlayConfig::new("HELLO");
        cfg.fg = 200;
        cfg.x = Position::Percent(50.0);
        cfg.y = Position::Percent(50.0);
        let mut c = compositor(&[cfg], 1920, 1080, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(1920, 1080, 1920, 16);
        let rect = drawn_rect(run(&mut c, &mut f, &clock)[0]);
        let overlay = &c.overlays()[0];
        let m = overlay.patch.as_ref().unwrap().metrics;
        assert_eq!(rect.x, 960);
        assert_eq!(rect.y, 540 - m.height as i64);
        let data = luma(&f);
        let mut changed = 0;
        for y in 0..1080i64 {
            for x in 0..1920i64 {
                let v = data[(y * 1920 + x) as usize];
                if !rect.contains(x, y) {
                    assert_eq!(v, 16, "({x},{y}) outside patch changed");
                } else if v != 16 {
                    changed += 1;
                }
            }
        }
        assert!(changed > 0);
        assert!(data.iter().any(|&v| v == 200));
    }

    #[test]
    fn static_overlay_rasterizes_once() {
        let font = CountingFont::default();
        let mut c = compositor(&[OverlayConfig::new("STATIC")], 640, 480, font.clone());
        let clock = ManualClock::new();
        let mut f = frame(640, 480, 640, 0);
        for step in 0..10 {
            clock.set_ms(step * 5000);
            run(&mut c, &mut f, &clock);
        }
        assert_eq!(font.draws.load(Ordering::Relaxed), 1);
        let stats = c.stats();
        assert_eq!(stats.renders, 1);
        assert_eq!(stats.cache_hits, 9);
        assert_eq!(stats.frames, 10);
    }

    #[test]
    fn dynamic_overlay_is_rate_limited() {
        let font = CountingFont::default();
        let mut cfg = OverlayConfig::new("%H:%M:%S");
        cfg.update_interval_ms = 1000;
        let mut c = compositor(&[cfg], 640, 480, font.clone());
        let clock = ManualClock::new();
        let mut f = frame(640, 480, 640, 0);
        let mut rendered_at = Vec::new();
        for t in [0, 500, 999, 1000, 1500, 1999, 2000] {
            clock.set_ms(t);
            if let OverlayOutcome::Drawn { rendered: true, .. } = run(&mut c, &mut f, &clock)[0] {
                rendered_at.push(t);
            }
        }
        assert_eq!(rendered_at, [0, 1000, 2000]);
        assert_eq!(font.draws.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn zero_interval_rerenders_every_frame() {
        let font = CountingFont::default();
        let mut cfg = OverlayConfig::new("#%frame");
        cfg.update_interval_ms = 0;
        let mut c = compositor(&[cfg], 320, 240, font.clone());
        let clock = ManualClock::new();
        let mut f = frame(320, 240, 320, 0);
        for _ in 0..3 {
            run(&mut c, &mut f, &clock);
        }
        assert_eq!(font.draws.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn empty_text_is_identity_and_allocates_nothing() {
        let mut c = compositor(&[OverlayConfig::new("")], 64, 64, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(64, 64, 64, 77);
        let before = luma(&f);
        let out = run(&mut c, &mut f, &clock);
        assert_eq!(out, [OverlayOutcome::Skipped(Skip::EmptyExpansion)]);
        assert_eq!(luma(&f), before);
        assert!(c.overlays()[0].patch.is_none());
        assert_eq!(c.stats().skipped_empty, 1);
    }

    #[test]
    fn oversized_overlay_is_skipped_without_mutation() {
        let mut cfg = OverlayConfig::new("FAR TOO WIDE FOR THIS");
        cfg.scale = 20.0;
        cfg.bg = 0;
        cfg.has_bg = true;
        cfg.alpha = 1.0;
        let mut c = compositor(&[cfg], 120, 90, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(120, 90, 120, 50);
        let before = luma(&f);
        let out = run(&mut c, &mut f, &clock);
        assert_eq!(out, [OverlayOutcome::Skipped(Skip::ClippedOut)]);
        assert_eq!(luma(&f), before);
        assert!(c.overlays()[0].patch.is_none());
        // Measurement is retried on the next frame.
        let out = run(&mut c, &mut f, &clock);
        assert_eq!(out, [OverlayOutcome::Skipped(Skip::ClippedOut)]);
        assert_eq!(c.stats().skipped_clipped, 2);
    }

    #[test]
    fn huge_thickness_is_clipped_not_fatal() {
        let configs = load_overlays(&json!([{ "text": "HI", "thickness": 10_000_000_000i64 }])).unwrap();
        let mut c = compositor(&configs, 1920, 1080, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(1920, 1080, 1920, 40);
        let before = luma(&f);
        let out = run(&mut c, &mut f, &clock);
        assert_eq!(out, [OverlayOutcome::Skipped(Skip::ClippedOut)]);
        assert_eq!(luma(&f), before);
    }

    #[test]
    fn zero_width_text_is_skipped() {
        let mut cfg = OverlayConfig::new("ghost");
        cfg.bg = 0;
        cfg.has_bg = true;
        cfg.alpha = 1.0;
        let geometry = LumaGeometry {
            width: 64,
            height: 64,
            stride: 64,
        };
        let mut c = Compositor::new(&[cfg], geometry, Box::new(ZeroWidth));
        let clock = ManualClock::new();
        let mut f = frame(64, 64, 64, 200);
        let before = luma(&f);
        let out = run(&mut c, &mut f, &clock);
        assert_eq!(out, [OverlayOutcome::Skipped(Skip::ClippedOut)]);
        assert_eq!(luma(&f), before);
        assert!(c.overlays()[0].patch.is_none());
    }

    #[test]
    fn dynamic_overlay_keeps_cache_when_text_goes_empty() {
        let mut cfg = OverlayConfig::new("%afstate");
        cfg.update_interval_ms = 1000;
        let mut c = compositor(&[cfg], 640, 480, CountingFont::default());
        let clock = ManualClock::new();
        let scanning = FrameInfo {
            af_state: "x".into(),
            ..FrameInfo::default()
        };
        let mut f = frame(640, 480, 640, 0);
        let out = run_with(&mut c, &mut f, &scanning, &clock);
        assert!(matches!(out[0], OverlayOutcome::Drawn { rendered: true, .. }));
        let cached = c.overlays()[0].patch.as_ref().unwrap().luma.clone();
        let cached_mask = c.overlays()[0].patch.as_ref().unwrap().mask.clone();

        clock.set_ms(1000);
        let mut f = frame(640, 480, 640, 0);
        let before = luma(&f);
        let out = run_with(&mut c, &mut f, &FrameInfo::default(), &clock);
        assert_eq!(out, [OverlayOutcome::Skipped(Skip::EmptyExpansion)]);
        assert_eq!(luma(&f), before);
        let overlay = &c.overlays()[0];
        assert_eq!(overlay.last_update_ms, Some(0));
        let patch = overlay.patch.as_ref().unwrap();
        assert_eq!(patch.luma, cached);
        assert_eq!(patch.mask, cached_mask);

        let focused = FrameInfo {
            af_state: "y".into(),
            ..FrameInfo::default()
        };
        let out = run_with(&mut c, &mut f, &focused, &clock);
        assert!(matches!(out[0], OverlayOutcome::Drawn { rendered: true, .. }));
        assert_eq!(c.overlays()[0].last_update_ms, Some(1000));
        assert_eq!(c.stats().skipped_empty, 1);
    }

    #[test]
    fn far_corner_clamps_patch_to_frame_edge() {
        let mut cfg = OverlayConfig::new("EDGE");
        cfg.x = Position::Percent(100.0);
        cfg.y = Position::Percent(100.0);
        let mut c = compositor(&[cfg], 800, 600, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(800, 600, 800, 0);
        let rect = drawn_rect(run(&mut c, &mut f, &clock)[0]);
        assert_eq!(rect.right(), 800);
        assert_eq!(rect.bottom(), 600);
    }

    #[test]
    fn zero_alpha_background_leaves_frame_untouched_under_patch() {
        let mut cfg = OverlayConfig::new("  ");
        cfg.bg = 255;
        cfg.has_bg = true;
        cfg.alpha = 0.0;
        let mut c = compositor(&[cfg], 200, 100, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(200, 100, 200, 33);
        let before = luma(&f);
        run(&mut c, &mut f, &clock);
        assert_eq!(luma(&f), before);
    }

    #[test]
    fn half_alpha_blends_background() {
        let mut cfg = OverlayConfig::new(" ");
        cfg.bg = 200;
        cfg.has_bg = true;
        cfg.alpha = 0.5;
        cfg.x = Position::Pixels(10);
        cfg.y = Position::Pixels(60);
        let mut c = compositor(&[cfg], 200, 100, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(200, 100, 200, 100);
        let rect = drawn_rect(run(&mut c, &mut f, &clock)[0]);
        let data = luma(&f);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                assert_eq!(data[(y * 200 + x) as usize], 150);
            }
        }
    }

    #[test]
    fn later_overlay_wins_on_overlap() {
        let mut first = OverlayConfig::new("AB");
        first.fg = 255;
        first.bg = 255;
        first.has_bg = true;
        first.alpha = 1.0;
        first.x = Position::Pixels(20);
        first.y = Position::Pixels(80);
        let mut second = first.clone();
        second.text = "WWWWWW".into();
        second.fg = 0;
        second.bg = 0;
        let mut c = compositor(&[first, second], 640, 480, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(640, 480, 640, 128);
        let out = run(&mut c, &mut f, &clock);
        let under_first = drawn_rect(out[0]);
        let data = luma(&f);
        for y in under_first.y..under_first.bottom() {
            for x in under_first.x..under_first.right() {
                assert_eq!(data[(y * 640 + x) as usize], 0, "({x},{y})");
            }
        }
    }

    #[test]
    fn opaque_static_overlay_is_idempotent_across_frames() {
        let mut cfg = OverlayConfig::new("REC");
        cfg.bg = 10;
        cfg.has_bg = true;
        cfg.alpha = 1.0;
        cfg.fg = 240;
        let mut c = compositor(&[cfg], 320, 240, CountingFont::default());
        let clock = ManualClock::new();
        let mut a = frame(320, 240, 320, 90);
        let mut b = frame(320, 240, 320, 90);
        run(&mut c, &mut a, &clock);
        clock.advance_ms(10_000);
        run(&mut c, &mut b, &clock);
        assert_eq!(luma(&a), luma(&b));
    }

    #[test]
    fn border_ring_is_painted_on_black() {
        let mut cfg = OverlayConfig::new("OK");
        cfg.border_width = 3;
        cfg.border_color = 255;
        cfg.has_border = true;
        cfg.fg = 128;
        cfg.x = Position::Pixels(30);
        cfg.y = Position::Pixels(100);
        let mut c = compositor(&[cfg], 400, 300, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(400, 300, 400, 0);
        let rect = drawn_rect(run(&mut c, &mut f, &clock)[0]);
        let data = luma(&f);
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                let ring = x < rect.x + 3
                    || y < rect.y + 3
                    || x >= rect.right() - 3
                    || y >= rect.bottom() - 3;
                if ring {
                    assert_eq!(data[(y * 400 + x) as usize], 255, "({x},{y})");
                }
            }
        }
    }

    #[test]
    fn stamp_mode_copies_opaque_patch() {
        let mut cfg = OverlayConfig::new(" ");
        cfg.mode = CompositeMode::Stamp;
        cfg.bg = 60;
        cfg.has_bg = true;
        cfg.alpha = 0.1;
        let mut c = compositor(&[cfg], 200, 100, CountingFont::default());
        let clock = ManualClock::new();
        let mut f = frame(200, 100, 200, 200);
        let rect = drawn_rect(run(&mut c, &mut f, &clock)[0]);
        let data = luma(&f);
        assert_eq!(data[(rect.y * 200 + rect.x) as usize], 60);
    }

    #[test]
    fn strided_plane_keeps_padding_intact() {
        let mut cfg = OverlayConfig::new("PAD");
        cfg.bg = 0;
        cfg.has_bg = true;
        cfg.alpha = 1.0;
        cfg.x = Position::Percent(100.0);
        let geometry = LumaGeometry {
            width: 300,
            height: 120,
            stride: 320,
        };
        let mut c = Compositor::new(&[cfg], geometry, Box::new(BitmapFont));
        let clock = ManualClock::new();
        let mut f = frame(300, 120, 320, 99);
        run(&mut c, &mut f, &clock);
        let data = luma(&f);
        for row in data.chunks_exact(320) {
            assert!(row[300..].iter().all(|&v| v == 99));
        }
    }

    #[test]
    fn short_plane_is_a_geometry_error() {
        let geometry = LumaGeometry {
            width: 64,
            height: 64,
            stride: 64,
        };
        let mut c = Compositor::new(&[OverlayConfig::new("x")], geometry, Box::new(BitmapFont));
        let mut f = frame(64, 32, 64, 5);
        let mut plane = f.plane_mut(0).unwrap();
        let err = c
            .process(&mut plane, &FrameInfo::default(), &ManualClock::new())
            .unwrap_err();
        assert!(matches!(err, StageError::FrameGeometry(_)));
        assert!(luma(&f).iter().all(|&v| v == 5));
    }
}
