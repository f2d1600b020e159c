//! Configure-time geometry and per-frame patch placement.

use crate::config::OverlayConfig;
use crate::patch::Patch;
use crate::raster::{Rect, TextMetrics};

/// Stream width at which `scale` is used as authored.
pub const SCALE_REFERENCE_WIDTH: u32 = 1200;
/// Stream width at which `thickness` is used as authored.
pub const THICKNESS_REFERENCE_WIDTH: u32 = 700;

/// Font scale adjusted for the stream width.
///
/// # Example
/// ```rust
/// use burnin::geometry::adjusted_scale;
///
/// assert_eq!(adjusted_scale(1.0, 1200), 1.0);
/// assert_eq!(adjusted_scale(1.0, 600), 0.5);
/// ```
pub fn adjusted_scale(scale: f64, width: u32) -> f64 {
    scale * width as f64 / SCALE_REFERENCE_WIDTH as f64
}

/// Stroke thickness adjusted for the stream width; never below 1.
///
/// # Example
/// ```rust
/// use burnin::geometry::adjusted_thickness;
///
/// assert_eq!(adjusted_thickness(2, 1920), 5);
/// assert_eq!(adjusted_thickness(2, 320), 1);
/// ```
pub fn adjusted_thickness(thickness: i64, width: u32) -> u32 {
    let scaled = thickness.saturating_mul(width as i64).div_euclid(THICKNESS_REFERENCE_WIDTH as i64);
    scaled.clamp(1, u32::MAX as i64) as u32
}

/// An overlay bound to a stream's dimensions, plus its render cache.
#[derive(Debug, Clone)]
pub struct ResolvedOverlay {
    pub config: OverlayConfig,
    /// Left edge of the text in frame pixels.
    pub x: i64,
    /// Baseline row of the text in frame pixels.
    pub y: i64,
    pub scale: f64,
    pub thickness: u32,
    /// Most recent rendering; `None` until the first successful render.
    pub patch: Option<Patch>,
    /// Monotonic time of the most recent render.
    pub last_update_ms: Option<u64>,
}

impl ResolvedOverlay {
    /// Resolve positions and rescale font parameters for a `width x height` stream.
    ///
    /// # Example
    /// ```rust
    /// use burnin::config::{OverlayConfig, Position};
    /// use burnin::geometry::ResolvedOverlay;
    ///
    /// let mut cfg = OverlayConfig::new("HELLO");
    /// cfg.x = Position::Percent(25.0);
    /// cfg.y = Position::Pixels(60);
    /// let resolved = ResolvedOverlay::new(cfg, 800, 600);
    /// assert_eq!((resolved.x, resolved.y), (200, 60));
    /// assert_eq!(resolved.thickness, 2);
    /// assert!(resolved.patch.is_none());
    /// ```
    pub fn new(config: OverlayConfig, width: u32, height: u32) -> Self {
        Self {
            x: config.x.resolve(width),
            y: config.y.resolve(height),
            scale: adjusted_scale(config.scale, width),
            thickness: adjusted_thickness(config.thickness, width),
            patch: None,
            last_update_ms: None,
            config,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.config.is_dynamic
    }

    /// Border drawn inside the patch, pushing the text inward.
    pub fn inset(&self) -> u32 {
        if self.config.has_border {
            self.config.border_width.clamp(0, u32::MAX as i64) as u32
        } else {
            0
        }
    }
}

/// Resolve every overlay against the stream, preserving configuration order.
pub fn resolve_overlays(
    configs: &[OverlayConfig],
    width: u32,
    height: u32,
) -> Vec<ResolvedOverlay> {
    configs
        .iter()
        .cloned()
        .map(|cfg| ResolvedOverlay::new(cfg, width, height))
        .collect()
}

/// Where a patch lands in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge of the text.
    pub x: i64,
    /// Baseline row of the text.
    pub y: i64,
    /// Full patch rectangle in frame coordinates (border included).
    pub rect: Rect,
}

/// Clamp a text anchor so its whole patch fits in a `width x height` frame.
///
/// The baseline row is clamped to `[height + baseline, H - baseline]` (widened
/// by the border inset); when that window is empty, or the patch is wider
/// than the frame, there is no placement and the overlay is skipped. A patch
/// with zero width or height is skipped the same way.
///
/// # Example
/// ```rust
/// use burnin::geometry::place;
/// use burnin::raster::TextMetrics;
///
/// let m = TextMetrics { width: 50, height: 20, baseline: 5 };
/// let p = place(1000, 1000, m, 0, 200, 100).unwrap();
/// assert_eq!((p.rect.right(), p.rect.bottom()), (200, 100));
/// assert!(place(1000, 1000, m, 0, 40, 100).is_none());
/// ```
pub fn place(
    x: i64,
    y: i64,
    metrics: TextMetrics,
    inset: u32,
    width: u32,
    height: u32,
) -> Option<Placement> {
    let (tw, th, bl, b) = (
        metrics.width as i64,
        metrics.height as i64,
        metrics.baseline as i64,
        inset as i64,
    );
    if tw + 2 * b == 0 || th + bl + 2 * b == 0 {
        return None;
    }
    let (x_lo, x_hi) = (b, width as i64 - tw - b);
    let (y_lo, y_hi) = (th + bl + b, height as i64 - bl - b);
    if x_hi < x_lo || y_hi < y_lo {
        return None;
    }
    let x = x.clamp(x_lo, x_hi);
    let y = y.clamp(y_lo, y_hi);
    Some(Placement {
        x,
        y,
        rect: Rect::new(
            x - b,
            y - th - b,
            metrics.width + 2 * inset,
            metrics.height + metrics.baseline + 2 * inset,
        ),
    })
}

/// Place an already rendered patch.
pub fn place_patch(overlay: &ResolvedOverlay, patch: &Patch, width: u32, height: u32) -> Option<Placement> {
    place(overlay.x, overlay.y, patch.metrics, patch.inset, width, height)
}
