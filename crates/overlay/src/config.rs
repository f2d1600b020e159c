//! Overlay list loading.
//!
//! The host hands the stage a key/value tree; each entry of the list becomes
//! one [`OverlayConfig`] with defaults filled in. Presence of `bg` and
//! `border_width` is tracked separately from their values because an absent
//! background and a black background composite differently.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Default glyph luminance.
pub const DEFAULT_FG: i64 = 255;
/// Default background blend weight.
pub const DEFAULT_ALPHA: f64 = 0.5;
/// Default font scale before resolution adjustment.
pub const DEFAULT_SCALE: f64 = 1.0;
/// Default stroke thickness before resolution adjustment.
pub const DEFAULT_THICKNESS: i64 = 2;
/// Default minimum gap between re-renders of a dynamic overlay.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1000;

/// Position along one axis: absolute pixels or a percentage of the dimension.
///
/// # Example
/// ```rust
/// use burnin::config::Position;
///
/// assert_eq!(Position::parse("25%"), Some(Position::Percent(25.0)));
/// assert_eq!(Position::parse("-12"), Some(Position::Pixels(-12)));
/// assert_eq!(Position::parse(""), Some(Position::Pixels(0)));
/// assert_eq!(Position::parse("left"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Pixels(i64),
    Percent(f64),
}

impl Position {
    /// Parse `"<int>"` or `"<number>%"`; the empty string means pixel 0.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return Some(Position::Pixels(0));
        }
        if let Some(prefix) = s.strip_suffix('%') {
            let pct = prefix.trim().parse::<f64>().ok()?;
            return pct.is_finite().then_some(Position::Percent(pct));
        }
        s.parse::<i64>().ok().map(Position::Pixels)
    }

    /// Resolve against a dimension in pixels.
    ///
    /// Percentages truncate toward zero rather than flooring, so `-0.5%` of
    /// 1000 resolves to -5 and `-0.05%` to 0. Only negative percentages are
    /// affected, and any negative result is clamped into the frame later.
    pub fn resolve(self, base: u32) -> i64 {
        match self {
            Position::Pixels(px) => px,
            Position::Percent(pct) => (base as f64 * pct / 100.0) as i64,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::Pixels(0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Pixels(px) => write!(f, "{px}"),
            Position::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// How the background of an overlay reaches the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// `dst = dst * (1 - alpha) + bg * alpha` under the patch, strokes opaque.
    #[default]
    Blend,
    /// Opaque patch copy: the background is either fully `bg` (`alpha > 0`) or transparent.
    Stamp,
}

impl CompositeMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "blend" => Some(CompositeMode::Blend),
            "stamp" | "opaque" => Some(CompositeMode::Stamp),
            _ => None,
        }
    }
}

/// One overlay entry as authored, with defaults applied.
///
/// Out-of-range values are kept as written; they are saturated when the
/// overlay is rendered and composited.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Text template; may contain metadata tokens and strftime directives.
    pub text: String,
    /// Glyph luminance.
    pub fg: i64,
    /// Background luminance; meaningful only when `has_bg`.
    pub bg: i64,
    pub has_bg: bool,
    /// Background blend weight (1.0 = opaque fill).
    pub alpha: f64,
    pub scale: f64,
    pub thickness: i64,
    /// Rectangle stroke width; meaningful only when `has_border`.
    pub border_width: i64,
    pub border_color: i64,
    pub has_border: bool,
    pub x: Position,
    /// Baseline row of the text, not the top of the patch.
    pub y: Position,
    pub update_interval_ms: u64,
    /// Template contains a format directive and must be re-rendered periodically.
    pub is_dynamic: bool,
    pub mode: CompositeMode,
}

impl OverlayConfig {
    /// Overlay with every optional field at its default.
    ///
    /// # Example
    /// ```rust
    /// use burnin::config::OverlayConfig;
    ///
    /// let cfg = OverlayConfig::new("%H:%M");
    /// assert!(cfg.is_dynamic);
    /// assert!(!cfg.has_bg);
    /// assert_eq!(cfg.update_interval_ms, 1000);
    /// ```
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            is_dynamic: text.contains('%'),
            text,
            fg: DEFAULT_FG,
            bg: 0,
            has_bg: false,
            alpha: DEFAULT_ALPHA,
            scale: DEFAULT_SCALE,
            thickness: DEFAULT_THICKNESS,
            border_width: 0,
            border_color: 0,
            has_border: false,
            x: Position::default(),
            y: Position::default(),
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            mode: CompositeMode::default(),
        }
    }
}

/// Load overlays from a parameter tree.
///
/// Accepts either a bare array of overlay objects or an object holding an
/// `"overlays"` array. Unknown keys are ignored; numbers may be given as JSON
/// numbers or numeric strings.
///
/// # Example
/// ```rust
/// use burnin::config::{Position, load_overlays};
/// use serde_json::json;
///
/// let overlays = load_overlays(&json!([
///     { "text": "CAM 1", "bg": 0, "x": "50%", "y": 40 },
///     { "text": "%frame", "border_width": "2" },
/// ]))?;
/// assert_eq!(overlays.len(), 2);
/// assert!(overlays[0].has_bg && !overlays[0].is_dynamic);
/// assert_eq!(overlays[0].x, Position::Percent(50.0));
/// assert!(overlays[1].has_border && overlays[1].is_dynamic);
/// # Ok::<(), burnin::ConfigError>(())
/// ```
pub fn load_overlays(params: &Value) -> Result<Vec<OverlayConfig>, ConfigError> {
    let list = match params {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("overlays") {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(ConfigError::NotAList(kind_of(other))),
            None => return Err(ConfigError::NotAList("object without `overlays`")),
        },
        other => return Err(ConfigError::NotAList(kind_of(other))),
    };
    list.iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => load_one(index, map),
            _ => Err(ConfigError::NotAnObject { index }),
        })
        .collect()
}

fn load_one(index: usize, map: &Map<String, Value>) -> Result<OverlayConfig, ConfigError> {
    let fields = Fields { index, map };
    let text = fields
        .string("text")?
        .ok_or(ConfigError::MissingField { index, field: "text" })?;
    let mut cfg = OverlayConfig::new(text);

    if let Some(fg) = fields.int("fg")? {
        cfg.fg = fg;
    }
    if let Some(bg) = fields.int("bg")? {
        cfg.bg = bg;
        cfg.has_bg = true;
    }
    if let Some(scale) = fields.float("scale")? {
        cfg.scale = scale;
    }
    if let Some(thickness) = fields.int("thickness")? {
        cfg.thickness = thickness;
    }
    if let Some(alpha) = fields.float("alpha")? {
        if !(0.0..=1.0).contains(&alpha) {
            tracing::warn!(index, alpha, "overlay alpha outside [0, 1]; blend will saturate");
        }
        cfg.alpha = alpha;
    }
    if let Some(x) = fields.position("x")? {
        cfg.x = x;
    }
    if let Some(y) = fields.position("y")? {
        cfg.y = y;
    }
    if let Some(interval) = fields.int("update_interval")? {
        if interval < 0 {
            tracing::warn!(index, interval, "negative update_interval treated as 0");
        }
        cfg.update_interval_ms = interval.max(0) as u64;
    }
    if let Some(width) = fields.int("border_width")? {
        cfg.border_width = width;
        cfg.has_border = width > 0;
        cfg.border_color = fields.int("border_color")?.unwrap_or(0);
    }
    if let Some(mode) = fields.string("mode")? {
        cfg.mode = CompositeMode::parse(&mode).ok_or_else(|| ConfigError::InvalidValue {
            index,
            field: "mode",
            expected: "composite mode (blend|stamp)",
            value: mode.clone(),
        })?;
    }
    Ok(cfg)
}

struct Fields<'a> {
    index: usize,
    map: &'a Map<String, Value>,
}

impl Fields<'_> {
    fn invalid(&self, field: &'static str, expected: &'static str, value: &Value) -> ConfigError {
        ConfigError::InvalidValue {
            index: self.index,
            field,
            expected,
            value: value.to_string(),
        }
    }

    fn string(&self, field: &'static str) -> Result<Option<String>, ConfigError> {
        match self.map.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.invalid(field, "string", other)),
        }
    }

    fn int(&self, field: &'static str) -> Result<Option<i64>, ConfigError> {
        let value = match self.map.get(field) {
            None => return Ok(None),
            Some(v) => v,
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(field, "integer", value))
    }

    fn float(&self, field: &'static str) -> Result<Option<f64>, ConfigError> {
        let value = match self.map.get(field) {
            None => return Ok(None),
            Some(v) => v,
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| self.invalid(field, "number", value))
    }

    fn position(&self, field: &'static str) -> Result<Option<Position>, ConfigError> {
        let value = match self.map.get(field) {
            None => return Ok(None),
            Some(v) => v,
        };
        let parsed = match value {
            Value::String(s) => Position::parse(s),
            Value::Number(n) => n.as_i64().map(Position::Pixels),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(field, "position (<int> or <number>%)", value))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_optionals() {
        let cfg = &load_overlays(&json!([{ "text": "HELLO" }])).unwrap()[0];
        assert_eq!(cfg.fg, 255);
        assert!(!cfg.has_bg);
        assert_eq!(cfg.alpha, 0.5);
        assert_eq!(cfg.scale, 1.0);
        assert_eq!(cfg.thickness, 2);
        assert!(!cfg.has_border);
        assert_eq!(cfg.x, Position::Pixels(0));
        assert_eq!(cfg.y, Position::Pixels(0));
        assert_eq!(cfg.update_interval_ms, 1000);
        assert!(!cfg.is_dynamic);
        assert_eq!(cfg.mode, CompositeMode::Blend);
    }

    #[test]
    fn zero_background_is_present_not_absent() {
        let cfgs = load_overlays(&json!([
            { "text": "a", "bg": 0 },
            { "text": "b" },
        ]))
        .unwrap();
        assert!(cfgs[0].has_bg);
        assert_eq!(cfgs[0].bg, 0);
        assert!(!cfgs[1].has_bg);
    }

    #[test]
    fn border_color_defaults_to_black() {
        let cfg = &load_overlays(&json!([{ "text": "a", "border_width": 3 }])).unwrap()[0];
        assert!(cfg.has_border);
        assert_eq!(cfg.border_width, 3);
        assert_eq!(cfg.border_color, 0);

        let cfg = &load_overlays(&json!([{ "text": "a", "border_width": 0, "border_color": 9 }]))
            .unwrap()[0];
        assert!(!cfg.has_border);
    }

    #[test]
    fn missing_text_is_fatal() {
        let err = load_overlays(&json!([{ "text": "ok" }, { "fg": 10 }])).unwrap_err();
        assert_eq!(err, ConfigError::MissingField { index: 1, field: "text" });
    }

    #[test]
    fn non_numeric_values_are_fatal() {
        let err = load_overlays(&json!([{ "text": "a", "fg": "bright" }])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "fg", .. }));
        let err = load_overlays(&json!([{ "text": "a", "scale": [1] }])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "scale", .. }));
        let err = load_overlays(&json!([{ "text": "a", "x": "middle" }])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "x", .. }));
        let err = load_overlays(&json!([{ "text": "a", "mode": "xor" }])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "mode", .. }));
    }

    #[test]
    fn string_encoded_numbers_are_accepted() {
        let cfg = &load_overlays(&json!({ "overlays": [{
            "text": "a", "fg": "200", "alpha": "0.25", "update_interval": "250",
            "x": 12, "y": "10%", "unknown": true
        }]}))
        .unwrap()[0];
        assert_eq!(cfg.fg, 200);
        assert_eq!(cfg.alpha, 0.25);
        assert_eq!(cfg.update_interval_ms, 250);
        assert_eq!(cfg.x, Position::Pixels(12));
        assert_eq!(cfg.y, Position::Percent(10.0));
    }

    #[test]
    fn out_of_range_values_are_kept() {
        let cfg = &load_overlays(&json!([{ "text": "a", "fg": 400, "alpha": 1.5 }])).unwrap()[0];
        assert_eq!(cfg.fg, 400);
        assert_eq!(cfg.alpha, 1.5);
    }

    #[test]
    fn order_is_preserved() {
        let cfgs = load_overlays(&json!([{ "text": "1" }, { "text": "2" }, { "text": "3" }])).unwrap();
        let texts: Vec<_> = cfgs.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["1", "2", "3"]);
    }

    #[test]
    fn rejects_non_list_trees() {
        assert_eq!(load_overlays(&json!("x")).unwrap_err(), ConfigError::NotAList("string"));
        assert_eq!(
            load_overlays(&json!([1])).unwrap_err(),
            ConfigError::NotAnObject { index: 0 }
        );
    }

    #[test]
    fn percent_resolution_truncates() {
        assert_eq!(Position::Percent(25.0).resolve(800), 200);
        assert_eq!(Position::Percent(100.0).resolve(800), 800);
        assert_eq!(Position::Percent(33.3).resolve(100), 33);
        assert_eq!(Position::Pixels(-5).resolve(100), -5);
        assert_eq!(Position::Percent(-0.05).resolve(1000), 0);
        assert_eq!(Position::Percent(-0.25).resolve(1000), -2);
    }
}
