//! Template expansion for dynamic overlays.
//!
//! Expansion runs in two passes: frame metadata tokens (`%frame`, `%exp`, ...)
//! first, then strftime directives against local wall-clock time.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, format::Item, format::StrftimeItems};

/// Longest strftime output accepted; longer results fall back to the
/// metadata-expanded template.
pub const MAX_STRFTIME_BYTES: usize = 255;

/// Substitutes frame-scoped tokens in a template.
///
/// Implementations must pass unknown tokens through unchanged and must not
/// panic for any input.
pub trait MetadataFormatter {
    fn format(&self, template: &str) -> String;
}

/// Per-frame capture metadata.
///
/// # Example
/// ```rust
/// use burnin::text::{FrameInfo, MetadataFormatter};
///
/// let info = FrameInfo {
///     sequence: 42,
///     exposure_time: 10000.0,
///     analogue_gain: 2.0,
///     ..FrameInfo::default()
/// };
/// assert_eq!(info.format("#%frame exp=%exp ag=%ag %xyz"), "#42 exp=10000.00 ag=2.00 %xyz");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInfo {
    /// Frame sequence number.
    pub sequence: u64,
    /// Measured frame rate.
    pub fps: f32,
    /// Exposure time in microseconds.
    pub exposure_time: f32,
    pub analogue_gain: f32,
    pub digital_gain: f32,
    /// Red and blue colour gains.
    pub colour_gains: [f32; 2],
    /// Focus figure of merit.
    pub focus: f32,
    /// Lens position in dioptres, when the lens reports one.
    pub lens_position: Option<f32>,
    /// Autofocus state name (e.g. "scanning", "focused").
    pub af_state: String,
    pub ae_locked: bool,
}

impl FrameInfo {
    fn token_value(&self, token: &str) -> Option<String> {
        let value = match token {
            "%frame" => self.sequence.to_string(),
            "%fps" => fixed2(self.fps),
            "%exp" => fixed2(self.exposure_time),
            "%ag" => fixed2(self.analogue_gain),
            "%dg" => fixed2(self.digital_gain),
            "%rg" => fixed2(self.colour_gains[0]),
            "%bg" => fixed2(self.colour_gains[1]),
            "%focus" => fixed2(self.focus),
            "%lp" => self
                .lens_position
                .map(fixed2)
                .unwrap_or_else(|| "-".to_string()),
            "%afstate" => self.af_state.clone(),
            "%aelock" => u8::from(self.ae_locked).to_string(),
            _ => return None,
        };
        Some(value)
    }
}

// Longer tokens first so `%afstate` is not shadowed by a shorter prefix.
const TOKENS: [&str; 11] = [
    "%afstate", "%aelock", "%focus", "%frame", "%fps", "%exp", "%ag", "%dg", "%rg", "%bg", "%lp",
];

fn fixed2(v: f32) -> String {
    format!("{v:.2}")
}

impl MetadataFormatter for FrameInfo {
    fn format(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;
        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            match TOKENS.iter().find(|t| tail.starts_with(**t)) {
                Some(token) => {
                    if let Some(value) = self.token_value(token) {
                        out.push_str(&value);
                    }
                    rest = &tail[token.len()..];
                }
                None => {
                    out.push('%');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Run strftime over `template`, returning `None` when the result is unusable.
///
/// Unusable means an invalid directive, an empty result or a result longer
/// than [`MAX_STRFTIME_BYTES`].
pub fn strftime(template: &str, at: &DateTime<FixedOffset>) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", at.format_with_items(items.into_iter())).ok()?;
    (!out.is_empty() && out.len() <= MAX_STRFTIME_BYTES).then_some(out)
}

/// Expand a dynamic template: metadata tokens, then strftime.
///
/// # Example
/// ```rust
/// use burnin::text::{FrameInfo, expand_template};
/// use chrono::{FixedOffset, TimeZone};
///
/// let at = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 5, 1, 13, 4, 5).unwrap();
/// let info = FrameInfo { sequence: 7, ..FrameInfo::default() };
/// assert_eq!(expand_template("%H:%M:%S #%frame", &info, &at), "13:04:05 #7");
/// ```
pub fn expand_template(
    template: &str,
    formatter: &dyn MetadataFormatter,
    at: &DateTime<FixedOffset>,
) -> String {
    let with_metadata = formatter.format(template);
    strftime(&with_metadata, at).unwrap_or(with_metadata)
}
