use burnin_core::prelude::FourCc;

/// Errors raised while loading the overlay list.
///
/// # Example
/// ```rust
/// use burnin::ConfigError;
///
/// let err = ConfigError::MissingField { index: 2, field: "text" };
/// assert_eq!(err.to_string(), "overlay #2: missing required field `text`");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The parameter tree is not a list of overlay maps.
    #[error("overlay list must be an array of objects (got {0})")]
    NotAList(&'static str),
    /// An entry in the list is not a key/value map.
    #[error("overlay #{index}: entry must be an object")]
    NotAnObject { index: usize },
    /// A required key is absent.
    #[error("overlay #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    /// A key holds a value of the wrong shape.
    #[error("overlay #{index}: field `{field}` is not a valid {expected}: {value}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Errors surfaced through the stage boundary.
///
/// # Example
/// ```rust
/// use burnin::StageError;
/// use burnin_core::prelude::FourCc;
///
/// let err = StageError::UnsupportedFormat(Some(FourCc::RGB24));
/// assert!(err.to_string().contains("RG24"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Overlay configuration could not be parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Main stream is missing or does not carry an 8-bit luma plane.
    #[error("unsupported main stream format: {}", describe_format(.0))]
    UnsupportedFormat(Option<FourCc>),
    /// The luma plane handed to `process` does not match the configured geometry.
    #[error("frame geometry mismatch: {0}")]
    FrameGeometry(String),
    /// `process` was called before `configure`.
    #[error("stage `{0}` used before configure")]
    NotConfigured(&'static str),
    /// No factory registered under the requested name.
    #[error("no stage registered as `{0}`")]
    UnknownStage(String),
}

fn describe_format(code: &Option<FourCc>) -> String {
    match code {
        Some(code) => format!("{code} (only YUV420-class layouts are supported)"),
        None => "no main stream".to_string(),
    }
}
