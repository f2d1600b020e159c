//! Host-facing post-processing stage contract and the overlay stage.

use std::{collections::HashMap, sync::Arc};

use burnin_core::prelude::{FourCc, FrameBuffer, Metrics};
use serde_json::Value;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::compositor::{Compositor, LumaGeometry, OverlayStats};
use crate::config::{OverlayConfig, load_overlays};
use crate::error::StageError;
use crate::raster::{BitmapFont, TextRasterizer};
use crate::text::FrameInfo;

/// Name the overlay stage registers under.
pub const OVERLAY_STAGE_NAME: &str = "overlay_cv";

/// Geometry of a configured stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Luma row pitch in bytes.
    pub stride: usize,
}

/// Pixel format plus geometry of a configured stream.
///
/// With the `serde` feature a host can describe its stream in JSON, with the
/// pixel format written as its four-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfiguration {
    pub pixel_format: FourCc,
    pub info: StreamInfo,
}

impl StreamConfiguration {
    /// Planar `YU12` stream with the given luma stride.
    pub fn yuv420(width: u32, height: u32, stride: usize) -> Self {
        Self {
            pixel_format: FourCc::YU12,
            info: StreamInfo {
                width,
                height,
                stride,
            },
        }
    }
}

/// What a stage can ask of its host at configure time.
pub trait StageHost {
    /// The main output stream, if the pipeline has one.
    fn main_stream(&self) -> Option<StreamConfiguration>;
}

/// A bare stream configuration acts as a single-stream host.
impl StageHost for StreamConfiguration {
    fn main_stream(&self) -> Option<StreamConfiguration> {
        Some(*self)
    }
}

/// A finished capture: the main stream buffer plus its metadata.
#[derive(Debug)]
pub struct CompletedRequest {
    pub frame: FrameBuffer,
    pub info: FrameInfo,
}

impl CompletedRequest {
    pub fn new(frame: FrameBuffer, info: FrameInfo) -> Self {
        Self { frame, info }
    }
}

/// A post-processing stage driven by the host pipeline.
///
/// The host calls `read` once with the stage's parameters, `configure` after
/// streams are set up, then `process` serially for every completed request.
pub trait PostProcessingStage: Send {
    fn name(&self) -> &'static str;

    /// Load stage parameters.
    fn read(&mut self, params: &Value) -> Result<(), StageError>;

    /// Bind to the host's configured streams.
    fn configure(&mut self, host: &dyn StageHost) -> Result<(), StageError>;

    /// Mutate `request` in place. `Ok(true)` asks the host to drop the frame.
    fn process(&mut self, request: &mut CompletedRequest) -> Result<bool, StageError>;
}

/// Burns configured text overlays into the luma plane of the main stream.
///
/// # Example
/// ```rust
/// use burnin::stage::{CompletedRequest, OverlayStage, PostProcessingStage, StreamConfiguration};
/// use burnin::text::FrameInfo;
/// use burnin_core::prelude::*;
/// use serde_json::json;
///
/// let mut stage = OverlayStage::new();
/// stage.read(&json!([{ "text": "CAM 1", "bg": 0, "alpha": 1.0, "x": 8, "y": 40 }]))?;
/// stage.configure(&StreamConfiguration::yuv420(320, 240, 320))?;
///
/// let fmt = MediaFormat::new(FourCc::YU12, Resolution::new(320, 240).unwrap(), ColorSpace::Bt709);
/// let frame = FrameBuffer::yuv420(FrameMeta::new(fmt), 320).unwrap();
/// let mut request = CompletedRequest::new(frame, FrameInfo::default());
/// assert!(!stage.process(&mut request)?);
/// assert_eq!(stage.stats().renders, 1);
/// # Ok::<(), burnin::StageError>(())
/// ```
pub struct OverlayStage {
    configs: Vec<OverlayConfig>,
    raster: Option<Box<dyn TextRasterizer>>,
    clock: Box<dyn Clock>,
    metrics: Arc<Metrics>,
    stream: Option<StreamConfiguration>,
    compositor: Option<Compositor>,
}

impl OverlayStage {
    /// Stage using the built-in bitmap font and the system clock.
    pub fn new() -> Self {
        Self::with_parts(Box::new(BitmapFont), Box::new(SystemClock::new()))
    }

    /// Stage with a custom rasterizer and clock.
    pub fn with_parts(raster: Box<dyn TextRasterizer>, clock: Box<dyn Clock>) -> Self {
        Self {
            configs: Vec::new(),
            raster: Some(raster),
            clock,
            metrics: Arc::new(Metrics::default()),
            stream: None,
            compositor: None,
        }
    }

    /// Overlays loaded by the last `read`.
    pub fn overlays(&self) -> &[OverlayConfig] {
        &self.configs
    }

    pub fn stats(&self) -> OverlayStats {
        OverlayStats::from(self.metrics.as_ref())
    }

    fn take_rasterizer(&mut self) -> Option<Box<dyn TextRasterizer>> {
        self.raster
            .take()
            .or_else(|| self.compositor.take().map(Compositor::into_rasterizer))
    }
}

impl Default for OverlayStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PostProcessingStage for OverlayStage {
    fn name(&self) -> &'static str {
        OVERLAY_STAGE_NAME
    }

    fn read(&mut self, params: &Value) -> Result<(), StageError> {
        self.configs = load_overlays(params)?;
        if let Some(compositor) = self.compositor.take() {
            self.raster = Some(compositor.into_rasterizer());
        }
        Ok(())
    }

    fn configure(&mut self, host: &dyn StageHost) -> Result<(), StageError> {
        let stream = host.main_stream().ok_or(StageError::UnsupportedFormat(None))?;
        let StreamInfo {
            width,
            height,
            stride,
            ..
        } = stream.info;
        if !stream.pixel_format.is_yuv420_class() || width == 0 || height == 0 || stride < width as usize {
            return Err(StageError::UnsupportedFormat(Some(stream.pixel_format)));
        }
        let raster = self
            .take_rasterizer()
            .ok_or(StageError::NotConfigured(OVERLAY_STAGE_NAME))?;
        let geometry = LumaGeometry {
            width,
            height,
            stride,
        };
        let compositor = Compositor::new(&self.configs, geometry, raster).with_metrics(self.metrics.clone());
        let dynamic = compositor.overlays().iter().filter(|o| o.is_dynamic()).count();
        info!(
            stage = OVERLAY_STAGE_NAME,
            format = %stream.pixel_format,
            width,
            height,
            stride,
            static_overlays = compositor.overlays().len() - dynamic,
            dynamic_overlays = dynamic,
            "overlay stage configured"
        );
        self.stream = Some(stream);
        self.compositor = Some(compositor);
        Ok(())
    }

    fn process(&mut self, request: &mut CompletedRequest) -> Result<bool, StageError> {
        let (Some(compositor), Some(stream)) = (self.compositor.as_mut(), self.stream) else {
            return Err(StageError::NotConfigured(OVERLAY_STAGE_NAME));
        };
        let format = request.frame.meta().format;
        if format.code != stream.pixel_format {
            return Err(StageError::UnsupportedFormat(Some(format.code)));
        }
        let (width, height) = (format.resolution.width.get(), format.resolution.height.get());
        if (width, height) != (stream.info.width, stream.info.height) {
            return Err(StageError::FrameGeometry(format!(
                "frame is {width}x{height}, stream configured for {}x{}",
                stream.info.width, stream.info.height
            )));
        }
        let expected = stream.info.stride;
        let mut luma = request
            .frame
            .plane_mut(0)
            .ok_or_else(|| StageError::FrameGeometry("frame has no luma plane".into()))?;
        if luma.stride() != expected {
            return Err(StageError::FrameGeometry(format!(
                "luma stride {} differs from configured stride {expected}",
                luma.stride()
            )));
        }
        compositor.process(&mut luma, &request.info, self.clock.as_ref())?;
        Ok(false)
    }
}

/// Builds a fresh stage instance.
pub type StageFactory = Box<dyn Fn() -> Box<dyn PostProcessingStage> + Send + Sync>;

/// Explicit name-to-factory registry, populated at startup.
///
/// # Example
/// ```rust
/// use burnin::stage::StageRegistry;
///
/// let registry = StageRegistry::with_defaults();
/// assert_eq!(registry.names(), ["overlay_cv"]);
/// let stage = registry.create("overlay_cv")?;
/// assert_eq!(stage.name(), "overlay_cv");
/// assert!(registry.create("missing").is_err());
/// # Ok::<(), burnin::StageError>(())
/// ```
#[derive(Default)]
pub struct StageRegistry {
    factories: HashMap<String, StageFactory>,
}

impl StageRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every stage this crate provides.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(OVERLAY_STAGE_NAME, || Box::new(OverlayStage::new()));
        registry
    }

    /// Register (or replace) a factory under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn PostProcessingStage> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Instantiate the stage registered as `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn PostProcessingStage>, StageError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| StageError::UnknownStage(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
