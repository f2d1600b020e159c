#![doc = include_str!("../README.md")]

pub mod clock;
pub mod compositor;
pub mod config;
mod error;
pub mod geometry;
pub mod patch;
pub mod raster;
pub mod stage;
pub mod text;

pub use error::{ConfigError, StageError};

pub mod prelude {
    pub use crate::{
        ConfigError, StageError,
        clock::{Clock, ManualClock, SystemClock},
        compositor::{Compositor, LumaGeometry, OverlayOutcome, OverlayStats, Skip},
        config::{CompositeMode, OverlayConfig, Position, load_overlays},
        raster::{BitmapFont, Rect, TextMetrics, TextRasterizer},
        stage::{
            CompletedRequest, OVERLAY_STAGE_NAME, OverlayStage, PostProcessingStage, StageHost,
            StageRegistry, StreamConfiguration, StreamInfo,
        },
        text::{FrameInfo, MetadataFormatter, expand_template},
    };
    pub use burnin_core::prelude::*;
}
