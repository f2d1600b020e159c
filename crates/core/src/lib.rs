#![doc = include_str!("../README.md")]

pub mod buffer;
pub mod format;
pub mod metrics;

pub mod prelude {
    pub use crate::{
        buffer::{FrameBuffer, FrameMeta, Plane, PlaneLayout, PlaneMut, yuv420_layouts},
        format::{ColorSpace, FourCc, MediaFormat, Resolution},
        metrics::Metrics,
    };
}
