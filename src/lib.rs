//! Mapshot renders map images larger than a single GPU render target.
//!
//! A job runs in three steps:
//!
//! - [`calc_viewport`] turns a geographic box and an output size into a camera
//! - [`plan_sections`] splits the output into row bands that fit the pixel budget
//! - [`CaptureScheduler`] captures each band in order and streams row-aligned pixels into an
//!   [`ImageEncoder`]
//!
//! [`export_map`] wires the three together.
#![forbid(unsafe_code)]

pub mod capture;
pub mod config;
pub mod encode;
pub mod export;
mod foundation;
pub mod geo;
pub mod plan;
pub mod render;
pub mod stream;
pub mod units;

pub use crate::foundation::core::{
    BYTES_PER_PIXEL, BoundingBox, Camera, LngLat, PixelSize, Point, Vec2, Viewport,
};
pub use crate::foundation::error::{MapError, MapResult};

pub use crate::capture::scheduler::{CaptureOpts, CaptureScheduler, pump};
pub use crate::capture::state::{PhaseTimer, SectionMachine, SectionPhase};
pub use crate::config::ExportConfig;
pub use crate::encode::buffered::BufferedImageEncoder;
pub use crate::encode::output::OutputTarget;
pub use crate::encode::png_stream::PngStreamEncoder;
pub use crate::encode::sink::{ChannelLayout, EncoderConfig, ImageEncoder, InMemoryEncoder};
pub use crate::encode::{ImageFormat, create_encoder};
pub use crate::export::{ExportStats, export_map};
pub use crate::geo::projection::{Projection, WebMercator};
pub use crate::geo::viewport::{REFERENCE_ZOOM, calc_viewport};
pub use crate::plan::sections::{PixelBudget, Section, SectionPlan, plan_sections};
pub use crate::render::backend::{
    MapBackend, MapRenderer, PixelCapture, RenderStatus, RenderTarget, RendererEvent, RowOrder,
};
pub use crate::render::cpu::{CpuMapRenderer, CpuRendererOpts};
pub use crate::render::style::{MIN_GRATICULE_STEP_DEG, MapStyle, Marker};
pub use crate::stream::limit::RowLimiter;
pub use crate::stream::{ChunkedBytes, PixelSource, collect_all, flip_rows};
