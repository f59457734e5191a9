use std::time::Duration;

use crate::foundation::core::{Camera, PixelSize};
use crate::foundation::error::MapResult;
use crate::geo::projection::Projection;
use crate::stream::PixelSource;

/// Signals a renderer delivers while it works.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererEvent {
    /// Any camera transition started by the last move has finished.
    MoveEnd,
    /// A frame was drawn.
    Render,
}

/// Snapshot of renderer progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStatus {
    /// A camera animation is still running.
    pub animating: bool,
    /// Style and every resource the current view needs are loaded.
    pub loaded: bool,
}

/// Handle to an offscreen render target currently bound on a renderer.
///
/// Only one target may be bound at a time. Hand it back through
/// [`MapRenderer::release_target`] before creating the next one.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderTarget {
    id: u64,
    shape: PixelSize,
}

impl RenderTarget {
    pub fn new(id: u64, shape: PixelSize) -> Self {
        Self { id, shape }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn shape(&self) -> PixelSize {
        self.shape
    }
}

/// Order in which a capture delivers pixel rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrder {
    TopDown,
    BottomUp,
}

/// Camera control and frame production.
pub trait MapRenderer: Projection {
    /// Resize the output to `shape` device pixels at `pixel_ratio` device pixels per CSS pixel.
    fn resize(&mut self, shape: PixelSize, pixel_ratio: f64) -> MapResult<()>;

    /// Move the camera. Completion is reported through [`RendererEvent::MoveEnd`].
    fn jump_to(&mut self, camera: &Camera) -> MapResult<()>;

    /// Create an offscreen target of `shape` and bind it for drawing.
    fn create_target(&mut self, shape: PixelSize) -> MapResult<RenderTarget>;

    /// Unbind and free a target created by [`MapRenderer::create_target`].
    fn release_target(&mut self, target: RenderTarget) -> MapResult<()>;

    /// Wait up to `timeout` for the next signal. `Ok(None)` means nothing arrived in time.
    fn next_event(&mut self, timeout: Duration) -> MapResult<Option<RendererEvent>>;

    fn status(&self) -> RenderStatus;

    /// Largest edge, in pixels, a render target may have.
    fn max_renderbuffer_size(&self) -> u32;
}

/// Pixel readback from a bound render target.
pub trait PixelCapture {
    /// Row order of an unflipped capture.
    fn native_row_order(&self) -> RowOrder;

    /// Read the target's RGBA8 pixels, reversing row order when `flip_y` is set.
    fn capture(&mut self, target: &RenderTarget, flip_y: bool)
    -> MapResult<Box<dyn PixelSource>>;
}

/// A renderer that can also read back what it drew.
pub trait MapBackend: MapRenderer + PixelCapture {}

impl<T: MapRenderer + PixelCapture + ?Sized> MapBackend for T {}
