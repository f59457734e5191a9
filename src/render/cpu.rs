//! Software map renderer backed by `vello_cpu`.
//!
//! Draws a [`MapStyle`] (background, graticule, markers) through Web Mercator. Camera moves are
//! reported asynchronously: a configurable number of transition frames precede
//! [`RendererEvent::MoveEnd`], then a number of loading frames precede the first fully loaded
//! frame. Readback is bottom-up, like a GL framebuffer, and is delivered in fixed-size chunks that
//! need not align with rows.

use std::time::Duration;

use vello_cpu::kurbo::Shape as _;

use crate::foundation::core::{Camera, LngLat, PixelSize, Point};
use crate::foundation::error::{MapError, MapResult};
use crate::geo::projection::{Projection, WebMercator};
use crate::render::backend::{
    MapRenderer, PixelCapture, RenderStatus, RenderTarget, RendererEvent, RowOrder,
};
use crate::render::style::MapStyle;
use crate::stream::{ChunkedBytes, PixelSource, flip_rows};

#[derive(Clone, Debug)]
pub struct CpuRendererOpts {
    pub style: MapStyle,
    /// Frames drawn while a camera move animates, before `MoveEnd`.
    pub transition_frames: u32,
    /// Frames drawn after `MoveEnd` while resources are still loading.
    pub load_frames: u32,
    /// Size of each chunk handed out by a capture.
    pub capture_chunk_bytes: usize,
    /// Largest render target edge.
    pub max_renderbuffer_size: u32,
}

impl Default for CpuRendererOpts {
    fn default() -> Self {
        Self {
            style: MapStyle::default(),
            transition_frames: 1,
            load_frames: 1,
            capture_chunk_bytes: 64 * 1024,
            max_renderbuffer_size: 4096,
        }
    }
}

struct CpuTarget {
    id: u64,
    shape: PixelSize,
    pixmap: vello_cpu::Pixmap,
}

pub struct CpuMapRenderer {
    opts: CpuRendererOpts,
    projection: WebMercator,
    camera: Camera,
    pixel_ratio: f64,
    target: Option<CpuTarget>,
    next_target_id: u64,
    transition_left: Option<u32>,
    loading_left: u32,
    needs_redraw: bool,
    frames_drawn: u64,
}

impl CpuMapRenderer {
    pub fn new(opts: CpuRendererOpts) -> MapResult<Self> {
        opts.style.validate()?;
        if opts.capture_chunk_bytes == 0 {
            return Err(MapError::configuration(
                "capture chunk size must be non-zero",
            ));
        }
        if opts.max_renderbuffer_size == 0 || opts.max_renderbuffer_size > u32::from(u16::MAX) {
            return Err(MapError::configuration(format!(
                "max renderbuffer size must be within 1..={}",
                u16::MAX
            )));
        }
        Ok(Self {
            opts,
            projection: WebMercator::default(),
            camera: Camera::new(LngLat::default(), 0.0),
            pixel_ratio: 1.0,
            target: None,
            next_target_id: 1,
            transition_left: None,
            loading_left: 0,
            needs_redraw: false,
            frames_drawn: 0,
        })
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn has_bound_target(&self) -> bool {
        self.target.is_some()
    }

    fn draw(&mut self) -> MapResult<()> {
        let target = self
            .target
            .as_mut()
            .ok_or_else(|| MapError::renderer("draw requested with no render target bound"))?;
        paint_frame(
            &self.opts.style,
            &self.camera,
            self.pixel_ratio,
            &mut target.pixmap,
        );
        self.needs_redraw = false;
        self.frames_drawn += 1;
        Ok(())
    }
}

impl Projection for CpuMapRenderer {
    fn set_zoom(&mut self, zoom: f64) {
        self.projection.set_zoom(zoom);
    }

    fn zoom(&self) -> f64 {
        self.projection.zoom()
    }

    fn project(&self, lnglat: LngLat) -> Point {
        self.projection.project(lnglat)
    }

    fn unproject(&self, point: Point) -> LngLat {
        self.projection.unproject(point)
    }
}

impl MapRenderer for CpuMapRenderer {
    fn resize(&mut self, shape: PixelSize, pixel_ratio: f64) -> MapResult<()> {
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(MapError::configuration(format!(
                "pixel ratio must be positive (got {pixel_ratio})"
            )));
        }
        if let Some(t) = &self.target
            && t.shape != shape
        {
            return Err(MapError::renderer(format!(
                "resize to {}x{} does not match bound target {}x{}",
                shape.width, shape.height, t.shape.width, t.shape.height
            )));
        }
        self.pixel_ratio = pixel_ratio;
        self.needs_redraw = true;
        Ok(())
    }

    fn jump_to(&mut self, camera: &Camera) -> MapResult<()> {
        if !camera.center.is_finite() || !camera.zoom.is_finite() {
            return Err(MapError::renderer(format!("invalid camera {camera:?}")));
        }
        self.camera = *camera;
        self.projection.set_zoom(camera.zoom);
        self.transition_left = Some(self.opts.transition_frames);
        self.loading_left = 0;
        self.needs_redraw = true;
        Ok(())
    }

    fn create_target(&mut self, shape: PixelSize) -> MapResult<RenderTarget> {
        shape.validate()?;
        if let Some(t) = &self.target {
            return Err(MapError::renderer(format!(
                "render target {} is still bound",
                t.id
            )));
        }
        let max = self.opts.max_renderbuffer_size;
        if shape.width > max || shape.height > max {
            return Err(MapError::renderer(format!(
                "render target {}x{} exceeds max renderbuffer size {max}",
                shape.width, shape.height
            )));
        }
        // `max` is capped at u16::MAX in `new`.
        let (w, h) = (shape.width as u16, shape.height as u16);

        let id = self.next_target_id;
        self.next_target_id += 1;
        self.target = Some(CpuTarget {
            id,
            shape,
            pixmap: vello_cpu::Pixmap::new(w, h),
        });
        Ok(RenderTarget::new(id, shape))
    }

    fn release_target(&mut self, target: RenderTarget) -> MapResult<()> {
        match &self.target {
            Some(t) if t.id == target.id() => {
                self.target = None;
                Ok(())
            }
            _ => Err(MapError::renderer(format!(
                "render target {} is not bound",
                target.id()
            ))),
        }
    }

    // Nothing happens between calls, so an empty queue is reported immediately instead of
    // waiting out `timeout`.
    fn next_event(&mut self, _timeout: Duration) -> MapResult<Option<RendererEvent>> {
        if let Some(left) = self.transition_left {
            if left > 0 {
                self.transition_left = Some(left - 1);
                self.draw()?;
                return Ok(Some(RendererEvent::Render));
            }
            self.transition_left = None;
            self.loading_left = self.opts.load_frames;
            self.needs_redraw = true;
            return Ok(Some(RendererEvent::MoveEnd));
        }
        if self.loading_left > 0 {
            self.loading_left -= 1;
            self.draw()?;
            return Ok(Some(RendererEvent::Render));
        }
        if self.needs_redraw {
            self.draw()?;
            return Ok(Some(RendererEvent::Render));
        }
        Ok(None)
    }

    fn status(&self) -> RenderStatus {
        RenderStatus {
            animating: self.transition_left.is_some(),
            loaded: self.loading_left == 0,
        }
    }

    fn max_renderbuffer_size(&self) -> u32 {
        self.opts.max_renderbuffer_size
    }
}

impl PixelCapture for CpuMapRenderer {
    fn native_row_order(&self) -> RowOrder {
        RowOrder::BottomUp
    }

    fn capture(
        &mut self,
        target: &RenderTarget,
        flip_y: bool,
    ) -> MapResult<Box<dyn PixelSource>> {
        let bound = self
            .target
            .as_ref()
            .filter(|t| t.id == target.id())
            .ok_or_else(|| {
                MapError::renderer(format!("render target {} is not bound", target.id()))
            })?;

        let mut data = unpremultiply(bound.pixmap.data_as_u8_slice());
        // Pixmap rows are stored top-down; an unflipped readback is bottom-up.
        if !flip_y {
            flip_rows(&mut data, bound.shape.row_stride());
        }
        Ok(Box::new(ChunkedBytes::new(
            data,
            self.opts.capture_chunk_bytes,
        )?))
    }
}

fn paint_frame(
    style: &MapStyle,
    camera: &Camera,
    pixel_ratio: f64,
    pixmap: &mut vello_cpu::Pixmap,
) {
    let (w, h) = (pixmap.width(), pixmap.height());
    let (fw, fh) = (f64::from(w), f64::from(h));
    let proj = WebMercator::new(camera.zoom);
    let center = proj.project(camera.center);
    let css_w = fw / pixel_ratio;
    let css_h = fh / pixel_ratio;
    let origin = Point::new(center.x - css_w / 2.0, center.y - css_h / 2.0);
    let to_device = |p: Point| {
        vello_cpu::kurbo::Point::new(
            (p.x - origin.x) * pixel_ratio,
            (p.y - origin.y) * pixel_ratio,
        )
    };

    pixmap.data_as_u8_slice_mut().fill(0);
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint(color(style.background));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, fw, fh));

    let half = style.line_width * pixel_ratio / 2.0;
    if half > 0.0 {
        let north_west = proj.unproject(origin);
        let south_east = proj.unproject(Point::new(origin.x + css_w, origin.y + css_h));
        ctx.set_paint(color(style.graticule));
        for lng in grid_lines(north_west.lng, south_east.lng, style.graticule_step_deg) {
            let x = to_device(proj.project(LngLat::new(lng, 0.0))).x;
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x - half, 0.0, x + half, fh));
        }
        for lat in grid_lines(south_east.lat, north_west.lat, style.graticule_step_deg) {
            let y = to_device(proj.project(LngLat::new(0.0, lat))).y;
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, y - half, fw, y + half));
        }
    }

    for marker in &style.markers {
        let c = to_device(proj.project(marker.position));
        ctx.set_paint(color(marker.color));
        ctx.fill_path(&vello_cpu::kurbo::Circle::new(c, marker.radius * pixel_ratio).to_path(0.1));
    }

    ctx.flush();
    ctx.render_to_pixmap(pixmap);
}

/// Upper bound on graticule lines per axis in one frame.
const MAX_GRID_LINES: usize = 4096;

fn grid_lines(from: f64, to: f64, step: f64) -> impl Iterator<Item = f64> {
    let first = (from / step).ceil() as i64;
    let last = (to / step).floor() as i64;
    (first..=last).take(MAX_GRID_LINES).map(move |k| k as f64 * step)
}

fn color([r, g, b, a]: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn unpremultiply(src: &[u8]) -> Vec<u8> {
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        match a {
            255 => {}
            0 => px[..3].fill(0),
            _ => {
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::Marker;
    use crate::stream::collect_all;

    fn renderer(style: MapStyle) -> CpuMapRenderer {
        CpuMapRenderer::new(CpuRendererOpts {
            style,
            transition_frames: 2,
            load_frames: 1,
            capture_chunk_bytes: 7,
            max_renderbuffer_size: 256,
        })
        .unwrap()
    }

    fn plain_style() -> MapStyle {
        MapStyle {
            background: [10, 20, 30, 255],
            graticule_step_deg: 1000.0,
            ..MapStyle::default()
        }
    }

    fn drain_events(r: &mut CpuMapRenderer) -> Vec<(RendererEvent, RenderStatus)> {
        let mut out = Vec::new();
        while let Some(ev) = r.next_event(Duration::ZERO).unwrap() {
            out.push((ev, r.status()));
        }
        out
    }

    fn pixel(data: &[u8], shape: PixelSize, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * shape.width as usize + x as usize) * 4;
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    #[test]
    fn move_reports_transition_then_settle_then_load() {
        let mut r = renderer(plain_style());
        let shape = PixelSize::new(16, 8);
        let t = r.create_target(shape).unwrap();
        r.resize(shape, 1.0).unwrap();
        r.jump_to(&Camera::new(LngLat::new(10.5, 45.5), 6.0)).unwrap();

        let events = drain_events(&mut r);
        let kinds: Vec<RendererEvent> = events.iter().map(|(e, _)| *e).collect();
        assert_eq!(
            kinds,
            vec![
                RendererEvent::Render,
                RendererEvent::Render,
                RendererEvent::MoveEnd,
                RendererEvent::Render,
            ]
        );
        assert!(events[0].1.animating);
        assert!(!events[2].1.animating);
        assert!(events[3].1.loaded && !events[3].1.animating);
        r.release_target(t).unwrap();
    }

    #[test]
    fn only_one_target_may_be_bound() {
        let mut r = renderer(plain_style());
        let t = r.create_target(PixelSize::new(4, 4)).unwrap();
        assert!(r.create_target(PixelSize::new(4, 4)).is_err());
        r.release_target(t).unwrap();
        assert!(!r.has_bound_target());
        let t2 = r.create_target(PixelSize::new(4, 4)).unwrap();
        assert_ne!(t2.id(), 1);
        r.release_target(t2).unwrap();
        assert!(r.create_target(PixelSize::new(512, 4)).is_err());
    }

    #[test]
    fn capture_honours_flip_and_style() {
        let mut style = plain_style();
        style.markers.push(Marker {
            position: LngLat::new(10.5, 45.5),
            radius: 3.0,
            color: [200, 0, 0, 255],
        });
        let mut r = renderer(style);
        let shape = PixelSize::new(32, 20);
        let t = r.create_target(shape).unwrap();
        r.resize(shape, 1.0).unwrap();
        r.jump_to(&Camera::new(LngLat::new(10.5, 45.5), 8.0)).unwrap();
        drain_events(&mut r);

        let top_down = collect_all(&mut r.capture(&t, true).unwrap()).unwrap();
        let bottom_up = collect_all(&mut r.capture(&t, false).unwrap()).unwrap();
        assert_eq!(top_down.len() as u64, shape.byte_len());

        let mut reflipped = bottom_up.clone();
        flip_rows(&mut reflipped, shape.row_stride());
        assert_eq!(reflipped, top_down);

        assert_eq!(pixel(&top_down, shape, 0, 0), [10, 20, 30, 255]);
        assert_eq!(pixel(&top_down, shape, 16, 10), [200, 0, 0, 255]);
        r.release_target(t).unwrap();
    }

    #[test]
    fn capture_of_unbound_target_fails() {
        let mut r = renderer(plain_style());
        let t = r.create_target(PixelSize::new(4, 4)).unwrap();
        let stale = RenderTarget::new(t.id(), t.shape());
        r.release_target(t).unwrap();
        assert!(r.capture(&stale, true).is_err());
        assert!(r.release_target(stale).is_err());
    }

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        assert_eq!(unpremultiply(&[64, 0, 0, 128]), vec![128, 0, 0, 128]);
        assert_eq!(unpremultiply(&[9, 9, 9, 0]), vec![0, 0, 0, 0]);
        assert_eq!(unpremultiply(&[1, 2, 3, 255]), vec![1, 2, 3, 255]);
    }

    #[test]
    fn grid_lines_cover_closed_range() {
        let lines: Vec<f64> = grid_lines(-1.5, 2.0, 1.0).collect();
        assert_eq!(lines, vec![-1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn grid_lines_are_capped() {
        assert_eq!(grid_lines(-180.0, 180.0, 1e-9).count(), MAX_GRID_LINES);
        assert_eq!(grid_lines(-f64::MAX, f64::MAX, 1e-300).count(), MAX_GRID_LINES);
    }

    #[test]
    fn renderer_rejects_too_fine_graticule() {
        let style = MapStyle {
            graticule_step_deg: 1e-12,
            ..MapStyle::default()
        };
        assert!(matches!(
            CpuMapRenderer::new(CpuRendererOpts {
                style,
                ..CpuRendererOpts::default()
            }),
            Err(MapError::Configuration(_))
        ));
    }
}
