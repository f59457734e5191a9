//! Web Mercator projection between geographic and world-pixel space.

use std::f64::consts::PI;

use crate::foundation::core::{LngLat, Point};

/// Edge length of one world tile in CSS pixels at zoom 0.
pub const TILE_SIZE: f64 = 512.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Projection capability of a renderer at its current zoom.
///
/// Pixel coordinates are absolute world pixels (CSS units), `y` growing southwards.
pub trait Projection {
    fn set_zoom(&mut self, zoom: f64);

    fn zoom(&self) -> f64;

    /// Scale factor of the current zoom (`2^zoom`).
    fn scale(&self) -> f64 {
        self.zoom().exp2()
    }

    fn project(&self, lnglat: LngLat) -> Point;

    fn unproject(&self, point: Point) -> LngLat;

    /// Inverse of [`Projection::scale`].
    fn scale_to_zoom(&self, scale: f64) -> f64 {
        scale.log2()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WebMercator {
    zoom: f64,
}

impl WebMercator {
    pub fn new(zoom: f64) -> Self {
        Self { zoom }
    }

    /// World edge length in CSS pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.scale()
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Projection for WebMercator {
    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn project(&self, lnglat: LngLat) -> Point {
        let ws = self.world_size();
        let lat = lnglat.lat.clamp(-MAX_LAT, MAX_LAT);
        let x = (180.0 + lnglat.lng) / 360.0 * ws;
        let y = (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0 * ws;
        Point::new(x, y)
    }

    fn unproject(&self, point: Point) -> LngLat {
        let ws = self.world_size();
        let lng = point.x / ws * 360.0 - 180.0;
        let y2 = 180.0 - point.y / ws * 360.0;
        let lat = 360.0 / PI * (y2 * PI / 180.0).exp().atan() - 90.0;
        LngLat::new(lng, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn origin_maps_to_world_center() {
        let m = WebMercator::new(0.0);
        let p = m.project(LngLat::new(0.0, 0.0));
        assert!(close(p.x, 256.0, 1e-9));
        assert!(close(p.y, 256.0, 1e-9));
    }

    #[test]
    fn world_corners() {
        let m = WebMercator::new(1.0);
        let nw = m.project(LngLat::new(-180.0, MAX_LAT));
        assert!(close(nw.x, 0.0, 1e-9));
        assert!(close(nw.y, 0.0, 1e-6));
        let se = m.project(LngLat::new(180.0, -MAX_LAT));
        assert!(close(se.x, 1024.0, 1e-9));
        assert!(close(se.y, 1024.0, 1e-6));
    }

    #[test]
    fn unproject_inverts_project_at_high_zoom() {
        let m = WebMercator::new(20.0);
        for ll in [
            LngLat::new(-74.006, 40.7128),
            LngLat::new(151.2093, -33.8688),
            LngLat::new(0.0, 0.0),
        ] {
            let back = m.unproject(m.project(ll));
            assert!(close(back.lng, ll.lng, 1e-9), "{back:?} vs {ll:?}");
            assert!(close(back.lat, ll.lat, 1e-9), "{back:?} vs {ll:?}");
        }
    }

    #[test]
    fn scale_and_zoom_are_inverse() {
        let mut m = WebMercator::default();
        m.set_zoom(7.25);
        assert!(close(m.scale_to_zoom(m.scale()), 7.25, 1e-12));
    }
}
