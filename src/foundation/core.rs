use crate::foundation::error::{MapError, MapResult};

pub use kurbo::{Point, Vec2};

/// Geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

/// Axis-aligned geographic box, `southwest` strictly below-left of `northeast`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    pub southwest: LngLat,
    pub northeast: LngLat,
}

impl BoundingBox {
    /// Create a validated box.
    ///
    /// Fails with a configuration error when either axis is degenerate or inverted.
    pub fn new(southwest: LngLat, northeast: LngLat) -> MapResult<Self> {
        let bbox = Self {
            southwest,
            northeast,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> MapResult<()> {
        if !self.southwest.is_finite() || !self.northeast.is_finite() {
            return Err(MapError::configuration(
                "bounding box coordinates must be finite",
            ));
        }
        if self.southwest.lng >= self.northeast.lng {
            return Err(MapError::configuration(format!(
                "bounding box is degenerate in longitude (west {} >= east {})",
                self.southwest.lng, self.northeast.lng
            )));
        }
        if self.southwest.lat >= self.northeast.lat {
            return Err(MapError::configuration(format!(
                "bounding box is degenerate in latitude (south {} >= north {})",
                self.southwest.lat, self.northeast.lat
            )));
        }
        Ok(())
    }

    pub fn north_west(&self) -> LngLat {
        LngLat::new(self.southwest.lng, self.northeast.lat)
    }

    pub fn south_east(&self) -> LngLat {
        LngLat::new(self.northeast.lng, self.southwest.lat)
    }

    pub fn width_deg(&self) -> f64 {
        (self.northeast.lng - self.southwest.lng).abs()
    }

    pub fn height_deg(&self) -> f64 {
        self.northeast.lat - self.southwest.lat
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            self.southwest.lng + (self.northeast.lng - self.southwest.lng) / 2.0,
            self.southwest.lat + (self.northeast.lat - self.southwest.lat) / 2.0,
        )
    }
}

/// Output size in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn validate(self) -> MapResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MapError::configuration(format!(
                "target dimensions must be positive (got {}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Total pixel count.
    pub fn area(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Byte length of one RGBA8 scanline.
    pub fn row_stride(self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Byte length of the whole RGBA8 buffer.
    pub fn byte_len(self) -> u64 {
        self.area() * BYTES_PER_PIXEL as u64
    }
}

/// RGBA8.
pub const BYTES_PER_PIXEL: usize = 4;

/// Camera placement handed to the renderer for one capture.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Camera {
    pub center: LngLat,
    pub zoom: f64,
    pub bearing: f64,
}

impl Camera {
    pub fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            bearing: 0.0,
        }
    }
}

/// Full-job camera configuration, including the padded bounds it covers.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub center: LngLat,
    pub zoom: f64,
    pub bearing: f64,
    pub bounds: BoundingBox,
}

impl Viewport {
    pub fn camera(&self) -> Camera {
        Camera {
            center: self.center,
            zoom: self.zoom,
            bearing: self.bearing,
        }
    }
}
