use crate::foundation::core::LngLat;
use crate::foundation::error::{MapError, MapResult};

/// Finest graticule spacing a style may ask for.
pub const MIN_GRATICULE_STEP_DEG: f64 = 0.01;

/// Drawing style for the software renderer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MapStyle {
    /// Straight-alpha RGBA8 fill behind everything.
    pub background: [u8; 4],
    pub graticule: [u8; 4],
    /// Spacing of graticule lines in degrees.
    pub graticule_step_deg: f64,
    /// Graticule line width in CSS pixels.
    pub line_width: f64,
    pub markers: Vec<Marker>,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            background: [236, 232, 223, 255],
            graticule: [120, 134, 160, 255],
            graticule_step_deg: 1.0,
            line_width: 1.0,
            markers: Vec::new(),
        }
    }
}

impl MapStyle {
    pub fn validate(&self) -> MapResult<()> {
        if !self.graticule_step_deg.is_finite()
            || self.graticule_step_deg < MIN_GRATICULE_STEP_DEG
        {
            return Err(MapError::configuration(format!(
                "style graticule_step_deg must be at least {MIN_GRATICULE_STEP_DEG} (got {})",
                self.graticule_step_deg
            )));
        }
        if !self.line_width.is_finite() || self.line_width < 0.0 {
            return Err(MapError::configuration(
                "style line_width must be non-negative",
            ));
        }
        for m in &self.markers {
            if !m.position.is_finite() || !m.radius.is_finite() || m.radius < 0.0 {
                return Err(MapError::configuration(format!(
                    "style marker at {:?} is invalid",
                    m.position
                )));
            }
        }
        Ok(())
    }
}

/// A filled circle pinned to a geographic position.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    pub position: LngLat,
    /// Radius in CSS pixels.
    pub radius: f64,
    pub color: [u8; 4],
}
