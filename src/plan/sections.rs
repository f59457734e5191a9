use crate::foundation::core::{Camera, LngLat, PixelSize, Viewport};
use crate::foundation::error::{MapError, MapResult};
use crate::foundation::exact::{approx, checked_div, exact, exact_int};

/// Multiplier applied to a renderer's maximum renderbuffer edge to obtain a per-section pixel
/// budget.
pub const RENDERBUFFER_BUDGET_FACTOR: u64 = 250;

/// Maximum pixel count a single render target may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelBudget(pub u64);

impl PixelBudget {
    pub fn from_renderbuffer_size(max_renderbuffer_size: u32) -> Self {
        Self(u64::from(max_renderbuffer_size) * RENDERBUFFER_BUDGET_FACTOR)
    }
}

/// One horizontal band of the output image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Section {
    /// Position in top-to-bottom order.
    pub index: usize,
    pub shape: PixelSize,
    pub camera: Camera,
}

/// Ordered, immutable list of sections covering a whole output image.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionPlan {
    size: PixelSize,
    sections: Vec<Section>,
}

impl SectionPlan {
    /// Full output size.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Sections in capture order (north to south).
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }
}

/// Split `size` into row bands no larger than `budget` pixels each.
///
/// Band heights are all `floor(budget / width)` except the last, which takes the remainder.
/// Band centres interpolate linearly in latitude across the viewport bounds; the final band's
/// southern edge is pinned to the bounds so rounding never accumulates.
pub fn plan_sections(
    viewport: &Viewport,
    size: PixelSize,
    budget: PixelBudget,
) -> MapResult<SectionPlan> {
    size.validate()?;
    if budget.0 < u64::from(size.width) {
        return Err(MapError::configuration(format!(
            "pixel budget {} cannot fit a single {}px row",
            budget.0, size.width
        )));
    }

    let max_height = (budget.0 / u64::from(size.width)).min(u64::from(u32::MAX)) as u32;
    if size.height <= max_height {
        tracing::info!(sections = 1, "planned sections");
        return Ok(SectionPlan {
            size,
            sections: vec![Section {
                index: 0,
                shape: size,
                camera: viewport.camera(),
            }],
        });
    }

    let count = size.height.div_ceil(max_height);
    let last_height = size.height - max_height * (count - 1);

    let ne_lat = exact(viewport.bounds.northeast.lat)?;
    let sw_lat = exact(viewport.bounds.southwest.lat)?;
    let height_deg = &ne_lat - &sw_lat;
    let deg_per_row = checked_div(&height_deg, &exact_int(u64::from(size.height)))?;
    let band_deg = &deg_per_row * exact_int(u64::from(max_height));
    let two = exact_int(2);

    let mut sections = Vec::with_capacity(count as usize);
    for i in 0..count {
        let is_last = i == count - 1;
        let max_lat = &ne_lat - &band_deg * exact_int(u64::from(i));
        let min_lat = if is_last {
            sw_lat.clone()
        } else {
            &ne_lat - &band_deg * exact_int(u64::from(i + 1))
        };
        let center_lat = (&min_lat + &max_lat) / &two;

        sections.push(Section {
            index: i as usize,
            shape: PixelSize::new(
                size.width,
                if is_last { last_height } else { max_height },
            ),
            camera: Camera::new(
                LngLat::new(viewport.center.lng, approx(&center_lat)),
                viewport.zoom,
            ),
        });
    }

    tracing::info!(sections = sections.len(), max_height, last_height, "planned sections");
    Ok(SectionPlan { size, sections })
}
