use std::time::Instant;

use num_rational::BigRational;
use num_traits::Signed;

use crate::foundation::core::{BoundingBox, LngLat, PixelSize, Viewport};
use crate::foundation::error::{MapError, MapResult};
use crate::foundation::exact::{approx, checked_div, exact, exact_int};
use crate::geo::projection::Projection;

/// Zoom at which pixel-space distances are measured.
pub const REFERENCE_ZOOM: f64 = 20.0;

/// Compute the camera that renders `bounds` into `size` device pixels without distortion.
///
/// `pixel_ratio` converts device pixels into the projection's CSS pixels. The bounds are padded
/// symmetrically on the non-binding axis (longitude when `scale_x > scale_y`, else latitude); the
/// padding is computed in exact rational arithmetic.
///
/// Leaves `proj` at [`REFERENCE_ZOOM`].
pub fn calc_viewport<P: Projection + ?Sized>(
    proj: &mut P,
    bounds: &BoundingBox,
    size: PixelSize,
    pixel_ratio: f64,
) -> MapResult<Viewport> {
    let start = Instant::now();
    bounds.validate()?;
    size.validate()?;
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
        return Err(MapError::configuration(format!(
            "pixel ratio must be positive (got {pixel_ratio})"
        )));
    }

    proj.set_zoom(REFERENCE_ZOOM);
    let nw = proj.project(bounds.north_west());
    let se = proj.project(bounds.south_east());
    let span = se - nw;
    if !(span.x > 0.0 && span.y > 0.0) {
        return Err(MapError::configuration(format!(
            "bounding box projects to an empty area ({:.3}x{:.3} px)",
            span.x, span.y
        )));
    }

    let ratio = exact(pixel_ratio)?;
    let target_w = checked_div(&exact_int(u64::from(size.width)), &ratio)?;
    let target_h = checked_div(&exact_int(u64::from(size.height)), &ratio)?;
    let scale_x = checked_div(&target_w, &exact(span.x)?)?;
    let scale_y = checked_div(&target_h, &exact(span.y)?)?;
    let scale = scale_x.clone().min(scale_y.clone());

    let zoom = proj.scale_to_zoom(proj.scale() * approx(&scale));
    let center = proj.unproject(nw.midpoint(se));

    let padded = pad_to_aspect(bounds, size, &scale_x, &scale_y)?;

    tracing::debug!(
        zoom,
        center_lng = center.lng,
        center_lat = center.lat,
        elapsed_us = start.elapsed().as_micros() as u64,
        "computed viewport"
    );

    Ok(Viewport {
        center,
        zoom,
        bearing: 0.0,
        bounds: padded,
    })
}

/// Grow `bounds` on the axis the fit scale leaves slack.
///
/// When `scale_x > scale_y` latitude is binding and fills the output exactly, so only longitude
/// grows, towards `width_deg / height_deg == size.width / size.height` and never below the input.
/// Otherwise longitude is binding and latitude grows by the unused share of the output height,
/// `height_deg * scale_y / scale_x`, which is the band the renderer actually shows.
fn pad_to_aspect(
    bounds: &BoundingBox,
    size: PixelSize,
    scale_x: &BigRational,
    scale_y: &BigRational,
) -> MapResult<BoundingBox> {
    let sw_lng = exact(bounds.southwest.lng)?;
    let sw_lat = exact(bounds.southwest.lat)?;
    let ne_lng = exact(bounds.northeast.lng)?;
    let ne_lat = exact(bounds.northeast.lat)?;

    let width_deg = (&sw_lng - &ne_lng).abs();
    let height_deg = &ne_lat - &sw_lat;
    let two = exact_int(2);
    let zero = exact_int(0);

    let (pad_x, pad_y): (BigRational, BigRational) = if scale_x > scale_y {
        let aspect = checked_div(
            &exact_int(u64::from(size.width)),
            &exact_int(u64::from(size.height)),
        )?;
        let pad = (&height_deg * &aspect - &width_deg) / &two;
        (pad.max(zero.clone()), zero)
    } else {
        let shown = &height_deg * checked_div(scale_y, scale_x)?;
        (zero, (&shown - &height_deg) / &two)
    };

    let padded = BoundingBox {
        southwest: LngLat::new(approx(&(&sw_lng - &pad_x)), approx(&(&sw_lat - &pad_y))),
        northeast: LngLat::new(approx(&(&ne_lng + &pad_x)), approx(&(&ne_lat + &pad_y))),
    };
    padded.validate()?;
    Ok(padded)
}
