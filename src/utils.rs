//! Utility functions for pixel-region geometry.

pub mod safe_cast;

use crate::detection::{BoundingBox, PixelRect};
use safe_cast::f64_to_u32_clamp;

/// Convert a pixel-space box into an integer rectangle inside a `max_width x max_height` surface
///
/// Edges are expanded outwards to whole pixels and clipped to the surface.
/// Returns `None` when nothing of the box remains on the surface.
#[must_use]
pub fn refine_region(bbox: &BoundingBox, max_width: u32, max_height: u32) -> Option<PixelRect> {
    let x0 = f64_to_u32_clamp(bbox.x_min.floor(), 0, max_width);
    let y0 = f64_to_u32_clamp(bbox.y_min.floor(), 0, max_height);
    let x1 = f64_to_u32_clamp((bbox.x_min + bbox.width).ceil(), 0, max_width);
    let y1 = f64_to_u32_clamp((bbox.y_min + bbox.height).ceil(), 0, max_height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Horizontal band of `rect` between the fractional heights `from` and `to`
#[must_use]
pub fn vertical_band(rect: &PixelRect, from: f64, to: f64) -> Option<PixelRect> {
    let height = f64::from(rect.height);
    let top = f64_to_u32_clamp((height * from).round(), 0, rect.height);
    let bottom = f64_to_u32_clamp((height * to).round(), 0, rect.height);

    if bottom <= top || rect.width == 0 {
        return None;
    }

    Some(PixelRect {
        x: rect.x,
        y: rect.y + top,
        width: rect.width,
        height: bottom - top,
    })
}
