//! Well-Known Text conversions for the polygonal geometries stored in
//! overlap lists, via `geozero`.
//!
//! Only `MULTIPOLYGON` is written. Any 2D geometry tag is read (Z/M
//! ordinates are dropped) and normalized to its polygonal parts, so lists
//! produced by other tools load too.

use anyhow::{Context, Result};
use geo::{Geometry, MultiPolygon};
use geozero::wkt::Wkt;
use geozero::{ToGeo, ToWkt};

/// Parse one WKT geometry.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    Wkt(text.trim())
        .to_geo()
        .with_context(|| format!("[io::wkt] Failed to parse `{}`", abbreviate(text)))
}

/// Parse WKT and keep only its polygonal parts.
pub fn parse_multipolygon(text: &str) -> Result<MultiPolygon<f64>> {
    Ok(polytools::normalize_to_polygons(&parse_wkt(text)?))
}

/// Encode a multipolygon as WKT. Polygons without an exterior are skipped.
///
/// Coordinates are written with `f64`'s shortest round-trip form.
pub fn multipolygon_to_wkt(mp: &MultiPolygon<f64>) -> Result<String> {
    let polygons = mp.0.iter().filter(|p| !p.exterior().0.is_empty()).cloned().collect();
    Geometry::MultiPolygon(MultiPolygon::new(polygons))
        .to_wkt()
        .context("[io::wkt] Failed to encode multipolygon")
}

fn abbreviate(text: &str) -> &str {
    match text.char_indices().nth(60) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
