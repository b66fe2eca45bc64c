//! Utility functions for coordinate conversions and rectangle math

use geo::{Coord, Point, Rect};
use std::sync::atomic::{AtomicU64, Ordering};

/// Half the width of the Web Mercator plane (EPSG:3857), meters
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Radius of the Web Mercator sphere in meters (meters per radian of longitude)
pub const MERCATOR_RADIUS_M: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_M: f64 = 6371000.0;

/// Latitudes beyond this are clamped before projecting
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Project lat/lon degrees onto the Web Mercator plane, meters with y pointing north
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Point::new(
        lon.to_radians() * MERCATOR_RADIUS_M,
        (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln() * MERCATOR_RADIUS_M,
    )
}

/// Inverse of [`wgs84_to_mercator`], returns `(lat, lon)` in degrees
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / MERCATOR_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lat, lon)
}

/// Great-circle angle in radians between two lon/lat coordinates (degrees)
pub fn haversine_angle(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let delta_lat = (b.y - a.y).to_radians();
    let delta_lon = (b.x - a.x).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle distance in meters between two lon/lat coordinates (degrees)
#[inline]
pub fn haversine_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    EARTH_RADIUS_M * haversine_angle(a, b)
}

static GENERATION: AtomicU64 = AtomicU64::new(1);

/// Process-unique stamp for data that gets replaced wholesale
///
/// Comparators compare stamps instead of pointers, so two collections built from the same
/// features still count as different data.
pub fn next_generation() -> u64 {
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Inclusive rectangle overlap test (touching edges intersect)
#[inline(always)]
pub fn rects_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x
        && a.max().x >= b.min().x
        && a.min().y <= b.max().y
        && a.max().y >= b.min().y
}

#[inline(always)]
pub fn rect_contains_rect(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.max().x <= outer.max().x
        && inner.min().y >= outer.min().y
        && inner.max().y <= outer.max().y
}

#[inline(always)]
pub fn rect_contains_coord(rect: &Rect<f64>, coord: Coord<f64>) -> bool {
    coord.x >= rect.min().x
        && coord.x <= rect.max().x
        && coord.y >= rect.min().y
        && coord.y <= rect.max().y
}

pub fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Grow a rectangle by `amount` on every side
pub fn expand_rect(rect: Rect<f64>, amount: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - amount,
            y: rect.min().y - amount,
        },
        Coord {
            x: rect.max().x + amount,
            y: rect.max().y + amount,
        },
    )
}

pub fn is_finite_rect(rect: &Rect<f64>) -> bool {
    rect.min().x.is_finite()
        && rect.min().y.is_finite()
        && rect.max().x.is_finite()
        && rect.max().y.is_finite()
}

/// Uppercase the first character ("motorway" -> "Motorway")
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_edges_and_inverse() {
        let east = wgs84_to_mercator(0.0, 180.0);
        assert!((east.x() - EARTH_MERCATOR_MAX).abs() < 1.0);
        assert!(east.y().abs() < 1e-6);
        // Poles are clamped to the square plane
        assert!((wgs84_to_mercator(90.0, 0.0).y() - EARTH_MERCATOR_MAX).abs() < 1.0);

        let seoul = wgs84_to_mercator(37.55, 127.25);
        let (lat, lon) = mercator_to_wgs84(seoul.x(), seoul.y());
        assert!((lat - 37.55).abs() < 1e-9 && (lon - 127.25).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_one_degree_of_longitude_at_equator() {
        let d = haversine_distance(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 });
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
        assert_eq!(haversine_angle(Coord { x: 5.0, y: 5.0 }, Coord { x: 5.0, y: 5.0 }), 0.0);
    }

    #[test]
    fn test_rects_intersect_touching_edges() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let b = Rect::new(Coord { x: 10.0, y: 5.0 }, Coord { x: 20.0, y: 6.0 });
        let c = Rect::new(Coord { x: 10.1, y: 5.0 }, Coord { x: 20.0, y: 6.0 });
        assert!(rects_intersect(&a, &b));
        assert!(!rects_intersect(&a, &c));
    }

    #[test]
    fn test_union_and_expand() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let b = Rect::new(Coord { x: 5.0, y: -2.0 }, Coord { x: 6.0, y: 0.5 });
        let u = union_rect(a, b);
        assert_eq!(u.min(), Coord { x: 0.0, y: -2.0 });
        assert_eq!(u.max(), Coord { x: 6.0, y: 1.0 });

        let e = expand_rect(a, 2.0);
        assert_eq!(e.min(), Coord { x: -2.0, y: -2.0 });
        assert!(rect_contains_rect(&e, &a));
    }

    #[test]
    fn test_generation_is_unique() {
        let a = next_generation();
        let b = next_generation();
        assert_ne!(a, b);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("motorway"), "Motorway");
        assert_eq!(capitalize(""), "");
    }
}
