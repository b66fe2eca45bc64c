//! Map scale bar

use crate::projector::GeometryProjector;
use crate::transform::Transform;
use crate::utils::haversine_distance;
use geo::Coord;

/// Screen width the scale bar is measured against
pub const DEFAULT_REFERENCE_PX: f64 = 100.0;

/// Scale bar reading: `width_px` on screen spans `distance` `unit`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScaleBar {
    pub width_px: f64,
    pub distance: f64,
    pub unit: &'static str,
}

impl ScaleBar {
    /// Round a ground distance covered by `reference_px` down to 1, 2 or 5 times a power of ten
    ///
    /// Distances under one kilometer are reported in meters.
    pub fn from_distance_km(distance_km: f64, reference_px: f64) -> Option<Self> {
        if !(distance_km.is_finite() && distance_km > 0.0 && reference_px > 0.0) {
            return None;
        }
        let (distance, unit) = if distance_km < 1.0 {
            (distance_km * 1000.0, "m")
        } else {
            (distance_km, "km")
        };
        let magnitude = 10f64.powf(distance.log10().floor());
        let normalized = distance / magnitude;
        let rounded = if normalized >= 5.0 {
            5.0 * magnitude
        } else if normalized >= 2.0 {
            2.0 * magnitude
        } else {
            magnitude
        };
        Some(Self {
            width_px: rounded / distance * reference_px,
            distance: rounded,
            unit,
        })
    }

    /// Measure the ground distance of `reference_px` screen pixels at the viewport center
    pub fn measure(
        projector: &GeometryProjector,
        transform: &Transform,
        reference_px: f64,
    ) -> Option<Self> {
        let (width, height) = projector.viewport();
        let center = Coord {
            x: width / 2.0,
            y: height / 2.0,
        };
        let half = reference_px / 2.0;
        let west = projector.invert(transform.invert(Coord {
            x: center.x - half,
            y: center.y,
        }));
        let east = projector.invert(transform.invert(Coord {
            x: center.x + half,
            y: center.y,
        }));
        let km = haversine_distance(west, east) / 1000.0;
        Self::from_distance_km(km, reference_px)
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.distance, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::ProjectionConfig;

    #[test]
    fn test_nice_numbers() {
        let bar = ScaleBar::from_distance_km(12.0, 100.0).unwrap();
        assert_eq!(bar.distance, 10.0);
        assert_eq!(bar.unit, "km");
        assert!((bar.width_px - 100.0 * 10.0 / 12.0).abs() < 1e-9);

        assert_eq!(ScaleBar::from_distance_km(3.5, 100.0).unwrap().distance, 2.0);
        assert_eq!(ScaleBar::from_distance_km(7.0, 100.0).unwrap().distance, 5.0);
        assert_eq!(ScaleBar::from_distance_km(0.75, 100.0).unwrap().label(), "500 m");
        assert!(ScaleBar::from_distance_km(0.0, 100.0).is_none());
    }

    #[test]
    fn test_zooming_in_shrinks_distance() {
        let projector =
            GeometryProjector::new(&ProjectionConfig::default(), 800.0, 600.0).unwrap();
        let near = |k: f64| {
            let bar = ScaleBar::measure(&projector, &Transform::new(0.0, 0.0, k), 100.0).unwrap();
            let meters = if bar.unit == "m" { 1.0 } else { 1000.0 };
            bar.distance * meters / bar.width_px
        };
        // Ground meters per screen pixel halves when k doubles
        let ratio = near(1.0) / near(2.0);
        assert!((ratio - 2.0).abs() < 0.01, "ratio {ratio}");
        let bar = ScaleBar::measure(&projector, &Transform::IDENTITY, 100.0).unwrap();
        assert!(bar.width_px <= 100.0 && bar.width_px > 20.0);
    }
}
