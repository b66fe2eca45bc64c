//! Region intel: nearby regions and the roads that cross a region

use crate::feature::{Feature, FeatureCollection};
use crate::utils::haversine_angle;
use geo::{Centroid, Coord};

/// Centroid distance (radians) under which two regions count as neighbors
pub const DEFAULT_NEIGHBOR_THRESHOLD_RAD: f64 = 0.05;

/// Most neighbors reported for one region
pub const MAX_NEIGHBORS: usize = 3;

/// Summary shown by the region info popup
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntelReport {
    pub code: String,
    pub name: String,
    /// Nearest first
    pub neighbors: Vec<String>,
    /// Sorted road names
    pub roads: Vec<String>,
}

fn lonlat_centroid(feature: &Feature) -> Option<Coord<f64>> {
    feature.geometry.centroid().map(|p| p.0)
}

/// Names of the regions whose centroid lies within `threshold_rad` of the target's
///
/// Nearest first, names de-duplicated, at most [`MAX_NEIGHBORS`]. The target itself (same
/// code) is never included.
pub fn adjacent_regions(
    target: &Feature,
    regions: &FeatureCollection,
    threshold_rad: f64,
) -> Vec<String> {
    let Some(origin) = lonlat_centroid(target) else {
        return Vec::new();
    };

    let mut candidates: Vec<(f64, &str)> = regions
        .features()
        .iter()
        .filter(|region| region.code().is_none() || region.code() != target.code())
        .filter_map(|region| {
            let name = region.name()?;
            let distance = haversine_angle(origin, lonlat_centroid(region)?);
            (distance < threshold_rad).then_some((distance, name))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut names: Vec<String> = Vec::with_capacity(MAX_NEIGHBORS);
    for (_, name) in candidates {
        if names.len() == MAX_NEIGHBORS {
            break;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    tracing::trace!(
        "Neighbors of {:?}: {:?}",
        target.code().unwrap_or_default(),
        names
    );
    names
}
