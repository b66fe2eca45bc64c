//! Region and road features
//!
//! Geometry arrives already decoded and simplified, in lon/lat degrees. A collection is replaced
//! wholesale whenever new data is loaded, and every collection carries a generation stamp so the
//! memoized layers can tell two loads apart.

use crate::utils;
use geo::Geometry;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Property bag of a feature
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Properties {
    /// Stable unique code (regions always have one, roads usually do not)
    pub code: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Road reference number ("1", "E40", ...)
    pub route_ref: Option<String>,
    /// Road class ("motorway", "trunk", ...)
    pub road_class: Option<String>,
}

/// A region or road segment
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub properties: Properties,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>, properties: Properties) -> Self {
        Self {
            geometry: geometry.into(),
            properties,
        }
    }

    /// Create a region feature with a code and display name
    pub fn region(
        code: impl Into<String>,
        name: impl Into<String>,
        geometry: impl Into<Geometry<f64>>,
    ) -> Self {
        Self::new(
            geometry,
            Properties {
                code: Some(code.into()),
                name: Some(name.into()),
                ..Default::default()
            },
        )
    }

    /// Create a road feature of the given class
    pub fn road(
        road_class: impl Into<String>,
        name: Option<String>,
        geometry: impl Into<Geometry<f64>>,
    ) -> Self {
        Self::new(
            geometry,
            Properties {
                name,
                road_class: Some(road_class.into()),
                ..Default::default()
            },
        )
    }

    pub fn with_route_ref(mut self, route_ref: impl Into<String>) -> Self {
        self.properties.route_ref = Some(route_ref.into());
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.properties.code.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.name.as_deref()
    }

    pub fn road_class(&self) -> Option<&str> {
        self.properties.road_class.as_deref()
    }

    /// Name used when listing roads: name, then route reference, then capitalized class
    pub fn road_label(&self) -> Option<String> {
        let p = &self.properties;
        p.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| p.route_ref.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .or_else(|| {
                p.road_class
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(utils::capitalize)
            })
    }
}

/// Ordered set of features with a code lookup
#[derive(Clone, Debug)]
pub struct FeatureCollection {
    features: Vec<Feature>,
    /// Code, or `road-{index}` for features without one
    keys: Vec<String>,
    by_key: HashMap<String, usize>,
    generation: u64,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        let keys: Vec<String> = features
            .iter()
            .enumerate()
            .map(|(index, f)| match f.code() {
                Some(code) if !code.is_empty() => code.to_string(),
                _ => format!("road-{index}"),
            })
            .collect();

        let mut by_key = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            if by_key.contains_key(key) {
                tracing::warn!("Duplicate feature code {key:?} at index {index}, keeping first");
                continue;
            }
            by_key.insert(key.clone(), index);
        }

        Self {
            features,
            keys,
            by_key,
            generation: utils::next_generation(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn get(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    /// Stable key of the feature at `index`
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    /// O(1) lookup by code (or synthesized key)
    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.by_key.get(code).copied()
    }

    pub fn find(&self, code: &str) -> Option<&Feature> {
        self.index_of(code).and_then(|i| self.features.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Feature)> {
        self.keys.iter().map(String::as_str).zip(self.features.iter())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self::new(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Point};

    fn line() -> LineString<f64> {
        LineString::from(vec![(127.0, 37.0), (127.1, 37.1)])
    }

    #[test]
    fn test_synthesized_keys_for_roads() {
        let collection = FeatureCollection::new(vec![
            Feature::road("motorway", None, line()),
            Feature::region("11", "Seoul", Point::new(127.0, 37.5)),
        ]);
        assert_eq!(collection.key(0), Some("road-0"));
        assert_eq!(collection.key(1), Some("11"));
        assert_eq!(collection.index_of("11"), Some(1));
        assert_eq!(collection.index_of("road-0"), Some(0));
    }

    #[test]
    fn test_duplicate_codes_keep_first() {
        let collection = FeatureCollection::new(vec![
            Feature::region("A", "first", Point::new(0.0, 0.0)),
            Feature::region("A", "second", Point::new(1.0, 1.0)),
        ]);
        assert_eq!(collection.find("A").and_then(Feature::name), Some("first"));
    }

    #[test]
    fn test_generation_changes_per_collection() {
        let a = FeatureCollection::empty();
        let b = FeatureCollection::empty();
        assert_ne!(a.generation(), b.generation());
    }

    #[test]
    fn test_road_label_fallbacks() {
        let named = Feature::road("trunk", Some("Gyeongbu Expressway".into()), line());
        assert_eq!(named.road_label().as_deref(), Some("Gyeongbu Expressway"));

        let numbered = Feature::road("trunk", None, line()).with_route_ref("1");
        assert_eq!(numbered.road_label().as_deref(), Some("1"));

        let bare = Feature::road("motorway", None, line());
        assert_eq!(bare.road_label().as_deref(), Some("Motorway"));

        let nothing = Feature::new(line(), Properties::default());
        assert_eq!(nothing.road_label(), None);
    }
}
