//! Region labels
//!
//! Labels live inside the transformed vector group: anchors are projected centroids at `k = 1`
//! and the font size is divided by `k` so the text keeps a constant size on screen.

use crate::compositor::AnswerFeedback;
use crate::feature::{Feature, FeatureCollection};
use crate::projector::GeometryProjector;
use crate::theme::{Color, ThemeColors};
use crate::transform::Transform;
use geo::{Coord, Rect};
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelOptions {
    /// Font size on screen, in pixels
    pub target_screen_px: f64,
    /// Regions smaller than this on screen (square pixels) get no label
    pub min_screen_area: f64,
    /// Labels anchored this far outside the viewport are still placed
    pub cull_margin_px: f64,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            target_screen_px: 12.0,
            min_screen_area: 400.0,
            cull_margin_px: 64.0,
        }
    }
}

/// Label anchor and font size, in projected units at `k = 1`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlacement {
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

/// Place the label of one region, or `None` when it is too small on screen
pub fn place_label(
    feature: &Feature,
    projector: &GeometryProjector,
    transform: &Transform,
    options: &LabelOptions,
) -> Option<LabelPlacement> {
    let path = projector.project(&feature.geometry)?;
    placement(path.centroid(), path.area(), transform, options)
}

fn placement(
    centroid: Coord<f64>,
    area: f64,
    transform: &Transform,
    options: &LabelOptions,
) -> Option<LabelPlacement> {
    let k = transform.k;
    if !(k.is_finite() && k > 0.0) {
        return None;
    }
    if area * k * k < options.min_screen_area {
        return None;
    }
    Some(LabelPlacement {
        x: centroid.x,
        y: centroid.y,
        font_size: options.target_screen_px / k,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlacedLabel {
    pub index: usize,
    pub code: String,
    pub text: String,
    pub placement: LabelPlacement,
    /// Anchor in screen pixels
    pub screen: Coord<f64>,
}

#[derive(Clone, Debug)]
struct Anchor {
    index: usize,
    code: String,
    text: String,
    centroid: Coord<f64>,
    area: f64,
}

/// Label anchors cached per (regions, projector)
#[derive(Debug, Default)]
pub struct LabelPlacer {
    key: Option<(u64, u64)>,
    anchors: Vec<Anchor>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LabelPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_anchors(&mut self, regions: &FeatureCollection, projector: &GeometryProjector) {
        let key = (regions.generation(), projector.generation());
        if self.key == Some(key) {
            return;
        }
        self.anchors = regions
            .iter()
            .enumerate()
            .filter_map(|(index, (code, feature))| {
                let text = feature.name()?;
                let path = projector.project(&feature.geometry)?;
                Some(Anchor {
                    index,
                    code: code.to_string(),
                    text: text.to_string(),
                    centroid: path.centroid(),
                    area: path.area(),
                })
            })
            .collect();
        self.key = Some(key);
        tracing::debug!("Cached {} label anchors", self.anchors.len());
    }

    /// Every label that is large enough and anchored inside the viewport (plus margin)
    pub fn place_all(
        &mut self,
        regions: &FeatureCollection,
        projector: &GeometryProjector,
        transform: &Transform,
        viewport: (f64, f64),
        options: &LabelOptions,
    ) -> Vec<PlacedLabel> {
        profiling::scope!("LabelPlacer::place_all");
        self.ensure_anchors(regions, projector);

        let margin = options.cull_margin_px;
        let screen_rect = Rect::new(
            Coord {
                x: -margin,
                y: -margin,
            },
            Coord {
                x: viewport.0 + margin,
                y: viewport.1 + margin,
            },
        );
        self.anchors
            .iter()
            .filter_map(|anchor| {
                let placement = placement(anchor.centroid, anchor.area, transform, options)?;
                let screen = transform.apply(anchor.centroid);
                crate::utils::rect_contains_coord(&screen_rect, screen).then(|| PlacedLabel {
                    index: anchor.index,
                    code: anchor.code.clone(),
                    text: anchor.text.clone(),
                    placement,
                    screen,
                })
            })
            .collect()
    }

    /// Label text color; answered regions win over feedback
    pub fn label_color(
        colors: &ThemeColors,
        code: &str,
        answered: &BTreeSet<String>,
        feedback: Option<&AnswerFeedback>,
    ) -> Color {
        if answered.contains(code) {
            return colors.label_answered;
        }
        match feedback {
            Some(f) if f.region_code == code && f.is_correct => colors.label_correct,
            Some(f) if f.region_code == code => colors.label_wrong,
            _ => colors.label,
        }
    }
}
