//! Road layer rendering
//!
//! The [`RoadRenderer`] paints one [`RasterSurface`] per road class. Each frame it inverse-maps
//! the canvas rectangle through the current transform, pads it by a screen-space buffer, culls
//! the quadtree against that window and strokes what survives the per-class LOD threshold.

use crate::feature::Feature;
use crate::quadtree::SpatialIndex;
use crate::surface::{RasterSurface, StrokeStyle};
use crate::theme::Color;
use crate::transform::Transform;
use crate::viewport::FrameRenderer;
use crate::{MapError, Result, utils};
use geo::{Coord, Rect};
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Visibility policy of one road class
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadClassStyle {
    pub class: String,
    pub color: Color,
    /// Stroke width in screen pixels
    pub width: f64,
    /// The class is drawn once `k >= min_zoom`
    pub min_zoom: f64,
}

impl RoadClassStyle {
    pub fn new(class: impl Into<String>, color: Color, width: f64, min_zoom: f64) -> Self {
        Self {
            class: class.into(),
            color,
            width,
            min_zoom,
        }
    }

    #[inline]
    pub fn is_visible_at(&self, k: f64) -> bool {
        k >= self.min_zoom
    }
}

/// Configuration of the road layer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadLayerConfig {
    /// Classes in stacking order (first is drawn lowest)
    pub classes: Vec<RoadClassStyle>,
    /// Screen-pixel padding added around the visible window before culling
    pub cull_buffer_px: f64,
    /// Canvas size as a multiple of the viewport (canvases stay centered on it)
    pub canvas_oversize: f64,
}

impl Default for RoadLayerConfig {
    fn default() -> Self {
        Self {
            classes: vec![
                RoadClassStyle::new("secondary", Color::rgba(0x94, 0xa3, 0xb8, 153), 0.6, 3.0),
                RoadClassStyle::new("primary", Color::rgba(0xf5, 0x9e, 0x0b, 153), 0.7, 2.0),
                RoadClassStyle::new("trunk", Color::rgba(0xf9, 0x73, 0x16, 153), 0.8, 1.0),
                RoadClassStyle::new("motorway", Color::rgba(0xe1, 0x1d, 0x48, 153), 1.5, 1.0),
            ],
            cull_buffer_px: 64.0,
            canvas_oversize: 2.0,
        }
    }
}

impl RoadLayerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cull_buffer_px.is_finite() && self.cull_buffer_px >= 0.0) {
            return Err(MapError::InvalidConfig(format!(
                "cull buffer must be a non-negative pixel count, got {}",
                self.cull_buffer_px
            )));
        }
        if !(self.canvas_oversize.is_finite() && self.canvas_oversize >= 1.0) {
            return Err(MapError::InvalidConfig(format!(
                "canvas oversize must be at least 1, got {}",
                self.canvas_oversize
            )));
        }
        let mut seen = BTreeSet::new();
        for style in &self.classes {
            if !seen.insert(style.class.as_str()) {
                return Err(MapError::InvalidConfig(format!(
                    "road class {:?} configured twice",
                    style.class
                )));
            }
            if !(style.width.is_finite() && style.width > 0.0) || style.min_zoom.is_nan() {
                return Err(MapError::InvalidConfig(format!(
                    "invalid style for road class {:?}",
                    style.class
                )));
            }
        }
        Ok(())
    }

    pub fn style(&self, class: &str) -> Option<&RoadClassStyle> {
        self.classes.iter().find(|s| s.class == class)
    }
}

/// What the last frame drew
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Buffered world-space window the frame was culled against
    pub window: Option<Rect<f64>>,
    /// Feature indices stroked this frame, ascending, across all classes
    pub drawn: Vec<usize>,
    /// Strokes per class, in stacking order
    pub per_class: Vec<(String, usize)>,
    /// Entries returned by the culling query
    pub candidates: usize,
}

impl FrameStats {
    pub fn drawn_count(&self) -> usize {
        self.drawn.len()
    }
}

struct ClassCanvas {
    style: RoadClassStyle,
    surface: Option<Box<dyn RasterSurface>>,
    visible: bool,
}

/// Paints the road classes onto their own stacked canvases
pub struct RoadRenderer {
    config: RoadLayerConfig,
    canvases: Vec<ClassCanvas>,
    index: Option<Arc<SpatialIndex>>,
    viewport: (f64, f64),
    last_frame: FrameStats,
}

impl std::fmt::Debug for RoadRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoadRenderer")
            .field("classes", &self.config.classes.len())
            .field("has_index", &self.index.is_some())
            .field("viewport", &self.viewport)
            .finish()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RoadRenderer {
    pub fn new(config: RoadLayerConfig) -> Result<Self> {
        config.validate()?;
        let canvases = config
            .classes
            .iter()
            .map(|style| ClassCanvas {
                style: style.clone(),
                surface: None,
                visible: true,
            })
            .collect();
        Ok(Self {
            config,
            canvases,
            index: None,
            viewport: (0.0, 0.0),
            last_frame: FrameStats::default(),
        })
    }

    /// Give the canvas of `class` to this renderer. Returns `false` for unknown classes.
    pub fn assign_canvas(&mut self, class: &str, mut surface: Box<dyn RasterSurface>) -> bool {
        let (w, h) = self.canvas_size();
        let Some(canvas) = self.canvases.iter_mut().find(|c| c.style.class == class) else {
            tracing::warn!("No road class {class:?} configured, canvas ignored");
            return false;
        };
        surface.resize(w, h);
        surface.set_visible(canvas.visible);
        canvas.surface = Some(surface);
        true
    }

    pub fn set_index(&mut self, index: Option<Arc<SpatialIndex>>) {
        self.index = index;
    }

    pub fn index(&self) -> Option<&Arc<SpatialIndex>> {
        self.index.as_ref()
    }

    /// Viewport size in screen pixels; resizes every canvas
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        let (w, h) = self.canvas_size();
        for surface in self.canvases.iter_mut().filter_map(|c| c.surface.as_mut()) {
            surface.resize(w, h);
        }
    }

    pub fn canvas_size(&self) -> (f64, f64) {
        (
            self.viewport.0 * self.config.canvas_oversize,
            self.viewport.1 * self.config.canvas_oversize,
        )
    }

    /// Screen position of the viewport origin inside each canvas
    pub fn canvas_offset(&self) -> Coord<f64> {
        let margin = (self.config.canvas_oversize - 1.0) / 2.0;
        Coord {
            x: self.viewport.0 * margin,
            y: self.viewport.1 * margin,
        }
    }

    /// O(1) class toggle: canvases keep being drawn while hidden
    pub fn set_class_visible(&mut self, class: &str, visible: bool) -> bool {
        let Some(canvas) = self.canvases.iter_mut().find(|c| c.style.class == class) else {
            return false;
        };
        canvas.visible = visible;
        if let Some(surface) = canvas.surface.as_mut() {
            surface.set_visible(visible);
        }
        true
    }

    pub fn is_class_visible(&self, class: &str) -> Option<bool> {
        self.canvases
            .iter()
            .find(|c| c.style.class == class)
            .map(|c| c.visible)
    }

    pub fn config(&self) -> &RoadLayerConfig {
        &self.config
    }

    pub fn last_frame(&self) -> &FrameStats {
        &self.last_frame
    }

    /// World-space window covered by the canvases under `transform`, padded by the cull buffer
    pub fn visible_window(&self, transform: &Transform) -> Rect<f64> {
        let offset = self.canvas_offset();
        let (w, h) = self.canvas_size();
        let canvas_on_screen = Rect::new(
            Coord {
                x: -offset.x,
                y: -offset.y,
            },
            Coord {
                x: w - offset.x,
                y: h - offset.y,
            },
        );
        utils::expand_rect(
            transform.invert_rect(canvas_on_screen),
            self.config.cull_buffer_px / transform.k,
        )
    }

    /// Clear and redraw every class canvas for `transform`
    ///
    /// No-op without an index; unavailable canvases are skipped.
    pub fn draw(&mut self, transform: &Transform) -> &FrameStats {
        profiling::scope!("RoadRenderer::draw");
        let Some(index) = self.index.clone() else {
            return &self.last_frame;
        };
        if !(transform.k.is_finite() && transform.k > 0.0) {
            return &self.last_frame;
        }

        let window = self.visible_window(transform);
        let (hits, query) = index.query_ids(&window);
        let matrix = transform.matrix_with_offset(self.canvas_offset());

        let mut drawn = BTreeSet::new();
        let mut per_class = Vec::with_capacity(self.canvases.len());
        for canvas in &mut self.canvases {
            let Some(surface) = canvas.surface.as_mut() else {
                continue;
            };
            if !surface.is_available() {
                continue;
            }
            surface.clear();
            surface.set_matrix(matrix);

            let style = &canvas.style;
            let mut strokes = 0;
            if style.is_visible_at(transform.k) {
                let stroke = StrokeStyle {
                    color: style.color,
                    width: style.width / transform.k,
                };
                for &id in &hits {
                    let Some(entry) = index.entry(id) else {
                        continue;
                    };
                    if entry.class.as_deref() != Some(style.class.as_str()) {
                        continue;
                    }
                    for outline in entry.path.outlines() {
                        surface.stroke_polyline(outline, stroke);
                    }
                    drawn.insert(entry.feature);
                    strokes += 1;
                }
            }
            per_class.push((style.class.clone(), strokes));
        }

        tracing::trace!(
            "Road frame k={:.3}: {} candidates, {} drawn ({} nodes pruned)",
            transform.k,
            hits.len(),
            drawn.len(),
            query.nodes_pruned
        );
        self.last_frame = FrameStats {
            window: Some(window),
            drawn: drawn.into_iter().collect(),
            per_class,
            candidates: hits.len(),
        };
        &self.last_frame
    }

    /// Names of the roads whose bounding box intersects the region's, sorted and de-duplicated
    ///
    /// No LOD filtering. Empty without an index or for a region with no path.
    pub fn query_region(&self, region: &Feature) -> Vec<String> {
        profiling::scope!("RoadRenderer::query_region");
        let Some(index) = self.index.as_ref() else {
            return Vec::new();
        };
        let Some(path) = index.projector().project(&region.geometry) else {
            return Vec::new();
        };
        let mut names = BTreeSet::new();
        index.visit_window(&path.bounds(), |_, entry| {
            if let Some(label) = &entry.label {
                names.insert(label.clone());
            }
        });
        names.into_iter().collect()
    }
}

impl FrameRenderer for RoadRenderer {
    fn draw(&mut self, transform: &Transform) {
        RoadRenderer::draw(self, transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureCollection;
    use crate::projector::{GeometryProjector, ProjectionConfig};
    use crate::quadtree::DEFAULT_LEAF_CAPACITY;
    use crate::surface::{RecordingSurface, SurfaceCommand};
    use geo::{LineString, polygon};

    struct Fixture {
        renderer: RoadRenderer,
        motorway: RecordingSurface,
        trunk: RecordingSurface,
        secondary: RecordingSurface,
    }

    fn fixture(roads: Vec<Feature>) -> Fixture {
        let projector =
            Arc::new(GeometryProjector::new(&ProjectionConfig::default(), 800.0, 600.0).unwrap());
        let index = SpatialIndex::build(
            Arc::new(FeatureCollection::new(roads)),
            projector,
            DEFAULT_LEAF_CAPACITY,
        );
        let mut renderer = RoadRenderer::new(RoadLayerConfig::default()).unwrap();
        renderer.set_viewport(800.0, 600.0);
        let motorway = RecordingSurface::new();
        let trunk = RecordingSurface::new();
        let secondary = RecordingSurface::new();
        assert!(renderer.assign_canvas("motorway", Box::new(motorway.clone())));
        assert!(renderer.assign_canvas("trunk", Box::new(trunk.clone())));
        assert!(renderer.assign_canvas("secondary", Box::new(secondary.clone())));
        renderer.set_index(Some(Arc::new(index)));
        Fixture {
            renderer,
            motorway,
            trunk,
            secondary,
        }
    }

    fn road(class: &str, name: &str, from: (f64, f64), to: (f64, f64)) -> Feature {
        Feature::road(class, Some(name.to_string()), LineString::from(vec![from, to]))
    }

    fn sample_roads() -> Vec<Feature> {
        vec![
            road("motorway", "Central", (127.24, 37.54), (127.26, 37.56)),
            road("trunk", "Near", (127.20, 37.50), (127.22, 37.52)),
            road("secondary", "Local", (127.25, 37.55), (127.255, 37.555)),
            // Thousands of pixels east of the viewport
            road("motorway", "Far", (135.0, 37.5), (135.1, 37.6)),
        ]
    }

    #[test]
    fn test_canvases_are_oversized_and_centered() {
        let f = fixture(sample_roads());
        assert_eq!(f.motorway.size(), (1600.0, 1200.0));
        assert_eq!(f.renderer.canvas_offset(), Coord { x: 400.0, y: 300.0 });
    }

    #[test]
    fn test_draw_culls_far_roads() {
        let mut f = fixture(sample_roads());
        let stats = f.renderer.draw(&Transform::IDENTITY).clone();
        assert_eq!(stats.drawn, vec![0, 1]);
        assert_eq!(f.motorway.stroke_count(), 1);
        assert_eq!(f.trunk.stroke_count(), 1);
        // Secondary roads need k >= 3
        assert_eq!(f.secondary.stroke_count(), 0);
    }

    #[test]
    fn test_draw_is_idempotent() {
        let mut f = fixture(sample_roads());
        let t = Transform::new(-120.0, 35.5, 2.5);
        f.renderer.draw(&t);
        let first = (f.motorway.frame(), f.trunk.frame(), f.secondary.frame());
        f.renderer.draw(&t);
        let second = (f.motorway.frame(), f.trunk.frame(), f.secondary.frame());
        assert_eq!(first, second);
        assert_eq!(f.motorway.clear_count(), 2);
    }

    #[test]
    fn test_matrix_and_stroke_width_follow_transform() {
        let mut f = fixture(sample_roads());
        let t = Transform::new(10.0, 20.0, 4.0);
        f.renderer.draw(&t);
        let frame = f.motorway.frame();
        assert_eq!(
            frame[0],
            SurfaceCommand::SetMatrix(t.matrix_with_offset(Coord { x: 400.0, y: 300.0 }))
        );
        match &frame[1] {
            SurfaceCommand::Stroke { style, .. } => {
                assert!((style.width - 1.5 / 4.0).abs() < 1e-12)
            }
            other => panic!("expected a stroke, got {other:?}"),
        }
    }

    #[test]
    fn test_lod_is_monotonic_in_k() {
        let mut f = fixture(sample_roads());
        let center = Coord { x: 400.0, y: 300.0 };
        let mut was_visible = false;
        for step in 0..=16 {
            let k = 1.0 + step as f64 * 0.5;
            // Keep the map center fixed on screen while zooming
            let t = Transform::new(center.x - center.x * k, center.y - center.y * k, k);
            f.renderer.draw(&t);
            let visible = f.secondary.stroke_count() > 0;
            assert!(!was_visible || visible, "secondary flickered off at k={k}");
            was_visible = visible;
        }
        assert!(was_visible);
    }

    #[test]
    fn test_culling_window_inside_always_drawn_outside_never() {
        let mut f = fixture(sample_roads());
        let t = Transform::new(-300.0, 50.0, 1.5);
        let stats = f.renderer.draw(&t).clone();
        let window = stats.window.unwrap();
        let index = f.renderer.index().unwrap().clone();
        for entry in index.entries() {
            let visible_class = f
                .renderer
                .config()
                .style(entry.class.as_deref().unwrap_or_default())
                .is_some_and(|s| s.is_visible_at(t.k));
            if utils::rect_contains_rect(&window, &entry.bounds) && visible_class {
                assert!(stats.drawn.contains(&entry.feature), "missing {}", entry.key);
            }
            if !utils::rects_intersect(&window, &entry.bounds) {
                assert!(!stats.drawn.contains(&entry.feature), "drew culled {}", entry.key);
            }
        }
    }

    #[test]
    fn test_hidden_class_keeps_drawing() {
        let mut f = fixture(sample_roads());
        assert!(f.renderer.set_class_visible("motorway", false));
        assert!(!f.motorway.is_visible());
        f.renderer.draw(&Transform::IDENTITY);
        assert_eq!(f.motorway.stroke_count(), 1);
        assert!(f.renderer.set_class_visible("motorway", true));
        assert!(f.motorway.is_visible());
        assert!(!f.renderer.set_class_visible("footpath", true));
    }

    #[test]
    fn test_draw_without_index_is_noop() {
        let mut renderer = RoadRenderer::new(RoadLayerConfig::default()).unwrap();
        renderer.set_viewport(800.0, 600.0);
        let surface = RecordingSurface::new();
        renderer.assign_canvas("motorway", Box::new(surface.clone()));
        let stats = renderer.draw(&Transform::IDENTITY);
        assert!(stats.window.is_none());
        assert_eq!(surface.clear_count(), 0);
        let region = Feature::region(
            "A",
            "A",
            polygon![(x: 127.0, y: 37.0), (x: 128.0, y: 37.0), (x: 128.0, y: 38.0)],
        );
        assert!(renderer.query_region(&region).is_empty());
    }

    #[test]
    fn test_unavailable_canvas_is_skipped() {
        let mut f = fixture(sample_roads());
        f.trunk.set_available(false);
        f.renderer.draw(&Transform::IDENTITY);
        assert_eq!(f.trunk.clear_count(), 0);
        assert_eq!(f.motorway.stroke_count(), 1);
    }

    #[test]
    fn test_query_region_names_sorted_and_deduplicated() {
        let mut roads = sample_roads();
        roads.push(road("trunk", "Central", (127.245, 37.545), (127.25, 37.55)));
        roads.push(
            Feature::road(
                "trunk",
                None,
                LineString::from(vec![(127.25, 37.545), (127.251, 37.546)]),
            )
            .with_route_ref("42"),
        );
        roads.push(Feature::road(
            "primary",
            None,
            LineString::from(vec![(127.252, 37.545), (127.253, 37.546)]),
        ));
        let f = fixture(roads);
        let region = Feature::region(
            "A",
            "A",
            polygon![
                (x: 127.23, y: 37.53),
                (x: 127.27, y: 37.53),
                (x: 127.27, y: 37.57),
                (x: 127.23, y: 37.57),
            ],
        );
        let names = f.renderer.query_region(&region);
        assert_eq!(names, vec!["42", "Central", "Local", "Primary"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = RoadLayerConfig::default();
        config.canvas_oversize = 0.5;
        assert!(RoadRenderer::new(config).is_err());

        let mut config = RoadLayerConfig::default();
        config.cull_buffer_px = -1.0;
        assert!(RoadRenderer::new(config).is_err());

        let mut config = RoadLayerConfig::default();
        config.classes.push(config.classes[0].clone());
        assert!(RoadRenderer::new(config).is_err());
    }
}
