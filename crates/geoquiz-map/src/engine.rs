//! MapEngine - Top-level manager for collections, projection, index and layers
//!
//! The engine owns every piece of derived state and rebuilds it wholesale: loading regions or
//! roads, or resizing the viewport, produces a new projector and a new spatial index. Gestures
//! flow through the [`ViewportController`], which redraws the road layer synchronously.

use crate::compositor::{
    AnswerFeedback, GameState, InteractionEvent, LayerCompositor, LayerInputs, PointerEvent,
};
use crate::feature::FeatureCollection;
use crate::intel::{self, IntelReport};
use crate::labels::{LabelOptions, LabelPlacer, PlacedLabel};
use crate::projector::{GeometryProjector, ProjectionConfig};
use crate::quadtree::{DEFAULT_LEAF_CAPACITY, SpatialIndex};
use crate::road::{FrameStats, RoadLayerConfig, RoadRenderer};
use crate::scale::{DEFAULT_REFERENCE_PX, ScaleBar};
use crate::surface::RasterSurface;
use crate::theme::Theme;
use crate::transform::{Transform, ZoomExtent};
use crate::viewport::{
    GestureEvent, GestureOptions, GestureSurface, TransitionHandle, VectorRoot,
    ViewportController, ViewportState,
};
use crate::{MapError, Result};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the map engine
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Smallest zoom scale `k` (default 1)
    pub min_zoom: f64,
    /// Largest zoom scale `k` (default 8)
    pub max_zoom: f64,
    /// Road classes, culling buffer and canvas oversize
    pub roads: RoadLayerConfig,
    /// Entries per quadtree leaf before it splits
    pub leaf_capacity: usize,
    pub labels: LabelOptions,
    /// Projection used when `fit_padding` is `None`, or when there is nothing to fit
    pub projection: ProjectionConfig,
    /// Fit the loaded regions inside the viewport minus this padding (pixels per side)
    pub fit_padding: Option<f64>,
    /// Centroid distance, in radians, under which two regions are neighbors
    pub neighbor_threshold_rad: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_zoom: 1.0,
            max_zoom: 8.0,
            roads: RoadLayerConfig::default(),
            leaf_capacity: DEFAULT_LEAF_CAPACITY,
            labels: LabelOptions::default(),
            projection: ProjectionConfig::default(),
            fit_padding: None,
            neighbor_threshold_rad: intel::DEFAULT_NEIGHBOR_THRESHOLD_RAD,
        }
    }
}

impl Config {
    pub fn zoom_extent(&self) -> Result<ZoomExtent> {
        ZoomExtent::new(self.min_zoom, self.max_zoom)
    }

    pub fn validate(&self) -> Result<()> {
        self.zoom_extent()?;
        self.roads.validate()?;
        if self.leaf_capacity == 0 {
            return Err(MapError::InvalidConfig(
                "leaf capacity must be at least 1".to_string(),
            ));
        }
        if !(self.labels.target_screen_px.is_finite() && self.labels.target_screen_px > 0.0) {
            return Err(MapError::InvalidConfig(format!(
                "label font size must be positive, got {}",
                self.labels.target_screen_px
            )));
        }
        match self.fit_padding {
            Some(padding) if !(padding.is_finite() && padding >= 0.0) => {
                return Err(MapError::InvalidConfig(format!(
                    "fit padding must be non-negative, got {padding}"
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Snapshot for the debug HUD
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineInfo {
    pub region_count: usize,
    pub road_count: usize,
    /// Roads that produced a path and live in the index
    pub indexed_roads: usize,
    pub quadtree_nodes: usize,
    pub quadtree_depth: u32,
    /// Roads stroked by the last frame
    pub drawn_roads: usize,
    /// Committed zoom scale
    pub zoom: f64,
}

pub struct MapEngine {
    config: Config,
    viewport: Option<(f64, f64)>,
    regions: Arc<FeatureCollection>,
    roads: Arc<FeatureCollection>,
    projector: Option<Arc<GeometryProjector>>,
    index: Option<Arc<SpatialIndex>>,
    controller: ViewportController,
    road_renderer: Arc<Mutex<RoadRenderer>>,
    compositor: LayerCompositor,
    labels: LabelPlacer,
}

impl std::fmt::Debug for MapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapEngine")
            .field("viewport", &self.viewport)
            .field("regions", &self.regions.len())
            .field("roads", &self.roads.len())
            .field("controller", &self.controller)
            .finish()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapEngine {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let road_renderer = Arc::new(Mutex::new(RoadRenderer::new(config.roads.clone())?));
        let mut controller = ViewportController::new(config.zoom_extent()?);
        controller.register_renderer(Box::new(road_renderer.clone()));

        Ok(Self {
            config,
            viewport: None,
            regions: Arc::new(FeatureCollection::empty()),
            roads: Arc::new(FeatureCollection::empty()),
            projector: None,
            index: None,
            controller,
            road_renderer,
            compositor: LayerCompositor::new(),
            labels: LabelPlacer::new(),
        })
    }

    fn renderer(&self) -> MutexGuard<'_, RoadRenderer> {
        self.road_renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wire a gesture surface using the configured zoom extent
    pub fn attach_gesture_surface(
        &mut self,
        surface: &mut dyn GestureSurface,
        on_transform: Option<Box<dyn FnMut(&Transform)>>,
    ) -> Result<()> {
        let options = GestureOptions {
            min_zoom: self.config.min_zoom,
            max_zoom: self.config.max_zoom,
            on_transform,
        };
        self.controller.attach_gesture_surface(surface, options)
    }

    pub fn set_vector_root(&mut self, root: Box<dyn VectorRoot>) {
        self.controller.set_vector_root(root);
    }

    /// Give the canvas of a road class to the road layer
    pub fn assign_road_canvas(&mut self, class: &str, surface: Box<dyn RasterSurface>) -> bool {
        let assigned = self.renderer().assign_canvas(class, surface);
        if assigned {
            self.controller.redraw();
        }
        assigned
    }

    pub fn set_road_class_visible(&mut self, class: &str, visible: bool) -> bool {
        self.renderer().set_class_visible(class, visible)
    }

    pub fn is_road_class_visible(&self, class: &str) -> Option<bool> {
        self.renderer().is_class_visible(class)
    }

    /// Replace the region set
    pub fn load_regions(&mut self, regions: FeatureCollection) {
        tracing::debug!("Loading {} regions", regions.len());
        self.regions = Arc::new(regions);
        if self.config.fit_padding.is_some() {
            self.rebuild_projection();
        }
    }

    /// Replace the road set and rebuild the index
    pub fn load_roads(&mut self, roads: FeatureCollection) {
        tracing::debug!("Loading {} roads", roads.len());
        self.roads = Arc::new(roads);
        self.rebuild_index();
    }

    /// Resize the viewport; rebuilds the projector and the index
    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(MapError::InvalidViewport { width, height });
        }
        if self.viewport == Some((width, height)) {
            return Ok(());
        }
        self.viewport = Some((width, height));
        self.renderer().set_viewport(width, height);
        self.rebuild_projection();
        Ok(())
    }

    fn rebuild_projection(&mut self) {
        let Some((width, height)) = self.viewport else {
            return;
        };
        let projector = match self.config.fit_padding {
            Some(padding) => GeometryProjector::fit_extent(
                &self.regions,
                width,
                height,
                padding,
                &self.config.projection,
            ),
            None => GeometryProjector::new(&self.config.projection, width, height),
        };
        match projector {
            Ok(projector) => self.projector = Some(Arc::new(projector)),
            Err(e) => {
                tracing::warn!("Failed to build projector: {e}");
                self.projector = None;
            }
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        profiling::scope!("MapEngine::rebuild_index");
        self.index = self.projector.as_ref().map(|projector| {
            Arc::new(SpatialIndex::build(
                self.roads.clone(),
                projector.clone(),
                self.config.leaf_capacity,
            ))
        });
        if let Some(index) = &self.index {
            tracing::debug!(
                "Road index ready: {} entries, {} nodes, depth {}",
                index.len(),
                index.node_count(),
                index.depth()
            );
        }
        self.renderer().set_index(self.index.clone());
        self.controller.redraw();
    }

    pub fn handle_gesture(&mut self, event: GestureEvent) -> Option<Transform> {
        self.controller.handle_gesture(event)
    }

    pub fn zoom_to(
        &mut self,
        target: Transform,
        duration: Duration,
        now: Duration,
    ) -> TransitionHandle {
        self.controller.programmatic_zoom_to(target, duration, now)
    }

    /// Transform that frames a region inside the viewport minus `padding_px` per side
    pub fn region_transform(&self, code: &str, padding_px: f64) -> Option<Transform> {
        let projector = self.projector.as_ref()?;
        let path = projector.project(&self.regions.find(code)?.geometry)?;
        let (width, height) = projector.viewport();
        let bounds = path.bounds();
        let inner_w = (width - 2.0 * padding_px).max(1.0);
        let inner_h = (height - 2.0 * padding_px).max(1.0);
        let k = (inner_w / bounds.width().max(f64::EPSILON))
            .min(inner_h / bounds.height().max(f64::EPSILON));
        let k = self.controller.zoom_extent().clamp(k);
        let center = bounds.center();
        Some(Transform::new(
            width / 2.0 - center.x * k,
            height / 2.0 - center.y * k,
            k,
        ))
    }

    pub fn tick(&mut self, now: Duration) -> Option<Transform> {
        self.controller.tick(now)
    }

    /// Publish pending transform changes; call once per host frame
    pub fn flush_commits(&mut self) -> Option<Transform> {
        self.controller.flush_commits()
    }

    /// Bring the region layers up to date; returns how many re-rendered
    pub fn compose(
        &mut self,
        theme: Theme,
        game_state: GameState,
        answered: &BTreeSet<String>,
        feedback: Option<&AnswerFeedback>,
    ) -> usize {
        let Some(projector) = self.projector.as_ref() else {
            return 0;
        };
        let inputs = LayerInputs {
            regions: &self.regions,
            projector,
            theme,
            game_state,
            answered,
            feedback,
            hovered: self.controller.state().hovered.as_deref(),
        };
        self.compositor.compose(&inputs)
    }

    /// Hit-test a pointer event against the live transform
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<InteractionEvent> {
        let transform = self.controller.transform();
        let interaction = self.compositor.handle_pointer(event, &transform)?;
        if let InteractionEvent::Hover(code) = &interaction {
            self.controller.set_hovered(code.clone());
        }
        Some(interaction)
    }

    /// Labels for the committed transform
    pub fn labels(&mut self) -> Vec<PlacedLabel> {
        let Some(projector) = self.projector.as_ref() else {
            return Vec::new();
        };
        let transform = self.controller.state().committed;
        self.labels.place_all(
            &self.regions,
            projector,
            &transform,
            projector.viewport(),
            &self.config.labels,
        )
    }

    /// Names of the roads through a region, sorted
    pub fn query_region(&self, code: &str) -> Vec<String> {
        match self.regions.find(code) {
            Some(region) => self.renderer().query_region(region),
            None => Vec::new(),
        }
    }

    pub fn region_intel(&self, code: &str) -> Option<IntelReport> {
        let region = self.regions.find(code)?;
        Some(IntelReport {
            code: code.to_string(),
            name: region.name().unwrap_or(code).to_string(),
            neighbors: intel::adjacent_regions(
                region,
                &self.regions,
                self.config.neighbor_threshold_rad,
            ),
            roads: self.renderer().query_region(region),
        })
    }

    pub fn scale_bar(&self) -> Option<ScaleBar> {
        let projector = self.projector.as_ref()?;
        ScaleBar::measure(projector, &self.controller.state().committed, DEFAULT_REFERENCE_PX)
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            region_count: self.regions.len(),
            road_count: self.roads.len(),
            indexed_roads: self.index.as_ref().map_or(0, |i| i.len()),
            quadtree_nodes: self.index.as_ref().map_or(0, |i| i.node_count()),
            quadtree_depth: self.index.as_ref().map_or(0, |i| i.depth()),
            drawn_roads: self.renderer().last_frame().drawn_count(),
            zoom: self.controller.state().committed.k,
        }
    }

    pub fn last_frame(&self) -> FrameStats {
        self.renderer().last_frame().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn regions(&self) -> &Arc<FeatureCollection> {
        &self.regions
    }

    pub fn roads(&self) -> &Arc<FeatureCollection> {
        &self.roads
    }

    pub fn projector(&self) -> Option<&Arc<GeometryProjector>> {
        self.projector.as_ref()
    }

    pub fn index(&self) -> Option<&Arc<SpatialIndex>> {
        self.index.as_ref()
    }

    pub fn compositor(&self) -> &LayerCompositor {
        &self.compositor
    }

    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    /// Live transform
    pub fn transform(&self) -> Transform {
        self.controller.transform()
    }

    pub fn state(&self) -> &ViewportState {
        self.controller.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::surface::RecordingSurface;
    use geo::{Coord, LineString, polygon};

    fn square(code: &str, name: &str, lon: f64, lat: f64, d: f64) -> Feature {
        Feature::region(
            code,
            name,
            polygon![
                (x: lon, y: lat),
                (x: lon + d, y: lat),
                (x: lon + d, y: lat + d),
                (x: lon, y: lat + d),
                (x: lon, y: lat),
            ],
        )
    }

    /// Regions A, B, C side by side; one motorway inside A, one far to the east
    fn engine() -> (MapEngine, RecordingSurface) {
        let mut engine = MapEngine::new(Config {
            labels: LabelOptions {
                min_screen_area: 0.0,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        engine.load_regions(FeatureCollection::new(vec![
            square("A", "Alpha", 127.0, 37.5, 0.1),
            square("B", "Bravo", 127.5, 37.5, 0.1),
            square("C", "Charlie", 128.0, 37.5, 0.1),
        ]));
        engine.load_roads(FeatureCollection::new(vec![
            Feature::road(
                "motorway",
                Some("Inner Ring".to_string()),
                LineString::from(vec![(127.02, 37.55), (127.08, 37.56)]),
            ),
            Feature::road(
                "motorway",
                Some("Far Coast".to_string()),
                LineString::from(vec![(140.0, 35.0), (140.1, 35.1)]),
            ),
        ]));
        let canvas = RecordingSurface::new();
        assert!(engine.assign_road_canvas("motorway", Box::new(canvas.clone())));
        engine.resize(800.0, 600.0).unwrap();
        (engine, canvas)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = Config {
            min_zoom: 4.0,
            max_zoom: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            MapEngine::new(config),
            Err(MapError::InvalidZoomExtent { .. })
        ));
        let config = Config {
            leaf_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            MapEngine::new(config),
            Err(MapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_queries_before_resize_are_empty() {
        let mut engine = MapEngine::new(Config::default()).unwrap();
        engine.load_regions(FeatureCollection::new(vec![square("A", "Alpha", 127.0, 37.5, 0.1)]));
        assert!(engine.query_region("A").is_empty());
        assert!(engine.labels().is_empty());
        assert!(engine.scale_bar().is_none());
        assert!(engine.resize(0.0, 10.0).is_err());
    }

    #[test]
    fn test_region_query_end_to_end() {
        let (engine, _canvas) = engine();
        assert_eq!(engine.query_region("A"), vec!["Inner Ring"]);
        assert!(engine.query_region("B").is_empty());
        assert!(engine.query_region("missing").is_empty());

        let intel = engine.region_intel("A").unwrap();
        assert_eq!(intel.name, "Alpha");
        assert_eq!(intel.neighbors, vec!["Bravo", "Charlie"]);
        assert_eq!(intel.roads, vec!["Inner Ring"]);
    }

    #[test]
    fn test_pan_culls_draw_but_not_index() {
        let (mut engine, canvas) = engine();
        assert_eq!(engine.last_frame().drawn, vec![0]);
        assert_eq!(canvas.stroke_count(), 1);

        // Zoom on A so that B and C leave the viewport
        let target = engine.region_transform("A", 20.0).unwrap();
        engine.zoom_to(target, Duration::ZERO, Duration::ZERO);
        engine.flush_commits();

        let labels: Vec<String> = engine.labels().into_iter().map(|l| l.code).collect();
        assert_eq!(labels, vec!["A"]);
        assert_eq!(engine.last_frame().drawn, vec![0]);

        // Pan A out as well: nothing is drawn but the index is untouched
        engine.handle_gesture(GestureEvent::Start);
        engine.handle_gesture(GestureEvent::Pan {
            dx: -5000.0,
            dy: 0.0,
        });
        engine.handle_gesture(GestureEvent::End);
        assert!(engine.last_frame().drawn.is_empty());
        assert_eq!(canvas.stroke_count(), 0);
        assert_eq!(engine.info().indexed_roads, 2);
        assert_eq!(engine.query_region("A"), vec!["Inner Ring"]);
    }

    #[test]
    fn test_hover_flows_into_highlight() {
        let (mut engine, _canvas) = engine();
        let answered = BTreeSet::new();
        assert_eq!(engine.compose(Theme::Tactical, GameState::Playing, &answered, None), 3);

        let projector = engine.projector().unwrap().clone();
        let over_b = engine
            .transform()
            .apply(projector.project_coord(Coord { x: 127.55, y: 37.55 }));
        assert_eq!(
            engine.handle_pointer(PointerEvent::Move(over_b)),
            Some(InteractionEvent::Hover(Some("B".to_string())))
        );
        assert_eq!(engine.state().hovered.as_deref(), Some("B"));
        assert_eq!(engine.compose(Theme::Tactical, GameState::Playing, &answered, None), 1);
        assert_eq!(engine.compositor().highlight().paints()[0].code, "B");
    }

    #[test]
    fn test_resize_rebuilds_index() {
        let (mut engine, _canvas) = engine();
        let before = engine.projector().unwrap().generation();
        engine.resize(1024.0, 768.0).unwrap();
        let index = engine.index().unwrap();
        assert_ne!(index.projector().generation(), before);
        assert_eq!(index.projector().viewport(), (1024.0, 768.0));
    }

    #[test]
    fn test_fit_padding_frames_regions() {
        let mut engine = MapEngine::new(Config {
            fit_padding: Some(10.0),
            ..Default::default()
        })
        .unwrap();
        engine.resize(800.0, 600.0).unwrap();
        engine.load_regions(FeatureCollection::new(vec![
            square("A", "Alpha", 126.0, 36.0, 1.0),
            square("B", "Bravo", 128.0, 38.0, 1.0),
        ]));
        let projector = engine.projector().unwrap();
        for code in ["A", "B"] {
            let bounds = projector
                .project(&engine.regions().find(code).unwrap().geometry)
                .unwrap()
                .bounds();
            assert!(bounds.min().x >= 9.999 && bounds.max().x <= 790.001);
            assert!(bounds.min().y >= 9.999 && bounds.max().y <= 590.001);
        }
    }

    #[test]
    fn test_info_and_scale_bar() {
        let (engine, _canvas) = engine();
        let info = engine.info();
        assert_eq!(info.region_count, 3);
        assert_eq!(info.road_count, 2);
        assert_eq!(info.drawn_roads, 1);
        assert_eq!(info.zoom, 1.0);
        let bar = engine.scale_bar().unwrap();
        assert!(bar.width_px > 0.0 && bar.width_px <= DEFAULT_REFERENCE_PX);
    }
}
