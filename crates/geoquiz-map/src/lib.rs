//! GeoQuiz Map - Rendering and Interaction Engine for a Region Quiz
//!
//! This library keeps a vector (region) layer, a raster (road) layer and the overlay layers of a
//! geographic quiz in lockstep while the player pans and zooms. Road segments are culled through
//! a quadtree so that tens of thousands of them can be redrawn on every gesture frame.
//!
//! # Architecture
//!
//! - **[`GeometryProjector`]**: Mercator projection from lon/lat to screen pixels at `k = 1`
//! - **[`SpatialIndex`]**: Arena quadtree over projected road centroids and bounds
//! - **[`ViewportController`]**: Single writer of the zoom/pan [`Transform`], drives renderers
//!   synchronously and commits state for the declarative layers once per frame
//! - **[`RoadRenderer`]**: One [`RasterSurface`] per road class, culled and LOD filtered
//! - **[`LayerCompositor`]**: Base / Highlight / Interaction layers with dirty-field memoization
//! - **[`LabelPlacer`]**: Area-thresholded labels with a constant on-screen font size
//! - **[`MapEngine`]**: High-level manager wiring all of the above together
//!
//! # Performance Characteristics
//!
//! - **Index Build**: O(N log N), once per dataset or projection change
//! - **Frame Culling**: O(log N + K) where K = entries in the buffered window
//! - **Highlight Layer**: O(1) per hover or feedback change

mod compositor;
mod engine;
mod feature;
pub mod intel;
mod labels;
mod projector;
mod quadtree;
mod road;
pub mod scale;
mod surface;
mod theme;
mod transform;
pub mod utils;
mod viewport;

// Public API exports
pub use compositor::{
    AnswerFeedback, BaseKey, BaseLayer, Cursor, GameState, HighlightKey, HighlightLayer,
    HighlightPaint, HitTarget, InteractionEvent, InteractionKey, InteractionLayer, LayerCompositor,
    LayerDiff, LayerInputs, PointerEvent, RegionPaint, RegionShape, RegionStatus,
};
pub use engine::{Config, EngineInfo, MapEngine};
pub use feature::{Feature, FeatureCollection, Properties};
pub use intel::IntelReport;
pub use labels::{LabelOptions, LabelPlacement, LabelPlacer, PlacedLabel, place_label};
pub use projector::{FillMesh, GeometryProjector, ProjectedPath, ProjectionConfig};
pub use quadtree::{QueryStats, SpatialIndex, SpatialIndexEntry};
pub use road::{FrameStats, RoadClassStyle, RoadLayerConfig, RoadRenderer};
pub use scale::ScaleBar;
pub use surface::{RasterSurface, RecordingSurface, StrokeStyle, SurfaceCommand};
pub use theme::{Color, Theme, ThemeColors};
pub use transform::{LayerMatrix, Transform, ZoomExtent};
pub use viewport::{
    FrameRenderer, GestureEvent, GestureOptions, GestureState, GestureSurface, RendererHandle,
    TransitionHandle, VectorRoot, ViewportController, ViewportState,
};

/// Error types for the map engine
///
/// Only construction-time contract violations are errors. Everything that can happen inside a
/// gesture callback degrades to a no-op or an empty result instead.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Invalid zoom extent: min {min} must be positive and not above max {max}")]
    InvalidZoomExtent { min: f64, max: f64 },

    #[error("Invalid viewport size: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(Config) -> Result<MapEngine> = MapEngine::new;
        let _: fn() -> Config = Config::default;
        let _: fn(f64, f64) -> Result<ZoomExtent> = ZoomExtent::new;
    }

    #[test]
    fn test_error_messages() {
        let err = MapError::InvalidZoomExtent { min: 8.0, max: 1.0 };
        assert!(err.to_string().contains("min 8"));

        let err = MapError::InvalidViewport {
            width: 0.0,
            height: 10.0,
        };
        assert_eq!(err.to_string(), "Invalid viewport size: 0x10");
    }
}
