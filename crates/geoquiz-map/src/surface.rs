//! Raster drawing surfaces
//!
//! A [`RasterSurface`] is the 2D context of one road canvas. The engine only ever clears it,
//! sets its layer matrix and strokes polylines given in projected map coordinates; the host
//! decides how that becomes pixels.

use crate::theme::Color;
use crate::transform::LayerMatrix;
use geo::Coord;
use std::sync::{Arc, Mutex, PoisonError};

/// Stroke of one polyline; `width` is in map units (already divided by `k`)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

pub trait RasterSurface {
    /// `false` while the context cannot be drawn to (creation failed, detached, ...)
    fn is_available(&self) -> bool {
        true
    }

    /// Resize the backing store in canvas pixels; drops current content
    fn resize(&mut self, width: f64, height: f64);

    fn clear(&mut self);

    fn set_matrix(&mut self, matrix: LayerMatrix);

    fn stroke_polyline(&mut self, points: &[Coord<f64>], style: StrokeStyle);

    /// Visibility toggle, never requires a redraw
    fn set_visible(&mut self, visible: bool);
}

/// One recorded drawing call
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCommand {
    SetMatrix(LayerMatrix),
    Stroke {
        points: Vec<Coord<f64>>,
        style: StrokeStyle,
    },
}

#[derive(Debug, Default)]
struct Recording {
    size: (f64, f64),
    /// Commands since the last clear, i.e. what the canvas currently shows
    frame: Vec<SurfaceCommand>,
    clears: u64,
    visible: bool,
    available: bool,
}

/// Headless surface that records its current frame
///
/// Clones share the same recording, so a caller can keep a handle after giving the surface
/// away to a renderer.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    inner: Arc<Mutex<Recording>>,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recording {
                visible: true,
                available: true,
                ..Default::default()
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Commands drawn since the last clear
    pub fn frame(&self) -> Vec<SurfaceCommand> {
        self.with(|r| r.frame.clone())
    }

    /// Number of strokes in the current frame
    pub fn stroke_count(&self) -> usize {
        self.with(|r| {
            r.frame
                .iter()
                .filter(|c| matches!(c, SurfaceCommand::Stroke { .. }))
                .count()
        })
    }

    pub fn clear_count(&self) -> u64 {
        self.with(|r| r.clears)
    }

    pub fn size(&self) -> (f64, f64) {
        self.with(|r| r.size)
    }

    pub fn is_visible(&self) -> bool {
        self.with(|r| r.visible)
    }

    /// Simulate losing the context
    pub fn set_available(&self, available: bool) {
        self.with(|r| r.available = available);
    }
}

impl RasterSurface for RecordingSurface {
    fn is_available(&self) -> bool {
        self.with(|r| r.available)
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.with(|r| {
            r.size = (width, height);
            r.frame.clear();
        });
    }

    fn clear(&mut self) {
        self.with(|r| {
            r.frame.clear();
            r.clears += 1;
        });
    }

    fn set_matrix(&mut self, matrix: LayerMatrix) {
        self.with(|r| r.frame.push(SurfaceCommand::SetMatrix(matrix)));
    }

    fn stroke_polyline(&mut self, points: &[Coord<f64>], style: StrokeStyle) {
        self.with(|r| {
            r.frame.push(SurfaceCommand::Stroke {
                points: points.to_vec(),
                style,
            })
        });
    }

    fn set_visible(&mut self, visible: bool) {
        self.with(|r| r.visible = visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_resets_frame() {
        let handle = RecordingSurface::new();
        let mut surface = handle.clone();
        surface.stroke_polyline(
            &[Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }],
            StrokeStyle {
                color: Color::rgb(1, 2, 3),
                width: 1.0,
            },
        );
        assert_eq!(handle.stroke_count(), 1);
        surface.clear();
        assert_eq!(handle.stroke_count(), 0);
        assert_eq!(handle.clear_count(), 1);
    }

    #[test]
    fn test_visibility_does_not_touch_frame() {
        let handle = RecordingSurface::new();
        let mut surface = handle.clone();
        surface.set_matrix(LayerMatrix {
            scale: 2.0,
            translate_x: 0.0,
            translate_y: 0.0,
        });
        surface.set_visible(false);
        assert!(!handle.is_visible());
        assert_eq!(handle.frame().len(), 1);
    }
}
