//! Zoom/pan transform shared by every layer
//!
//! Projected map coordinates (pixels at `k = 1`) map to screen pixels through
//! `screen = map * k + (x, y)`. Every layer receives the same [`LayerMatrix`] so the vector
//! layer and the road canvases never drift apart.

use crate::{MapError, Result};
use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Viewport transform: screen-pixel translation plus uniform scale
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub const fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.k.is_finite()
    }

    /// Map coordinate to screen coordinate
    #[inline(always)]
    pub fn apply(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: c.x * self.k + self.x,
            y: c.y * self.k + self.y,
        }
    }

    /// Screen coordinate to map coordinate
    #[inline(always)]
    pub fn invert(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.x) / self.k,
            y: (c.y - self.y) / self.k,
        }
    }

    pub fn invert_rect(&self, rect: Rect<f64>) -> Rect<f64> {
        Rect::new(self.invert(rect.min()), self.invert(rect.max()))
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            k: self.k,
        }
    }

    /// Scale by `factor` keeping the map point under `anchor` (screen pixels) fixed
    pub fn zoom_about(&self, anchor: Coord<f64>, factor: f64, extent: &ZoomExtent) -> Self {
        let k = extent.clamp(self.k * factor);
        let world = self.invert(anchor);
        Self {
            x: anchor.x - world.x * k,
            y: anchor.y - world.y * k,
            k,
        }
    }

    pub fn with_clamped_scale(&self, extent: &ZoomExtent) -> Self {
        Self {
            k: extent.clamp(self.k),
            ..*self
        }
    }

    /// Matrix for the vector root (no canvas offset)
    pub fn matrix(&self) -> LayerMatrix {
        self.matrix_with_offset(Coord { x: 0.0, y: 0.0 })
    }

    /// `translate(offset) -> translate(x, y) -> scale(k)`
    pub fn matrix_with_offset(&self, offset: Coord<f64>) -> LayerMatrix {
        LayerMatrix {
            scale: self.k,
            translate_x: offset.x + self.x,
            translate_y: offset.y + self.y,
        }
    }

    /// Interpolate toward `to`: translation linearly, scale geometrically
    pub fn interpolate(&self, to: &Transform, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            k: self.k * (to.k / self.k).powf(t),
        }
    }
}

/// Flattened layer matrix, the single transform pipeline every surface uses
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerMatrix {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl LayerMatrix {
    #[inline(always)]
    pub fn apply(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: c.x * self.scale + self.translate_x,
            y: c.y * self.scale + self.translate_y,
        }
    }
}

/// Allowed range of the scale `k`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ZoomExtent {
    min: f64,
    max: f64,
}

impl ZoomExtent {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(MapError::InvalidZoomExtent { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    #[inline(always)]
    pub fn clamp(&self, k: f64) -> f64 {
        if k.is_nan() {
            return self.min;
        }
        k.clamp(self.min, self.max)
    }

    pub fn contains(&self, k: f64) -> bool {
        k >= self.min && k <= self.max
    }
}

impl Default for ZoomExtent {
    fn default() -> Self {
        Self { min: 1.0, max: 8.0 }
    }
}

/// Cubic ease-in-out over `[0, 1]`
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
