//! Viewport controller: the single writer of the zoom/pan transform
//!
//! The controller runs two channels. Every transform change is pushed synchronously, inside the
//! same call that received the gesture, to the vector root and to every registered
//! [`FrameRenderer`]. The declarative consumers (labels, HUD, scale bar) only see the transform
//! once the host calls [`ViewportController::flush_commits`], which coalesces all changes since
//! the previous flush into one commit.

use crate::transform::{LayerMatrix, Transform, ZoomExtent, ease_in_out_cubic};
use crate::Result;
use geo::Coord;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

/// Per-frame raster renderer hook
pub trait FrameRenderer {
    fn draw(&mut self, transform: &Transform);
}

/// Root of the vector layer; receives the layer matrix directly
pub trait VectorRoot {
    fn set_matrix(&mut self, matrix: LayerMatrix);
}

/// Input surface that produces gestures
pub trait GestureSurface {
    /// Double-click is application click semantics, never a zoom
    fn set_double_click_zoom(&mut self, enabled: bool);
}

impl<R: FrameRenderer> FrameRenderer for Arc<Mutex<R>> {
    fn draw(&mut self, transform: &Transform) {
        match self.try_lock() {
            Ok(mut renderer) => renderer.draw(transform),
            Err(TryLockError::WouldBlock) => {
                tracing::warn!("Renderer busy, skipping frame");
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().draw(transform),
        }
    }
}

impl<V: VectorRoot> VectorRoot for Arc<Mutex<V>> {
    fn set_matrix(&mut self, matrix: LayerMatrix) {
        match self.try_lock() {
            Ok(mut root) => root.set_matrix(matrix),
            Err(TryLockError::WouldBlock) => {
                tracing::warn!("Vector root busy, skipping matrix update");
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().set_matrix(matrix),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Gesturing,
}

/// Continuous pan/zoom/pinch input, already filtered by the host
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    Start,
    /// Translate by screen pixels
    Pan { dx: f64, dy: f64 },
    /// Scale by `factor` about a screen-space anchor
    Zoom { anchor: Coord<f64>, factor: f64 },
    End,
}

/// Options of [`ViewportController::attach_gesture_surface`]
pub struct GestureOptions {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Called once per commit with the committed transform
    pub on_transform: Option<Box<dyn FnMut(&Transform)>>,
}

impl Default for GestureOptions {
    fn default() -> Self {
        Self {
            min_zoom: 1.0,
            max_zoom: 8.0,
            on_transform: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RendererHandle(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionHandle(u64);

#[derive(Clone, Copy, Debug)]
struct Transition {
    handle: TransitionHandle,
    from: Transform,
    to: Transform,
    start: Duration,
    duration: Duration,
}

/// Committed state read by the declarative layers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewportState {
    pub committed: Transform,
    pub hovered: Option<String>,
    /// Number of commits so far
    pub commits: u64,
}

pub struct ViewportController {
    extent: ZoomExtent,
    transform: Transform,
    gesture: GestureState,
    transition: Option<Transition>,
    vector_root: Option<Box<dyn VectorRoot>>,
    renderers: Vec<(RendererHandle, Box<dyn FrameRenderer>)>,
    next_id: u64,
    pending_commit: Option<Transform>,
    state: ViewportState,
    on_transform: Option<Box<dyn FnMut(&Transform)>>,
}

impl std::fmt::Debug for ViewportController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportController")
            .field("extent", &self.extent)
            .field("transform", &self.transform)
            .field("gesture", &self.gesture)
            .field("renderers", &self.renderers.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ZoomExtent::default())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ViewportController {
    pub fn new(extent: ZoomExtent) -> Self {
        let transform = Transform::IDENTITY.with_clamped_scale(&extent);
        Self {
            extent,
            transform,
            gesture: GestureState::Idle,
            transition: None,
            vector_root: None,
            renderers: Vec::new(),
            next_id: 1,
            pending_commit: None,
            state: ViewportState {
                committed: transform,
                ..Default::default()
            },
            on_transform: None,
        }
    }

    /// Wire a gesture surface with a zoom extent and a commit callback
    ///
    /// Fails only when the extent is invalid; the controller is left untouched in that case.
    pub fn attach_gesture_surface(
        &mut self,
        surface: &mut dyn GestureSurface,
        options: GestureOptions,
    ) -> Result<()> {
        let extent = ZoomExtent::new(options.min_zoom, options.max_zoom)?;
        surface.set_double_click_zoom(false);
        self.extent = extent;
        self.on_transform = options.on_transform;
        self.gesture = GestureState::Idle;
        self.transition = None;
        let clamped = self.transform.with_clamped_scale(&extent);
        self.apply(clamped);
        Ok(())
    }

    pub fn set_vector_root(&mut self, mut root: Box<dyn VectorRoot>) {
        root.set_matrix(self.transform.matrix());
        self.vector_root = Some(root);
    }

    /// Register a renderer; it is drawn immediately with the current transform
    pub fn register_renderer(&mut self, mut renderer: Box<dyn FrameRenderer>) -> RendererHandle {
        let handle = RendererHandle(self.next_id);
        self.next_id += 1;
        renderer.draw(&self.transform);
        self.renderers.push((handle, renderer));
        handle
    }

    pub fn unregister_renderer(&mut self, handle: RendererHandle) -> Option<Box<dyn FrameRenderer>> {
        let position = self.renderers.iter().position(|(h, _)| *h == handle)?;
        Some(self.renderers.remove(position).1)
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    /// Feed one gesture event; returns the emitted transform, if it changed
    pub fn handle_gesture(&mut self, event: GestureEvent) -> Option<Transform> {
        match event {
            GestureEvent::Start => {
                self.cancel_transition();
                self.gesture = GestureState::Gesturing;
                None
            }
            GestureEvent::Pan { dx, dy } => {
                self.cancel_transition();
                self.gesture = GestureState::Gesturing;
                if !(dx.is_finite() && dy.is_finite()) {
                    return None;
                }
                let next = self.transform.translated(dx, dy);
                self.apply(next)
            }
            GestureEvent::Zoom { anchor, factor } => {
                self.cancel_transition();
                self.gesture = GestureState::Gesturing;
                if !(factor.is_finite() && factor > 0.0) {
                    return None;
                }
                let next = self.transform.zoom_about(anchor, factor, &self.extent);
                self.apply(next)
            }
            GestureEvent::End => {
                self.gesture = GestureState::Idle;
                None
            }
        }
    }

    /// Start an interpolated move toward `target`
    ///
    /// Ends any gesture and replaces any previous transition. A zero duration applies the target
    /// immediately.
    pub fn programmatic_zoom_to(
        &mut self,
        target: Transform,
        duration: Duration,
        now: Duration,
    ) -> TransitionHandle {
        let handle = TransitionHandle(self.next_id);
        self.next_id += 1;
        self.gesture = GestureState::Idle;

        let to = target.with_clamped_scale(&self.extent);
        if duration.is_zero() {
            self.transition = None;
            self.apply(to);
        } else {
            self.transition = Some(Transition {
                handle,
                from: self.transform,
                to,
                start: now,
                duration,
            });
        }
        handle
    }

    /// Advance the current transition to `now`
    pub fn tick(&mut self, now: Duration) -> Option<Transform> {
        let transition = self.transition?;
        let elapsed = now.saturating_sub(transition.start).as_secs_f64();
        let t = (elapsed / transition.duration.as_secs_f64()).clamp(0.0, 1.0);
        let next = if t >= 1.0 {
            self.transition = None;
            transition.to
        } else {
            transition
                .from
                .interpolate(&transition.to, ease_in_out_cubic(t))
        };
        self.apply(next)
    }

    pub fn cancel_transition(&mut self) {
        if let Some(transition) = self.transition.take() {
            tracing::trace!("Cancelled transition {:?}", transition.handle);
        }
    }

    pub fn active_transition(&self) -> Option<TransitionHandle> {
        self.transition.map(|t| t.handle)
    }

    /// Jump to `transform` without animation (clamped)
    pub fn set_transform(&mut self, transform: Transform) -> Option<Transform> {
        self.cancel_transition();
        self.apply(transform)
    }

    /// Redraw every renderer with the current transform (after a data or index swap)
    pub fn redraw(&mut self) {
        let transform = self.transform;
        for (_, renderer) in &mut self.renderers {
            renderer.draw(&transform);
        }
    }

    fn apply(&mut self, next: Transform) -> Option<Transform> {
        profiling::scope!("ViewportController::apply");
        if !next.is_finite() {
            tracing::warn!("Ignoring non-finite transform {next:?}");
            return None;
        }
        let next = next.with_clamped_scale(&self.extent);
        if next == self.transform {
            return None;
        }
        self.transform = next;

        // (1) vector root, (2) raster renderers, (3) scheduled commit
        if let Some(root) = self.vector_root.as_mut() {
            root.set_matrix(next.matrix());
        }
        for (_, renderer) in &mut self.renderers {
            renderer.draw(&next);
        }
        self.pending_commit = Some(next);
        Some(next)
    }

    /// Publish the latest transform to the declarative side; call once per host frame
    pub fn flush_commits(&mut self) -> Option<Transform> {
        let transform = self.pending_commit.take()?;
        self.state.committed = transform;
        self.state.commits += 1;
        if let Some(callback) = self.on_transform.as_mut() {
            callback(&transform);
        }
        Some(transform)
    }

    pub fn has_pending_commit(&self) -> bool {
        self.pending_commit.is_some()
    }

    /// Returns `true` if the hovered code changed
    pub fn set_hovered(&mut self, code: Option<String>) -> bool {
        if self.state.hovered == code {
            return false;
        }
        self.state.hovered = code;
        true
    }

    /// Live transform (what the renderers last drew)
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture
    }

    pub fn zoom_extent(&self) -> ZoomExtent {
        self.extent
    }
}
