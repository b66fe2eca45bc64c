//! egui implementations of the engine's surface traits
//!
//! Road canvases record their strokes into a shared buffer; the map panel replays the buffer
//! every egui frame. The vector group only stores the latest layer matrix. Gestures and pointer
//! events are translated from egui input into engine events here.

use egui::{Color32, Pos2, Stroke};
use geo::Coord;
use geoquiz_map::{
    Color, GestureEvent, GestureSurface, LayerMatrix, PointerEvent, RasterSurface, StrokeStyle,
    VectorRoot,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Wheel scroll points per doubling of the zoom scale
const WHEEL_POINTS_PER_DOUBLING: f32 = 400.0;

pub fn color32(c: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

#[inline]
pub fn to_pos(origin: Pos2, c: Coord<f64>) -> Pos2 {
    Pos2::new(origin.x + c.x as f32, origin.y + c.y as f32)
}

#[inline]
pub fn to_coord(v: egui::Vec2) -> Coord<f64> {
    Coord {
        x: v.x as f64,
        y: v.y as f64,
    }
}

#[derive(Default)]
struct CanvasBuffer {
    size: (f64, f64),
    matrix: Option<LayerMatrix>,
    strokes: Vec<(Vec<Coord<f64>>, StrokeStyle)>,
    hidden: bool,
}

/// Road canvas backed by a stroke list that egui replays
#[derive(Clone, Default)]
pub struct EguiCanvas {
    inner: Arc<Mutex<CanvasBuffer>>,
}

impl EguiCanvas {
    fn buffer(&self) -> MutexGuard<'_, CanvasBuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stroke_count(&self) -> usize {
        self.buffer().strokes.len()
    }

    /// Replay the canvas into `rect`, the on-screen viewport the canvas is centered on
    pub fn paint(&self, painter: &egui::Painter, rect: egui::Rect) {
        profiling::scope!("EguiCanvas::paint");
        let buffer = self.buffer();
        if buffer.hidden {
            return;
        }
        let Some(matrix) = buffer.matrix else {
            return;
        };
        // The canvas is oversized and centered on the viewport
        let origin = Pos2::new(
            rect.min.x - ((buffer.size.0 - rect.width() as f64) / 2.0) as f32,
            rect.min.y - ((buffer.size.1 - rect.height() as f64) / 2.0) as f32,
        );
        for (points, style) in &buffer.strokes {
            let width = (style.width * matrix.scale) as f32;
            let screen: Vec<Pos2> = points
                .iter()
                .map(|&c| to_pos(origin, matrix.apply(c)))
                .collect();
            painter.add(egui::Shape::line(
                screen,
                Stroke::new(width, color32(style.color)),
            ));
        }
    }
}

impl RasterSurface for EguiCanvas {
    fn resize(&mut self, width: f64, height: f64) {
        let mut buffer = self.buffer();
        buffer.size = (width, height);
        buffer.strokes.clear();
    }

    fn clear(&mut self) {
        self.buffer().strokes.clear();
    }

    fn set_matrix(&mut self, matrix: LayerMatrix) {
        self.buffer().matrix = Some(matrix);
    }

    fn stroke_polyline(&mut self, points: &[Coord<f64>], style: StrokeStyle) {
        self.buffer().strokes.push((points.to_vec(), style));
    }

    fn set_visible(&mut self, visible: bool) {
        self.buffer().hidden = !visible;
    }
}

/// Transformed group holding the region, highlight and label layers
pub struct VectorGroup {
    matrix: LayerMatrix,
}

impl Default for VectorGroup {
    fn default() -> Self {
        Self {
            matrix: LayerMatrix {
                scale: 1.0,
                translate_x: 0.0,
                translate_y: 0.0,
            },
        }
    }
}

impl VectorGroup {
    pub fn matrix(&self) -> LayerMatrix {
        self.matrix
    }
}

impl VectorRoot for VectorGroup {
    fn set_matrix(&mut self, matrix: LayerMatrix) {
        self.matrix = matrix;
    }
}

/// Translates egui input on the map panel into gestures and pointer events
#[derive(Debug)]
pub struct MapInput {
    double_click_zoom: bool,
    was_hovered: bool,
}

impl Default for MapInput {
    fn default() -> Self {
        Self {
            double_click_zoom: true,
            was_hovered: false,
        }
    }
}

impl GestureSurface for MapInput {
    fn set_double_click_zoom(&mut self, enabled: bool) {
        self.double_click_zoom = enabled;
    }
}

impl MapInput {
    /// Gesture events for this frame, anchors relative to the panel origin
    pub fn gestures(&self, response: &egui::Response, input: &egui::InputState) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        let origin = response.rect.min;

        if response.drag_started() {
            events.push(GestureEvent::Start);
        }
        if response.dragged() {
            let delta = response.drag_delta();
            if delta != egui::Vec2::ZERO {
                events.push(GestureEvent::Pan {
                    dx: delta.x as f64,
                    dy: delta.y as f64,
                });
            }
        }

        // Plain wheel scrolls; Ctrl+wheel and trackpad pinch arrive through zoom_delta
        let anchor = response.hover_pos().map(|p| to_coord(p - origin));
        let wheel = input.smooth_scroll_delta.y;
        if let Some(anchor) = anchor
            && wheel != 0.0
        {
            events.push(GestureEvent::Zoom {
                anchor,
                factor: 2f64.powf((wheel / WHEEL_POINTS_PER_DOUBLING) as f64),
            });
        }
        let zoom = input.zoom_delta();
        let zoom_anchor = input
            .multi_touch()
            .map(|touch| to_coord(touch.center_pos - origin))
            .or(anchor);
        if zoom != 1.0
            && let Some(anchor) = zoom_anchor
        {
            events.push(GestureEvent::Zoom {
                anchor,
                factor: zoom as f64,
            });
        }
        if self.double_click_zoom
            && response.double_clicked()
            && let Some(anchor) = anchor
        {
            events.push(GestureEvent::Zoom {
                anchor,
                factor: 2.0,
            });
        }

        if response.drag_stopped() {
            events.push(GestureEvent::End);
        } else if !response.dragged() && !events.is_empty() {
            // Wheel and pinch frames are self-contained gestures
            events.push(GestureEvent::End);
        }
        events
    }

    /// Pointer events for this frame, positions relative to the panel origin
    pub fn pointer(&mut self, response: &egui::Response) -> Vec<PointerEvent> {
        let origin = response.rect.min;
        let mut events = Vec::new();
        match response.hover_pos() {
            Some(pos) if !response.dragged() => {
                events.push(PointerEvent::Move(to_coord(pos - origin)));
                self.was_hovered = true;
            }
            None if self.was_hovered => {
                events.push(PointerEvent::Leave);
                self.was_hovered = false;
            }
            _ => {}
        }
        if let Some(pos) = response.interact_pointer_pos() {
            let local = to_coord(pos - origin);
            if response.clicked() {
                events.push(PointerEvent::Click(local));
            }
            if response.secondary_clicked() {
                events.push(PointerEvent::ContextMenu(local));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_input(events: Vec<egui::Event>) -> egui::RawInput {
        egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                Pos2::ZERO,
                egui::vec2(800.0, 600.0),
            )),
            events,
            ..Default::default()
        }
    }

    /// Run one frame with a full-panel map response and collect its gestures
    fn run_frame(ctx: &egui::Context, input: &MapInput, raw: egui::RawInput) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        let _ = ctx.run(raw, |ctx| {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    let response =
                        ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
                    events = ui.input(|i| input.gestures(&response, i));
                });
        });
        events
    }

    #[test]
    fn test_zoom_event_becomes_zoom_gesture() {
        let ctx = egui::Context::default();
        let input = MapInput::default();
        let pointer = egui::Event::PointerMoved(Pos2::new(100.0, 80.0));

        // First frame registers the map widget so the pointer hovers it on the next one
        let first = run_frame(&ctx, &input, raw_input(vec![pointer.clone()]));
        assert!(first.is_empty());

        let events = run_frame(
            &ctx,
            &input,
            raw_input(vec![pointer, egui::Event::Zoom(1.5)]),
        );
        assert_eq!(events.len(), 2, "{events:?}");
        match events[0] {
            GestureEvent::Zoom { anchor, factor } => {
                assert!((factor - 1.5).abs() < 1e-6);
                assert_eq!(anchor, Coord { x: 100.0, y: 80.0 });
            }
            ref other => panic!("expected a zoom, got {other:?}"),
        }
        assert!(matches!(events[1], GestureEvent::End));
    }

    #[test]
    fn test_no_input_no_gestures() {
        let ctx = egui::Context::default();
        let input = MapInput::default();
        for _ in 0..2 {
            assert!(run_frame(&ctx, &input, raw_input(Vec::new())).is_empty());
        }
    }

    #[test]
    fn test_canvas_records_and_clears_strokes() {
        let mut canvas = EguiCanvas::default();
        canvas.resize(100.0, 100.0);
        canvas.stroke_polyline(
            &[Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 }],
            StrokeStyle {
                color: Color::rgb(255, 255, 255),
                width: 1.0,
            },
        );
        assert_eq!(canvas.clone().stroke_count(), 1);
        canvas.clear();
        assert_eq!(canvas.stroke_count(), 0);
    }
}
