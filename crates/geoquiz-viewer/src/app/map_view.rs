//! Painting of the composed map layers on an egui painter
//!
//! Region, highlight and label layers are placed with the vector group matrix, so they move
//! with every gesture frame. Road canvases replay their own strokes and matrix.

use super::state::AppState;
use super::surfaces::{color32, to_pos};
use egui::{Align2, Color32, FontId, Pos2, Rect, Shape, Stroke};
use geo::Coord;
use geoquiz_map::{
    Color, EngineInfo, LabelPlacer, LayerMatrix, RegionShape, ScaleBar, ThemeColors,
};

fn screen_bounds(shape: &RegionShape, matrix: &LayerMatrix, origin: Pos2) -> Rect {
    let bounds = shape.path.bounds();
    Rect::from_two_pos(
        to_pos(origin, matrix.apply(bounds.min())),
        to_pos(origin, matrix.apply(bounds.max())),
    )
}

fn fill_shape(shape: &RegionShape, matrix: &LayerMatrix, origin: Pos2, color: Color) -> Shape {
    let color = color32(color);
    let mut mesh = egui::Mesh::default();
    mesh.reserve_vertices(shape.mesh.vertices.len());
    mesh.reserve_triangles(shape.mesh.indices.len() / 3);
    for &v in &shape.mesh.vertices {
        mesh.colored_vertex(to_pos(origin, matrix.apply(v)), color);
    }
    for tri in shape.mesh.indices.chunks_exact(3) {
        mesh.add_triangle(tri[0], tri[1], tri[2]);
    }
    Shape::mesh(mesh)
}

fn outline_shapes(
    shape: &RegionShape,
    matrix: &LayerMatrix,
    origin: Pos2,
    stroke: Stroke,
) -> impl Iterator<Item = Shape> {
    shape.path.outlines().iter().map(move |ring| {
        let points: Vec<Pos2> = ring
            .iter()
            .map(|&c| to_pos(origin, matrix.apply(c)))
            .collect();
        Shape::closed_line(points, stroke)
    })
}

/// Base layer: every region with its status fill, outlined when boundaries are on
pub fn paint_regions(painter: &egui::Painter, rect: Rect, state: &AppState, matrix: &LayerMatrix) {
    profiling::scope!("paint_regions");
    let origin = rect.min;
    let compositor = state.engine.compositor();
    for paint in compositor.base().paints() {
        let Some(shape) = compositor.shape(paint.index) else {
            continue;
        };
        if !rect.intersects(screen_bounds(shape, matrix, origin)) {
            continue;
        }
        painter.add(fill_shape(shape, matrix, origin, paint.fill));
        if state.ui_settings.show_boundaries {
            let stroke = Stroke::new(paint.stroke_px as f32, color32(paint.stroke));
            painter.extend(outline_shapes(shape, matrix, origin, stroke));
        }
    }
}

/// Highlight layer: hover outline and wrong-answer flash on top of roads
pub fn paint_highlight(
    painter: &egui::Painter,
    rect: Rect,
    state: &AppState,
    matrix: &LayerMatrix,
) {
    let origin = rect.min;
    let compositor = state.engine.compositor();
    for paint in compositor.highlight().paints() {
        let Some(shape) = compositor.shape(paint.index) else {
            continue;
        };
        if let Some(fill) = paint.fill {
            painter.add(fill_shape(shape, matrix, origin, fill));
        }
        let stroke = Stroke::new(paint.stroke_px as f32, color32(paint.stroke));
        painter.extend(outline_shapes(shape, matrix, origin, stroke));
    }
}

/// Region names at their label anchors, constant on-screen size
pub fn paint_labels(
    painter: &egui::Painter,
    rect: Rect,
    state: &mut AppState,
    matrix: &LayerMatrix,
    colors: &ThemeColors,
) {
    profiling::scope!("paint_labels");
    let origin = rect.min;
    let halo = color32(colors.label_halo);
    for label in state.engine.labels() {
        let anchor = Coord {
            x: label.placement.x,
            y: label.placement.y,
        };
        let pos = to_pos(origin, matrix.apply(anchor));
        let font = FontId::proportional((label.placement.font_size * matrix.scale) as f32);
        let color = LabelPlacer::label_color(colors, &label.code, &state.selection.answered, None);
        for offset in [egui::vec2(1.0, 1.0), egui::vec2(-1.0, -1.0)] {
            painter.text(pos + offset, Align2::CENTER_CENTER, &label.text, font.clone(), halo);
        }
        painter.text(pos, Align2::CENTER_CENTER, &label.text, font, color32(color));
    }
}

/// Zoom, drawn roads and hovered region in the bottom-left corner
pub fn paint_hud(
    painter: &egui::Painter,
    rect: Rect,
    info: &EngineInfo,
    hovered: Option<&str>,
    debug: bool,
) {
    let mut lines = vec![format!(
        "zoom {:.2}x | {} roads drawn",
        info.zoom, info.drawn_roads
    )];
    if let Some(hovered) = hovered {
        lines.push(hovered.to_string());
    }
    if debug {
        lines.push(format!(
            "{} regions | {}/{} roads indexed | quadtree {} nodes, depth {}",
            info.region_count,
            info.indexed_roads,
            info.road_count,
            info.quadtree_nodes,
            info.quadtree_depth
        ));
    }

    let font = FontId::monospace(12.0);
    let line_height = 16.0;
    let pad = 8.0;
    let height = lines.len() as f32 * line_height + 2.0 * pad;
    let bg = Rect::from_min_size(
        Pos2::new(rect.min.x + 10.0, rect.max.y - height - 10.0),
        egui::vec2(420.0_f32.min(rect.width() - 20.0).max(0.0), height),
    );
    painter.rect_filled(bg, 4.0, Color32::from_black_alpha(160));
    for (i, line) in lines.iter().enumerate() {
        painter.text(
            Pos2::new(bg.min.x + pad, bg.min.y + pad + i as f32 * line_height),
            Align2::LEFT_TOP,
            line,
            font.clone(),
            Color32::WHITE,
        );
    }
}

/// Scale bar in the bottom-right corner
pub fn paint_scale_bar(painter: &egui::Painter, rect: Rect, bar: &ScaleBar, color: Color32) {
    let width = bar.width_px as f32;
    let right = rect.max.x - 16.0;
    let y = rect.max.y - 20.0;
    let left = right - width;
    let stroke = Stroke::new(2.0, color);
    painter.line_segment([Pos2::new(left, y), Pos2::new(right, y)], stroke);
    for x in [left, right] {
        painter.line_segment([Pos2::new(x, y - 6.0), Pos2::new(x, y)], stroke);
    }
    painter.text(
        Pos2::new(left + width / 2.0, y - 4.0),
        Align2::CENTER_BOTTOM,
        bar.label(),
        FontId::proportional(12.0),
        color,
    );
}
