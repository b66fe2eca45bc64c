//! UI panels for the application
//!
//! Sidebar with layer toggles and view controls, plus the region intel popup.

use crate::app::state::AppState;
use egui::{RichText, Ui};
use geoquiz_map::{Theme, Transform};
use std::time::Duration;

/// Duration of the animated zooms started from the UI
const ZOOM_DURATION: Duration = Duration::from_millis(600);

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());
    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };
    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };
    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }
    egui::SidePanel::right("main_sidebar")
        .default_width(280.0)
        .min_width(240.0)
        .max_width(420.0)
        .resizable(true)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                render_view_section(ui, state);
                ui.separator();
                render_road_section(ui, state);
                ui.separator();
                render_selection_section(ui, state);
            });
        });
}

fn render_view_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("View");
    egui::ComboBox::from_label("Theme")
        .selected_text(state.ui_settings.theme.name())
        .show_ui(ui, |ui| {
            for theme in Theme::ALL {
                ui.selectable_value(&mut state.ui_settings.theme, theme, theme.name());
            }
        });
    ui.checkbox(&mut state.ui_settings.show_labels, "Region labels");
    ui.checkbox(&mut state.ui_settings.show_boundaries, "Region boundaries");
    ui.checkbox(&mut state.ui_settings.show_debug, "Debug info");

    ui.horizontal(|ui| {
        if ui.button("Reset view").clicked() {
            let now = state.now();
            state.engine.zoom_to(Transform::IDENTITY, ZOOM_DURATION, now);
        }
        let hovered = state.engine.state().hovered.clone();
        if ui
            .add_enabled(hovered.is_some(), egui::Button::new("Zoom to hovered"))
            .clicked()
            && let Some(code) = hovered
        {
            zoom_to_region(state, &code);
        }
    });
}

fn render_road_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Roads");
    let classes: Vec<(String, f64)> = state
        .engine
        .config()
        .roads
        .classes
        .iter()
        .rev()
        .map(|style| (style.class.clone(), style.min_zoom))
        .collect();
    let mut all = state.any_road_class_visible();
    if ui.checkbox(&mut all, RichText::new("All roads").strong()).changed() {
        state.set_all_road_classes_visible(all);
    }
    let zoom = state.engine.state().committed.k;
    for (class, min_zoom) in classes {
        let mut visible = state.engine.is_road_class_visible(&class).unwrap_or(false);
        let label = if zoom < min_zoom {
            RichText::new(format!("{class} (from {min_zoom}x)")).weak()
        } else {
            RichText::new(class.as_str())
        };
        if ui.checkbox(&mut visible, label).changed() {
            state.set_road_class_visible(&class, visible);
        }
    }
    let frame = state.engine.last_frame();
    for (class, count) in &frame.per_class {
        ui.label(RichText::new(format!("{class}: {count} drawn")).small());
    }
}

fn render_selection_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Regions");
    ui.label(format!(
        "{} regions, {} marked",
        state.engine.regions().len(),
        state.selection.answered.len()
    ));
    if ui
        .add_enabled(
            !state.selection.answered.is_empty(),
            egui::Button::new("Clear marks"),
        )
        .clicked()
    {
        state.selection.answered.clear();
    }
    ui.label(
        RichText::new("Click or right-click a region for its intel. Drag to pan, scroll to zoom.")
            .small()
            .weak(),
    );
}

fn zoom_to_region(state: &mut AppState, code: &str) {
    match state.engine.region_transform(code, 40.0) {
        Some(target) => {
            let now = state.now();
            state.engine.zoom_to(target, ZOOM_DURATION, now);
        }
        None => tracing::warn!("Cannot frame region {code:?}"),
    }
}

/// Region intel popup, anchored where the region was clicked
pub fn render_intel_popup(ctx: &egui::Context, state: &mut AppState) {
    let Some(popup) = state.intel.clone() else {
        return;
    };
    let report = &popup.report;
    let mut open = true;
    let mut zoom = false;
    let mut toggle_mark = false;

    egui::Window::new(RichText::new(&report.name).strong())
        .id(egui::Id::new("intel_popup"))
        .default_pos(popup.anchor)
        .collapsible(false)
        .resizable(false)
        .open(&mut open)
        .show(ctx, |ui| {
            ui.label(RichText::new(&report.code).monospace().weak());
            ui.add_space(4.0);

            ui.label(RichText::new("Neighbors").strong());
            if report.neighbors.is_empty() {
                ui.label(RichText::new("none nearby").weak());
            }
            for name in &report.neighbors {
                ui.label(name);
            }
            ui.add_space(4.0);

            ui.label(RichText::new(format!("Roads ({})", report.roads.len())).strong());
            egui::ScrollArea::vertical()
                .max_height(180.0)
                .show(ui, |ui| {
                    for road in &report.roads {
                        ui.label(road);
                    }
                });
            ui.separator();

            ui.horizontal(|ui| {
                zoom = ui.button("Zoom to region").clicked();
                let marked = state.selection.answered.contains(&report.code);
                let text = if marked { "Unmark" } else { "Mark answered" };
                toggle_mark = ui.button(text).clicked();
            });
        });

    if zoom {
        zoom_to_region(state, &report.code);
    }
    if toggle_mark {
        state.selection.toggle_answered(&report.code);
    }
    if !open {
        state.intel = None;
    }
}
