//! Application module
//!
//! This module provides the main application structure:
//! - Full-screen map with the region, road, highlight and label layers
//! - Drag to pan, wheel, Ctrl+wheel or pinch to zoom
//! - Toggleable sidebar with layer toggles and view controls
//! - Region intel popup on click

mod demo;
mod map_view;
pub mod settings;
mod state;
mod surfaces;
mod ui_panels;

use crate::app::settings::Settings;
use crate::app::state::{AppState, SelectionState, UiSettings};
use crate::app::surfaces::{EguiCanvas, MapInput, VectorGroup, color32, to_coord};
use eframe::egui;
use geoquiz_map::{InteractionEvent, MapEngine, MapError, Transform};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Map engine error: {0}")]
    Map(#[from] MapError),

    #[error("Window error: {0}")]
    Window(#[from] eframe::Error),
}

/// Persisted settings (lightweight, no map data)
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    ui: UiSettings,
    /// Last committed view
    view: Option<Transform>,
}

/// Main application structure
pub struct GeoQuizViewerApp {
    state: AppState,
}

impl GeoQuizViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Result<Self, AppError> {
        let persisted = if settings.ignore_persisted {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
            None
        } else {
            cc.storage.and_then(Self::load_persisted_settings)
        };
        let (mut ui_settings, view) = match persisted {
            Some(p) => (p.ui, p.view),
            None => (UiSettings::default(), None),
        };
        if let Some(theme) = settings.theme {
            ui_settings.theme = theme.into();
        }

        let mut engine = MapEngine::new(settings.to_config())?;

        let mut input = MapInput::default();
        let ctx = cc.egui_ctx.clone();
        engine.attach_gesture_surface(
            &mut input,
            Some(Box::new(move |t: &Transform| {
                tracing::trace!("Transform {:.1},{:.1} k={:.3}", t.x, t.y, t.k);
                ctx.request_repaint();
            })),
        )?;

        let vector_group = Arc::new(Mutex::new(VectorGroup::default()));
        engine.set_vector_root(Box::new(vector_group.clone()));

        let classes: Vec<String> = engine
            .config()
            .roads
            .classes
            .iter()
            .map(|style| style.class.clone())
            .collect();
        let mut road_canvases = Vec::with_capacity(classes.len());
        for class in classes {
            let canvas = EguiCanvas::default();
            engine.assign_road_canvas(&class, Box::new(canvas.clone()));
            road_canvases.push((class, canvas));
        }

        engine.load_regions(demo::regions(settings.demo_regions, settings.seed));
        engine.load_roads(demo::roads(settings.demo_roads, settings.seed));
        tracing::info!(
            "Loaded demo map: {} regions, {} roads",
            engine.regions().len(),
            engine.roads().len()
        );

        let mut state = AppState {
            engine,
            ui_settings,
            selection: SelectionState::default(),
            intel: None,
            road_canvases,
            vector_group,
            input,
            started: instant::Instant::now(),
        };
        let hidden: Vec<String> = state.ui_settings.hidden_road_classes.iter().cloned().collect();
        for class in hidden {
            state.set_road_class_visible(&class, false);
        }
        if let Some(view) = view {
            let now = state.now();
            state.engine.zoom_to(view, std::time::Duration::ZERO, now);
        }

        Ok(Self { state })
    }

    /// Load persisted settings from storage
    fn load_persisted_settings(storage: &dyn eframe::Storage) -> Option<PersistedSettings> {
        if let Some(json) = storage.get_string("persisted_settings")
            && !json.is_empty()
        {
            match serde_json::from_str::<PersistedSettings>(&json) {
                Ok(settings) => {
                    tracing::info!("Restored settings");
                    return Some(settings);
                }
                Err(e) => tracing::warn!("Discarding persisted settings: {e}"),
            }
        }
        tracing::info!("No persisted settings found, starting fresh");
        None
    }

    fn show_map(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let state = &mut self.state;

        if rect.width() >= 1.0
            && rect.height() >= 1.0
            && let Err(e) = state
                .engine
                .resize(rect.width() as f64, rect.height() as f64)
        {
            tracing::warn!("Skipping resize: {e}");
        }

        // Gestures redraw the roads synchronously; the other layers follow the commit below
        let gestures = ui.input(|i| state.input.gestures(&response, i));
        for event in gestures {
            state.engine.handle_gesture(event);
        }
        let now = state.now();
        state.engine.tick(now);
        if state.engine.controller().active_transition().is_some() {
            ui.ctx().request_repaint();
        }
        if let Some(committed) = state.engine.flush_commits() {
            tracing::trace!("Committed k={:.3}", committed.k);
        }

        for event in state.input.pointer(&response) {
            match state.engine.handle_pointer(event) {
                Some(InteractionEvent::Click(code) | InteractionEvent::ContextMenu(code)) => {
                    let anchor = response.interact_pointer_pos().unwrap_or(rect.center());
                    state.open_intel(&code, anchor);
                }
                Some(InteractionEvent::Hover(code)) => {
                    tracing::trace!("Hover {code:?}");
                }
                None => {}
            }
        }
        if state.engine.state().hovered.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        }

        let theme = state.ui_settings.theme;
        let rendered = state.engine.compose(
            theme,
            state.selection.game_state,
            &state.selection.answered,
            None,
        );
        if rendered > 0 {
            tracing::trace!("{rendered} region layers re-rendered");
        }

        let colors = theme.colors();
        let painter = painter.with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, color32(colors.background));
        let matrix = state.vector_matrix();
        map_view::paint_regions(&painter, rect, state, &matrix);
        for (_, canvas) in &state.road_canvases {
            canvas.paint(&painter, rect);
        }
        map_view::paint_highlight(&painter, rect, state, &matrix);
        if state.ui_settings.show_labels {
            map_view::paint_labels(&painter, rect, state, &matrix, colors);
        }

        let hovered = state
            .engine
            .state()
            .hovered
            .as_deref()
            .and_then(|code| state.engine.regions().find(code))
            .and_then(|region| region.name());
        map_view::paint_hud(
            &painter,
            rect,
            &state.engine.info(),
            hovered,
            state.ui_settings.show_debug,
        );
        if let Some(bar) = state.engine.scale_bar() {
            map_view::paint_scale_bar(&painter, rect, &bar, color32(colors.label));
        }
        if state.ui_settings.show_debug
            && let Some(pos) = response.hover_pos()
            && let Some(projector) = state.engine.projector()
        {
            let lonlat = projector.invert(state.engine.transform().invert(to_coord(pos - rect.min)));
            painter.text(
                pos + egui::vec2(12.0, 12.0),
                egui::Align2::LEFT_TOP,
                format!("{:.4}, {:.4}", lonlat.y, lonlat.x),
                egui::FontId::monospace(11.0),
                color32(colors.label),
            );
        }
    }
}

#[profiling::all_functions]
impl eframe::App for GeoQuizViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui_panels::render_sidebar(ctx, &mut self.state);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.show_map(ui);
                ui_panels::sidebar_toggle_button(ui, &mut self.state);
            });

        ui_panels::render_intel_popup(ctx, &mut self.state);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            ui: self.state.ui_settings.clone(),
            view: Some(self.state.engine.state().committed),
        };
        match serde_json::to_string(&settings) {
            Ok(json) => storage.set_string("persisted_settings", json),
            Err(e) => tracing::warn!("Failed to serialize settings: {e}"),
        }
    }
}
