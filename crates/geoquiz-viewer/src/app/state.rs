use super::surfaces::{EguiCanvas, MapInput, VectorGroup};
use geoquiz_map::{GameState, IntelReport, LayerMatrix, MapEngine, Theme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// UI settings that survive restarts
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiSettings {
    pub theme: Theme,
    pub sidebar_open: bool,
    pub show_labels: bool,
    /// Region outlines on the base layer
    pub show_boundaries: bool,
    pub show_debug: bool,
    /// Road classes switched off in the sidebar
    pub hidden_road_classes: BTreeSet<String>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            sidebar_open: true,
            show_labels: true,
            show_boundaries: true,
            show_debug: false,
            hidden_road_classes: BTreeSet::new(),
        }
    }
}

/// Region-select screen state driving the region layers
#[derive(Debug, Clone)]
pub struct SelectionState {
    pub game_state: GameState,
    /// Regions marked from the intel popup, shown with the answered style
    pub answered: BTreeSet<String>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            game_state: GameState::LevelSelect,
            answered: BTreeSet::new(),
        }
    }
}

impl SelectionState {
    /// Toggle the answered mark of a region; returns whether it is now marked
    pub fn toggle_answered(&mut self, code: &str) -> bool {
        if self.answered.remove(code) {
            false
        } else {
            self.answered.insert(code.to_string());
            true
        }
    }
}

/// Region info popup
#[derive(Debug, Clone)]
pub struct IntelPopup {
    pub report: IntelReport,
    pub anchor: egui::Pos2,
}

pub struct AppState {
    pub engine: MapEngine,
    pub ui_settings: UiSettings,
    pub selection: SelectionState,
    pub intel: Option<IntelPopup>,
    /// One canvas per road class, bottom to top
    pub road_canvases: Vec<(String, EguiCanvas)>,
    pub vector_group: Arc<Mutex<VectorGroup>>,
    pub input: MapInput,
    pub started: instant::Instant,
}

impl AppState {
    /// Matrix last pushed to the region, highlight and label layers
    pub fn vector_matrix(&self) -> LayerMatrix {
        self.vector_group
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .matrix()
    }

    /// Clock handed to the engine's transitions
    pub fn now(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn set_road_class_visible(&mut self, class: &str, visible: bool) {
        if !self.engine.set_road_class_visible(class, visible) {
            tracing::warn!("Unknown road class {class:?}");
            return;
        }
        if visible {
            self.ui_settings.hidden_road_classes.remove(class);
        } else {
            self.ui_settings.hidden_road_classes.insert(class.to_string());
        }
    }

    /// Master road switch: show or hide every class at once
    pub fn set_all_road_classes_visible(&mut self, visible: bool) {
        let classes: Vec<String> = self
            .engine
            .config()
            .roads
            .classes
            .iter()
            .map(|style| style.class.clone())
            .collect();
        for class in classes {
            self.set_road_class_visible(&class, visible);
        }
    }

    /// Whether at least one road class is switched on
    pub fn any_road_class_visible(&self) -> bool {
        self.engine
            .config()
            .roads
            .classes
            .iter()
            .any(|style| self.engine.is_road_class_visible(&style.class) == Some(true))
    }

    /// Open the intel popup for a region, or close it if the region is unknown
    pub fn open_intel(&mut self, code: &str, anchor: egui::Pos2) {
        self.intel = self
            .engine
            .region_intel(code)
            .map(|report| IntelPopup { report, anchor });
        if let Some(popup) = &self.intel {
            tracing::debug!(
                "Intel for {}: {} neighbors, {} roads",
                popup.report.code,
                popup.report.neighbors.len(),
                popup.report.roads.len()
            );
        }
    }
}
