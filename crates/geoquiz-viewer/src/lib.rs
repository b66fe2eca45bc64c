//! GeoQuiz Viewer - Application Library
//!
//! egui host for the `geoquiz-map` engine. Implements the engine's surface traits on egui
//! painters and runs the map in region-select mode over a generated demo dataset.

mod app;
mod logging;

pub use app::settings::Settings;
pub use app::{AppError, GeoQuizViewerApp};
pub use logging::setup_logging;

const APP_NAME: &str = "GeoQuiz Viewer";

/// Parse the command line, validate the map configuration and run the native window
///
/// Configuration errors are returned before any window is created.
pub fn run_native() -> Result<(), AppError> {
    setup_logging();

    let settings = Settings::from_cli();
    settings.to_config().validate()?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |cc| {
            let app = GeoQuizViewerApp::new(cc, settings).map_err(|e| e.to_string())?;
            Ok(Box::new(app))
        }),
    )?;
    Ok(())
}
