#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

fn main() {
    if let Err(e) = geoquiz_viewer::run_native() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
