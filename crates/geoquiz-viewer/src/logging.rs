use tracing_subscriber::prelude::*;

/// Initialize logging with sensible defaults
///
/// `RUST_LOG` wins when set. With the `profiling` feature the `profiling` scopes are emitted as
/// tracing spans, so they show up through the same subscriber.
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            std::env::set_var("RUST_LOG", "info,eframe=warn,egui_wgpu=warn");
        }
    }

    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(fmt_layer).init();

    tracing::info!(
        "{} {} starting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
}
