use clap::{Parser, ValueEnum};
use geoquiz_map::{Config, LabelOptions, RoadLayerConfig, Theme};

/// Map theme selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    Tactical,
    Kids,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Tactical => Theme::Tactical,
            ThemeArg::Kids => Theme::Kids,
        }
    }
}

/// Startup settings
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Settings {
    /// Smallest zoom scale
    #[clap(long, default_value_t = 1.0)]
    pub min_zoom: f64,

    /// Largest zoom scale
    #[clap(long, default_value_t = 8.0)]
    pub max_zoom: f64,

    /// Extra pixels around the viewport in which roads are still drawn
    #[clap(long, default_value_t = 64.0)]
    pub cull_buffer: f64,

    /// Entries per quadtree leaf before it splits
    #[clap(long, default_value_t = 16)]
    pub leaf_capacity: usize,

    /// On-screen label font size in pixels
    #[clap(long, default_value_t = 12.0)]
    pub label_size: f64,

    /// Smallest on-screen region area (square pixels) that gets a label
    #[clap(long, default_value_t = 400.0)]
    pub min_label_area: f64,

    /// Padding (pixels) kept around the regions when fitting them to the window
    #[clap(long, default_value_t = 24.0)]
    pub fit_padding: f64,

    /// Map theme, overrides the persisted one
    #[clap(long, value_enum)]
    pub theme: Option<ThemeArg>,

    /// Regions per side of the generated demo grid
    #[clap(long, default_value_t = 12)]
    pub demo_regions: usize,

    /// Number of generated demo roads
    #[clap(long, default_value_t = 20_000)]
    pub demo_roads: usize,

    /// Seed of the demo data generator
    #[clap(long, default_value_t = 7)]
    pub seed: u64,

    /// Start from default UI settings instead of the persisted ones
    #[clap(long)]
    pub ignore_persisted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::parse_from(["geoquiz-viewer"])
    }
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Self::try_parse() {
            Ok(settings) => settings,
            Err(e) => e.exit(),
        }
    }

    pub fn to_config(&self) -> Config {
        Config {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            roads: RoadLayerConfig {
                cull_buffer_px: self.cull_buffer,
                ..Default::default()
            },
            leaf_capacity: self.leaf_capacity,
            labels: LabelOptions {
                target_screen_px: self.label_size,
                min_screen_area: self.min_label_area,
                ..Default::default()
            },
            fit_padding: Some(self.fit_padding),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = Settings::default().to_config();
        let defaults = Config::default();
        assert_eq!(config.min_zoom, defaults.min_zoom);
        assert_eq!(config.max_zoom, defaults.max_zoom);
        assert_eq!(config.leaf_capacity, defaults.leaf_capacity);
        assert_eq!(config.labels, defaults.labels);
        assert_eq!(config.roads, defaults.roads);
        assert_eq!(config.fit_padding, Some(24.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let settings = Settings::parse_from([
            "geoquiz-viewer",
            "--max-zoom",
            "12",
            "--theme",
            "kids",
            "--ignore-persisted",
        ]);
        assert_eq!(settings.max_zoom, 12.0);
        assert_eq!(settings.theme.map(Theme::from), Some(Theme::Kids));
        assert!(settings.ignore_persisted);
    }

    #[test]
    fn test_inverted_zoom_is_rejected_by_config() {
        let settings = Settings::parse_from(["geoquiz-viewer", "--min-zoom", "9"]);
        assert!(settings.to_config().validate().is_err());
    }
}
