use anyhow::{ensure, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::color::Rgb;
use crate::filter::visual::{MarkerStyle, US_CENTER};

pub const DEFAULT_GEOJSON: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson";
pub const DEFAULT_API: &str = "http://localhost:5000/api";
const DEFAULT_GLOBE_COLOR: Rgb = Rgb::from_hex(0x1e3a8a);

#[derive(Parser, Debug, Default)]
#[command(version, about = "Interactive terminal globe with cascading research filters")]
pub struct Cli {
    /// GeoJSON FeatureCollection of country outlines: a file path or http(s) URL
    #[arg(long)]
    pub geojson: Option<String>,

    /// Base URL of the research REST service
    #[arg(long)]
    pub api: Option<String>,

    /// TOML settings file. Defaults to ./globe.toml when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start with auto-rotation off
    #[arg(long)]
    pub no_rotate: bool,

    /// Where tracing output goes; the terminal belongs to the UI
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Runtime configuration, layered defaults → TOML file → `GLOBE_*` env → CLI
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub geojson: String,
    pub api_base: String,
    pub globe_color: String,
    pub auto_rotate: bool,
    /// Radians per second
    pub rotate_speed: f64,
    pub inner_glow: bool,
    pub marker_min_size: f64,
    pub marker_max_size: f64,
    /// Degrees of scatter around the marker centre
    pub marker_jitter: f64,
    pub sample_markers: bool,
    pub log_file: String,
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name("globe").required(false),
        };

        let config = Config::builder()
            .set_default("geojson", DEFAULT_GEOJSON)?
            .set_default("api_base", DEFAULT_API)?
            .set_default("globe_color", "#1e3a8a")?
            .set_default("auto_rotate", true)?
            .set_default("rotate_speed", 0.15)?
            .set_default("inner_glow", false)?
            .set_default("marker_min_size", 1.5)?
            .set_default("marker_max_size", 6.0)?
            .set_default("marker_jitter", 8.0)?
            .set_default("sample_markers", true)?
            .set_default("log_file", "research-globe.log")?
            .set_default("request_timeout_secs", 10)?
            .add_source(file)
            .add_source(Environment::with_prefix("GLOBE").try_parsing(true))
            .set_override_option("geojson", cli.geojson.clone())?
            .set_override_option("api_base", cli.api.clone())?
            .set_override_option("log_file", cli.log_file.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("auto_rotate", cli.no_rotate.then_some(false))?
            .build()
            .context("loading configuration")?;

        let settings: Settings = config.try_deserialize().context("deserializing configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.marker_min_size > 0.0, "marker_min_size must be positive");
        ensure!(
            self.marker_max_size >= self.marker_min_size,
            "marker_max_size must be at least marker_min_size"
        );
        ensure!(self.marker_jitter >= 0.0, "marker_jitter must not be negative");
        ensure!(self.request_timeout_secs > 0, "request_timeout_secs must be positive");
        Ok(())
    }

    pub fn marker_style(&self) -> MarkerStyle {
        MarkerStyle {
            min_size: self.marker_min_size,
            max_size: self.marker_max_size,
            jitter: self.marker_jitter,
            center: US_CENTER,
        }
    }

    /// Globe rim colour; an unparsable value falls back to the default blue
    pub fn globe_rgb(&self) -> Rgb {
        Rgb::parse(&self.globe_color).unwrap_or_else(|| {
            tracing::warn!("invalid globe_color {:?}, using default", self.globe_color);
            DEFAULT_GLOBE_COLOR
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_toml(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("research-globe-{}-{name}.toml", std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["research-globe", "--api", "http://example.test/api", "--no-rotate"]);
        assert_eq!(cli.api.as_deref(), Some("http://example.test/api"));
        assert!(cli.no_rotate);
        assert!(cli.geojson.is_none());
    }

    #[test]
    fn test_file_then_cli_layering() {
        let path = temp_toml(
            "layering",
            "api_base = \"http://from-file/api\"\nmarker_jitter = 2.5\ninner_glow = true\n",
        );
        let cli = Cli {
            config: Some(path.clone()),
            api: Some("http://from-cli/api".into()),
            no_rotate: true,
            ..Cli::default()
        };
        let settings = Settings::load(&cli).unwrap();
        fs::remove_file(path).ok();

        assert_eq!(settings.api_base, "http://from-cli/api");
        assert_eq!(settings.marker_jitter, 2.5);
        assert!(settings.inner_glow);
        assert!(!settings.auto_rotate);
        assert_eq!(settings.marker_style().max_size, 6.0);
        assert_eq!(settings.globe_rgb(), DEFAULT_GLOBE_COLOR);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let path = temp_toml("invalid", "marker_min_size = 5.0\nmarker_max_size = 1.0\n");
        let cli = Cli {
            config: Some(path.clone()),
            ..Cli::default()
        };
        let result = Settings::load(&cli);
        fs::remove_file(path).ok();
        assert!(result.is_err());
    }
}
