//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use trail_encoder::{Color, EncoderConfig};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub encoding: EncoderConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    pub csv: Option<PathBuf>,
    pub feed_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CanvasConfig {
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub height: f64,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_stroke")]
    pub stroke: Color,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
}

fn default_extent() -> f64 {
    1000.0
}

fn default_background() -> Color {
    Color::WHITE
}

fn default_stroke() -> Color {
    Color::BLACK
}

fn default_line_width() -> f64 {
    1.0
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_extent(),
            height: default_extent(),
            background: default_background(),
            stroke: default_stroke(),
            line_width: default_line_width(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_svg")]
    pub svg: PathBuf,
    pub legend: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub report: bool,
}

fn default_svg() -> PathBuf {
    PathBuf::from("trails.svg")
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            svg: default_svg(),
            legend: None,
            report: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// Reconnect attempts before giving up (0 = keep trying)
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    /// Stop after this many frames
    pub max_frames: Option<usize>,
    /// Re-render after this many accepted frames
    #[serde(default = "default_render_every")]
    pub render_every: usize,
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    30_000
}

fn default_render_every() -> usize {
    1
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            max_frames: None,
            render_every: default_render_every(),
        }
    }
}

/// Where observations come from in this run
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Csv(PathBuf),
    Feed(String),
}

impl AppConfig {
    /// The single configured observation source
    pub fn source(&self) -> Result<Source> {
        match (&self.input.csv, &self.input.feed_url) {
            (Some(path), None) => Ok(Source::Csv(path.clone())),
            (None, Some(url)) => Ok(Source::Feed(url.clone())),
            (Some(_), Some(_)) => bail!("input.csv and input.feed_url are mutually exclusive"),
            (None, None) => bail!("no input: set input.csv or input.feed_url"),
        }
    }

    /// Check the whole configuration before starting a run
    pub fn validate(&self) -> Result<()> {
        self.source()?;
        self.encoding
            .validate()
            .context("Invalid [encoding] section")?;

        let canvas = &self.canvas;
        for (name, value) in [
            ("width", canvas.width),
            ("height", canvas.height),
            ("line_width", canvas.line_width),
        ] {
            if !value.is_finite() || value <= 0.0 {
                bail!("canvas.{} must be a positive number, got {}", name, value);
            }
        }

        if self.feed.render_every == 0 {
            bail!("feed.render_every must be at least 1");
        }
        if self.feed.initial_backoff_ms > self.feed.max_backoff_ms {
            bail!(
                "feed.initial_backoff_ms ({}) exceeds feed.max_backoff_ms ({})",
                self.feed.initial_backoff_ms,
                self.feed.max_backoff_ms
            );
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
