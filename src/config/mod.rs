//! Configuration types for the visualizer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for rendering position logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Number of interleaved bodies in each position log
    #[serde(default = "default_bodies")]
    pub bodies: usize,

    /// Exclusive cap on the row index considered (None = all rows)
    #[serde(default)]
    pub row_cap: Option<usize>,

    /// Points drawn per body (None = every point)
    #[serde(default)]
    pub sample_size: Option<usize>,

    /// Clip each axis to mean +/- nsigma standard deviations
    #[serde(default)]
    pub clip: bool,

    /// Clip factor in standard deviations
    #[serde(default = "default_nsigma")]
    pub nsigma: f64,

    /// Seed for point sampling (None = system entropy)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Directory that receives rendered images
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Extension of position logs picked up from directory arguments
    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    /// Extension (and therefore format) of rendered images
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Image width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Image height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Marker radius in pixels
    #[serde(default = "default_marker_size")]
    pub marker_size: u32,

    /// Log progress after this many files
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    /// RGB colors assigned to bodies, wrapping by body index
    #[serde(default = "default_palette")]
    pub palette: Vec<[u8; 3]>,

    /// Draw caption, axis labels and legend text (needs system fonts)
    #[serde(default = "default_draw_text")]
    pub draw_text: bool,
}

fn default_bodies() -> usize {
    2
}

fn default_nsigma() -> f64 {
    3.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("imgs")
}

fn default_input_extension() -> String {
    "csv".to_string()
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_width() -> u32 {
    2000
}

fn default_height() -> u32 {
    1000
}

fn default_marker_size() -> u32 {
    1
}

fn default_progress_every() -> usize {
    10
}

fn default_palette() -> Vec<[u8; 3]> {
    vec![
        [255, 0, 0], // red
        [0, 0, 255], // blue
        [0, 128, 0], // green
    ]
}

fn default_draw_text() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bodies: default_bodies(),
            row_cap: None,
            sample_size: None,
            clip: false,
            nsigma: default_nsigma(),
            seed: None,
            output_dir: default_output_dir(),
            input_extension: default_input_extension(),
            image_extension: default_image_extension(),
            width: default_width(),
            height: default_height(),
            marker_size: default_marker_size(),
            progress_every: default_progress_every(),
            palette: default_palette(),
            draw_text: default_draw_text(),
        }
    }
}

/// Configuration for locating the last frame of a numbered image sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Directory holding the sequence
    #[serde(default = "default_locator_directory")]
    pub directory: PathBuf,

    /// File name prefix before the digits
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// File extension after the digits
    #[serde(default = "default_image_extension")]
    pub extension: String,

    /// Position counted from the end of the sorted matches (0 = last)
    #[serde(default)]
    pub rank: usize,

    /// Sort on the parsed number instead of the file name
    #[serde(default)]
    pub numeric: bool,
}

fn default_locator_directory() -> PathBuf {
    PathBuf::from("./imgs")
}

fn default_prefix() -> String {
    "energy".to_string()
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            directory: default_locator_directory(),
            prefix: default_prefix(),
            extension: default_image_extension(),
            rank: 0,
            numeric: false,
        }
    }
}

/// Top-level configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisConfig {
    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub locator: LocatorConfig,
}

impl VisConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: VisConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
