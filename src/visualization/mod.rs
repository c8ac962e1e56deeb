//! 3-D scatter rendering of per-body position samples.
//!
//! Rendering happens in two steps. [`build_scene`] turns a position log into
//! a backend-independent [`Scene`]: one colored layer per body, a legend of
//! `(color, label)` pairs and optional clip bounds. [`render_scene`] then
//! draws that scene with plotters and writes the image.

use std::ops::Range;
use std::path::Path;

use log::debug;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use rand::Rng;
use thiserror::Error;

use crate::config::RenderConfig;
use crate::core::loaders::PositionLog;
use crate::core::series::{demultiplex, SampleSize, SamplingError};
use crate::core::stats::{axis_bounds, is_degenerate_range, min_max, AxisBounds};

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Palette must contain at least one color")]
    EmptyPalette,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Relative padding added around auto-ranged axes.
const AXIS_PADDING: f64 = 0.05;

/// Legend marker radius in pixels.
const LEGEND_MARKER_SIZE: u32 = 4;

const TITLE_FONT_SIZE: f64 = 30.0;
const LABEL_FONT_SIZE: f64 = 24.0;

/// Ordered body colors. Body `i` gets `colors[i % len]`, so bodies beyond
/// the palette size share colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Self> {
        if colors.is_empty() {
            return Err(VisualizationError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    /// Number of colors. Never zero.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Color assigned to `body`.
    #[inline]
    pub fn color_for(&self, body: usize) -> [u8; 3] {
        self.colors[body % self.colors.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: vec![[255, 0, 0], [0, 0, 255], [0, 128, 0]],
        }
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub color: [u8; 3],
    pub label: String,
}

/// Points of one body, drawn in a single color.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub body: usize,
    pub color: [u8; 3],
    pub points: Vec<(f64, f64, f64)>,
}

impl Layer {
    pub fn label(&self) -> String {
        self.body.to_string()
    }
}

/// Everything needed to draw one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub title: String,
    /// One layer per body, in body order. Empty bodies keep their layer.
    pub layers: Vec<Layer>,
    /// Per-axis visible window when clipping is enabled.
    pub clip: Option<[AxisBounds; 3]>,
}

impl Scene {
    /// Legend entries, one per body layer.
    pub fn legend(&self) -> Vec<LegendEntry> {
        self.layers
            .iter()
            .map(|layer| LegendEntry {
                color: layer.color,
                label: layer.label(),
            })
            .collect()
    }

    pub fn point_count(&self) -> usize {
        self.layers.iter().map(|l| l.points.len()).sum()
    }

    /// Visible x, y and z ranges.
    ///
    /// Uses the clip bounds when set, otherwise the padded extent of all
    /// points. Zero-width ranges are widened by 1 on each side, and
    /// non-finite ranges fall back to `-1..1`.
    pub fn axis_ranges(&self) -> [Range<f64>; 3] {
        match self.clip {
            Some(bounds) => bounds.map(|b| widen(b.lo, b.hi)),
            None => {
                let points = || self.layers.iter().flat_map(|l| l.points.iter());
                let extents = [
                    min_max(points().map(|p| p.0)),
                    min_max(points().map(|p| p.1)),
                    min_max(points().map(|p| p.2)),
                ];
                extents.map(|extent| match extent {
                    Some((lo, hi)) => {
                        let pad = (hi - lo) * AXIS_PADDING;
                        widen(lo - pad, hi + pad)
                    }
                    None => -1.0..1.0,
                })
            }
        }
    }
}

fn widen(lo: f64, hi: f64) -> Range<f64> {
    if !(lo.is_finite() && hi.is_finite()) {
        -1.0..1.0
    } else if is_degenerate_range(lo, hi) {
        let mid = lo + (hi - lo) / 2.0;
        (mid - 1.0)..(mid + 1.0)
    } else {
        lo..hi
    }
}

/// Title for an image rendered from `input`: the file name without its
/// extension.
pub fn scene_title(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| input.display().to_string())
}

/// Split `log` into per-body layers and compute clip bounds.
///
/// When clipping is enabled, bounds come from each body's *sampled* points.
/// Bodies are visited in index order and every non-empty body replaces the
/// bounds of the previous one, so the last non-empty body decides the
/// visible window.
pub fn build_scene<R: Rng + ?Sized>(
    title: impl Into<String>,
    log: &PositionLog,
    config: &RenderConfig,
    palette: &Palette,
    rng: &mut R,
) -> Result<Scene> {
    let samples = demultiplex(
        log,
        config.bodies,
        config.row_cap,
        SampleSize::from(config.sample_size),
        rng,
    )?;

    let mut clip = None;
    let mut layers = Vec::with_capacity(samples.len());

    for sample in &samples {
        if config.clip {
            if let (Some(bx), Some(by), Some(bz)) = (
                axis_bounds(&sample.x, config.nsigma),
                axis_bounds(&sample.y, config.nsigma),
                axis_bounds(&sample.z, config.nsigma),
            ) {
                clip = Some([bx, by, bz]);
            }
        }

        layers.push(Layer {
            body: sample.body,
            color: palette.color_for(sample.body),
            points: sample.points().collect(),
        });
    }

    Ok(Scene {
        title: title.into(),
        layers,
        clip,
    })
}

/// Image geometry and text switches for [`render_scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub marker_size: u32,
    /// Caption, axis labels and legend need a system font. Disable on
    /// headless machines without one.
    pub draw_text: bool,
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            marker_size: config.marker_size,
            draw_text: config.draw_text,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

fn plot_err(e: impl std::fmt::Display) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

/// Draw `scene` as a 3-D scatter plot and save it to `output_path`.
///
/// The image format follows the extension of `output_path`. Missing parent
/// directories are created.
pub fn render_scene(scene: &Scene, output_path: &Path, options: &RenderOptions) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let [x_range, y_range, z_range] = scene.axis_ranges();
    debug!(
        "Rendering {} ({} points) with ranges x={:?} y={:?} z={:?}",
        scene.title,
        scene.point_count(),
        x_range,
        y_range,
        z_range
    );

    let root =
        BitMapBackend::new(output_path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if options.draw_text {
        builder.caption(&scene.title, ("sans-serif", TITLE_FONT_SIZE));
    }

    let mut chart = builder
        .build_cartesian_3d(x_range.clone(), y_range.clone(), z_range.clone())
        .map_err(plot_err)?;

    chart.with_projection(|mut pb| {
        pb.pitch = 0.4;
        pb.yaw = 0.6;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    if options.draw_text {
        chart
            .configure_axes()
            .light_grid_style(BLACK.mix(0.1))
            .max_light_lines(3)
            .draw()
            .map_err(plot_err)?;

        let label_style = ("sans-serif", LABEL_FONT_SIZE).into_font().color(&BLACK);
        chart
            .draw_series([
                Text::new(
                    "x".to_string(),
                    (x_range.end, y_range.start, z_range.start),
                    label_style.clone(),
                ),
                Text::new(
                    "y".to_string(),
                    (x_range.start, y_range.end, z_range.start),
                    label_style.clone(),
                ),
                Text::new(
                    "z".to_string(),
                    (x_range.start, y_range.start, z_range.end),
                    label_style,
                ),
            ])
            .map_err(plot_err)?;
    }

    let marker_size = options.marker_size;
    for layer in &scene.layers {
        let [r, g, b] = layer.color;
        let color = RGBColor(r, g, b);

        let anno = chart
            .draw_series(
                layer
                    .points
                    .iter()
                    .map(|&(x, y, z)| Circle::new((x, y, z), marker_size, color.filled())),
            )
            .map_err(plot_err)?;

        if options.draw_text {
            anno.label(layer.label()).legend(move |(x, y)| {
                Circle::new((x, y), LEGEND_MARKER_SIZE, color.filled())
            });
        }
    }

    if options.draw_text {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;

    Ok(())
}
