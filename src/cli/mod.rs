//! Command-line interface for the visualizer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::config::{LocatorConfig, RenderConfig};
use crate::core::series::{make_rng, SampleSize};
use crate::processors::sequence::{self, SortOrder};
use crate::visualization::Palette;
use crate::VisConfig;

#[derive(Parser)]
#[command(name = "nbody-vis")]
#[command(about = "Plot N-body position logs and locate numbered image sequences", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render position CSVs as 3-D scatter images
    Render {
        /// CSV files, or directories of CSV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Number of interleaved bodies
        #[arg(short = 'n', long)]
        bodies: Option<usize>,
        /// Only use rows below this index
        #[arg(short = 'm', long = "points")]
        row_cap: Option<usize>,
        /// Points drawn per body, or "all"
        #[arg(short = 'N', long)]
        sample: Option<SampleSize>,
        /// Clip each axis to mean +/- nsigma standard deviations
        #[arg(long)]
        cube: bool,
        /// Clip factor in standard deviations
        #[arg(long)]
        nsigma: Option<f64>,
        /// Directory for rendered images
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Open the images in the system viewer when done
        #[arg(short, long)]
        show: bool,
        /// Seed for point sampling
        #[arg(long)]
        seed: Option<u64>,
        /// Log progress after this many files
        #[arg(long)]
        progress_every: Option<usize>,
        /// Extension of CSV files picked up from directories
        #[arg(long)]
        ext: Option<String>,
        /// Skip caption, axis labels and legend (no fonts needed)
        #[arg(long)]
        no_text: bool,
    },

    /// Print the number of the last frame in an image sequence (-1 if none)
    FindSeq {
        /// Directory holding the sequence
        directory: Option<PathBuf>,
        /// File name prefix before the frame number
        #[arg(long)]
        prefix: Option<String>,
        /// File extension after the frame number
        #[arg(long)]
        ext: Option<String>,
        /// Position counted from the end (0 = last)
        #[arg(long)]
        rank: Option<usize>,
        /// Order frames by number instead of by file name
        #[arg(long)]
        numeric: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match VisConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                VisConfig::default()
            }
        },
        None => VisConfig::default(),
    };

    match cli.command {
        Commands::Render {
            inputs,
            bodies,
            row_cap,
            sample,
            cube,
            nsigma,
            output_dir,
            show,
            seed,
            progress_every,
            ext,
            no_text,
        } => {
            let overrides = RenderOverrides {
                bodies,
                row_cap,
                sample,
                cube,
                nsigma,
                output_dir,
                seed,
                progress_every,
                ext,
                no_text,
            };
            let render = apply_render_overrides(config.render, overrides);
            cmd_render(&inputs, &render, show);
        }
        Commands::FindSeq {
            directory,
            prefix,
            ext,
            rank,
            numeric,
        } => {
            let overrides = LocatorOverrides {
                directory,
                prefix,
                ext,
                rank,
                numeric,
            };
            let locator = apply_locator_overrides(config.locator, overrides);
            cmd_find_seq(&locator);
        }
    }
}

/// Render flags given on the command line. `None` and `false` keep the
/// config value.
#[derive(Debug, Default)]
struct RenderOverrides {
    bodies: Option<usize>,
    row_cap: Option<usize>,
    sample: Option<SampleSize>,
    cube: bool,
    nsigma: Option<f64>,
    output_dir: Option<PathBuf>,
    seed: Option<u64>,
    progress_every: Option<usize>,
    ext: Option<String>,
    no_text: bool,
}

/// Merge command-line flags over the loaded config.
///
/// `-N all` clears a configured sample size. `--cube` and `--no-text` can
/// only switch clipping on and text off.
fn apply_render_overrides(mut render: RenderConfig, overrides: RenderOverrides) -> RenderConfig {
    if let Some(bodies) = overrides.bodies {
        render.bodies = bodies;
    }
    if overrides.row_cap.is_some() {
        render.row_cap = overrides.row_cap;
    }
    match overrides.sample {
        Some(SampleSize::All) => render.sample_size = None,
        Some(SampleSize::Fixed(n)) => render.sample_size = Some(n),
        None => {}
    }
    render.clip |= overrides.cube;
    render.nsigma = overrides.nsigma.unwrap_or(render.nsigma);
    render.output_dir = overrides.output_dir.unwrap_or(render.output_dir);
    render.seed = overrides.seed.or(render.seed);
    render.progress_every = overrides.progress_every.unwrap_or(render.progress_every);
    render.input_extension = overrides.ext.unwrap_or(render.input_extension);
    if overrides.no_text {
        render.draw_text = false;
    }
    render
}

#[derive(Debug, Default)]
struct LocatorOverrides {
    directory: Option<PathBuf>,
    prefix: Option<String>,
    ext: Option<String>,
    rank: Option<usize>,
    numeric: bool,
}

fn apply_locator_overrides(locator: LocatorConfig, overrides: LocatorOverrides) -> LocatorConfig {
    LocatorConfig {
        directory: overrides.directory.unwrap_or(locator.directory),
        prefix: overrides.prefix.unwrap_or(locator.prefix),
        extension: overrides.ext.unwrap_or(locator.extension),
        rank: overrides.rank.unwrap_or(locator.rank),
        numeric: overrides.numeric || locator.numeric,
    }
}

fn cmd_render(inputs: &[PathBuf], config: &RenderConfig, show: bool) {
    use crate::processors::batch;

    let start = Instant::now();

    let (palette, files) = match prepare_render(inputs, config) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    println!("Rendering {} file(s)...", files.len());
    println!("Output directory: {}", config.output_dir.display());
    println!("Bodies: {}", config.bodies);
    println!("Sample: {}", SampleSize::from(config.sample_size));

    let spinner = create_spinner("Rendering scatter plots...");
    let mut rng = make_rng(config.seed);

    match batch::render_batch(&files, config, &palette, &mut rng) {
        Ok(summary) => {
            spinner.finish_and_clear();

            let clip = if config.clip {
                format!("{} sigma", config.nsigma)
            } else {
                "off".to_string()
            };
            print_summary(
                "Render Complete",
                &[
                    ("Files rendered", summary.outputs.len().to_string()),
                    ("Points plotted", summary.points.to_string()),
                    ("Bodies", config.bodies.to_string()),
                    ("Clipping", clip),
                    ("Output directory", config.output_dir.display().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );

            if show {
                for output in &summary.outputs {
                    if let Err(e) = open_in_viewer(output) {
                        warn!("Could not open {}: {}", output.display(), e);
                    }
                }
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Render failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Validate the palette and expand the input arguments.
fn prepare_render(inputs: &[PathBuf], config: &RenderConfig) -> Result<(Palette, Vec<PathBuf>)> {
    use crate::processors::batch;

    let palette = Palette::new(config.palette.clone()).context("Invalid palette in config")?;
    let files = batch::collect_inputs(inputs, &config.input_extension)
        .context("Failed to collect input files")?;
    if files.is_empty() {
        warn!("No .{} files to render", config.input_extension);
    }
    Ok((palette, files))
}

fn cmd_find_seq(config: &LocatorConfig) {
    let order = if config.numeric {
        SortOrder::Numeric
    } else {
        SortOrder::Lexicographic
    };

    info!(
        "Looking for {}<digits>.{} in {} (rank {}, {:?})",
        config.prefix,
        config.extension,
        config.directory.display(),
        config.rank,
        order
    );

    let number = sequence::find_seq(
        &config.directory,
        &config.prefix,
        &config.extension,
        config.rank,
        order,
    );
    println!("{}", number);
}

/// Open `path` with the platform's default image viewer.
fn open_in_viewer(path: &Path) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    command.arg(path).spawn()?;
    Ok(())
}
