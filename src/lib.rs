//! 3-D scatter visualizer for N-body simulation output.
//!
//! This crate provides tools for:
//! - Loading interleaved position logs (headerless x,y,z CSV, bodies round-robin)
//! - Splitting a log into per-body series, with optional random subsampling
//! - Clipping axes to a number of standard deviations around the mean
//! - Rendering one colored point cloud per body into a PNG with a legend
//! - Finding the last frame of a numbered image sequence
//!
//! # Example
//!
//! ```no_run
//! use nbody_vis::{core::make_rng, processors::render_file, visualization::Palette, RenderConfig};
//!
//! let config = RenderConfig::default();
//! let mut rng = make_rng(Some(42));
//! let (image, points) =
//!     render_file("kepler.csv".as_ref(), &config, &Palette::default(), &mut rng).unwrap();
//! println!("{} points -> {}", points, image.display());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{LocatorConfig, RenderConfig, VisConfig};
pub use crate::core::loaders::PositionLog;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
