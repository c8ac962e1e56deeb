//! Core data types: position logs, per-body sampling and axis statistics.

pub mod loaders;
pub mod series;
pub mod stats;

pub use loaders::{load_position_csv, LoaderError, PositionLog};
pub use series::{demultiplex, make_rng, BodySample, SampleSize, SamplingError};
pub use stats::{axis_bounds, AxisBounds};
