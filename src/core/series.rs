//! Demultiplexing of interleaved position logs into per-body samples.
//!
//! Row `j` of a log with `n` bodies belongs to body `j mod n`. A body's
//! series is therefore the arithmetic progression `i, i+n, i+2n, ...`
//! truncated at the row cap. The series can be reduced to a uniform random
//! sample drawn without replacement.

use std::fmt;
use std::str::FromStr;

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use super::loaders::PositionLog;

/// Errors that can occur while sampling body series.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SamplingError {
    #[error("body {body}: sample of {requested} points requested but only {available} available")]
    SampleTooLarge {
        body: usize,
        requested: usize,
        available: usize,
    },

    #[error("body count must be at least 1")]
    NoBodies,

    #[error("invalid sample size {0:?}: expected a non-negative integer or \"all\"")]
    InvalidSampleSize(String),
}

/// Result type for sampling operations.
pub type Result<T> = std::result::Result<T, SamplingError>;

/// How many points to keep from each body series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleSize {
    /// Keep the whole series in row order.
    #[default]
    All,
    /// Draw exactly this many distinct rows at random.
    Fixed(usize),
}

impl From<Option<usize>> for SampleSize {
    fn from(value: Option<usize>) -> Self {
        value.map_or(SampleSize::All, SampleSize::Fixed)
    }
}

impl FromStr for SampleSize {
    type Err = SamplingError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(SampleSize::All);
        }
        s.parse::<usize>()
            .map(SampleSize::Fixed)
            .map_err(|_| SamplingError::InvalidSampleSize(s.to_string()))
    }
}

impl fmt::Display for SampleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSize::All => write!(f, "all"),
            SampleSize::Fixed(n) => write!(f, "{n}"),
        }
    }
}

/// Points of one body after sampling, split by axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodySample {
    /// Body index in `[0, n)`.
    pub body: usize,
    /// Log rows the points were taken from, ascending.
    pub rows: Vec<usize>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl BodySample {
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the sampled points as `(x, y, z)` tuples.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| (x, y, z))
    }
}

/// Build the sampling RNG: seeded when a seed is given, otherwise from
/// system entropy.
pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64)
}

/// Row indices belonging to `body` in a log of `len` rows.
///
/// Returns `body, body + bodies, body + 2 * bodies, ...` below
/// `min(len, row_cap)`. Empty when `body` is past the end.
pub fn body_series_indices(
    len: usize,
    bodies: usize,
    body: usize,
    row_cap: Option<usize>,
) -> Vec<usize> {
    if bodies == 0 {
        return Vec::new();
    }
    let end = row_cap.map_or(len, |cap| cap.min(len));
    (body..end).step_by(bodies).collect()
}

/// Reduce a series to `sample` rows.
///
/// `SampleSize::All` returns the series unchanged. `SampleSize::Fixed(n)`
/// draws `n` distinct rows uniformly without replacement; the result is
/// sorted so that point order follows the log.
///
/// # Errors
///
/// Returns `SampleTooLarge` if the series has fewer than `n` rows.
pub fn sample_indices<R: Rng + ?Sized>(
    series: &[usize],
    body: usize,
    sample: SampleSize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    match sample {
        SampleSize::All => Ok(series.to_vec()),
        SampleSize::Fixed(n) => {
            if n > series.len() {
                return Err(SamplingError::SampleTooLarge {
                    body,
                    requested: n,
                    available: series.len(),
                });
            }
            let mut picked: Vec<usize> = index::sample(rng, series.len(), n)
                .into_iter()
                .map(|i| series[i])
                .collect();
            picked.sort_unstable();
            Ok(picked)
        }
    }
}

/// Split a log into one sample per body.
///
/// The returned vector always has `bodies` entries, in body order. Bodies
/// with no rows below the cap get an empty sample.
///
/// # Errors
///
/// Returns an error if `bodies` is zero or a fixed sample exceeds the
/// rows available to some body.
pub fn demultiplex<R: Rng + ?Sized>(
    log: &PositionLog,
    bodies: usize,
    row_cap: Option<usize>,
    sample: SampleSize,
    rng: &mut R,
) -> Result<Vec<BodySample>> {
    if bodies == 0 {
        return Err(SamplingError::NoBodies);
    }

    let rows = log.rows();
    let mut samples = Vec::with_capacity(bodies);

    for body in 0..bodies {
        let series = body_series_indices(rows.len(), bodies, body, row_cap);
        let picked = sample_indices(&series, body, sample, rng)?;

        let mut out = BodySample {
            body,
            rows: Vec::with_capacity(picked.len()),
            x: Vec::with_capacity(picked.len()),
            y: Vec::with_capacity(picked.len()),
            z: Vec::with_capacity(picked.len()),
        };
        for idx in picked {
            let [x, y, z] = rows[idx];
            out.rows.push(idx);
            out.x.push(x);
            out.y.push(y);
            out.z.push(z);
        }
        samples.push(out);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ramp_log(len: usize) -> PositionLog {
        PositionLog::from_rows(
            (0..len)
                .map(|i| [i as f64, 10.0 * i as f64, -(i as f64)])
                .collect(),
        )
    }

    #[test]
    fn test_series_partition_rows_by_residue() {
        for bodies in 1..6 {
            for len in [0usize, 1, 5, 12, 17] {
                for cap in [None, Some(0), Some(3), Some(10), Some(100)] {
                    let end = cap.map_or(len, |c| c.min(len));
                    let mut seen = HashSet::new();
                    for body in 0..bodies {
                        for idx in body_series_indices(len, bodies, body, cap) {
                            assert_eq!(idx % bodies, body);
                            assert!(seen.insert(idx), "row {idx} assigned twice");
                        }
                    }
                    let expected: HashSet<usize> = (0..end).collect();
                    assert_eq!(seen, expected);
                }
            }
        }
    }

    #[test]
    fn test_series_past_end_is_empty() {
        assert!(body_series_indices(2, 5, 3, None).is_empty());
        assert!(body_series_indices(10, 4, 2, Some(1)).is_empty());
        assert_eq!(body_series_indices(10, 4, 0, Some(1)), vec![0]);
    }

    #[test]
    fn test_sample_all_preserves_series() {
        let series = body_series_indices(20, 3, 1, None);
        let mut rng = make_rng(Some(1));
        let picked = sample_indices(&series, 1, SampleSize::All, &mut rng).unwrap();
        assert_eq!(picked, series);
    }

    #[test]
    fn test_fixed_sample_is_distinct_subset() {
        let series = body_series_indices(300, 3, 2, None);
        let allowed: HashSet<usize> = series.iter().copied().collect();
        let mut rng = make_rng(Some(42));

        let picked = sample_indices(&series, 2, SampleSize::Fixed(25), &mut rng).unwrap();
        assert_eq!(picked.len(), 25);

        let unique: HashSet<usize> = picked.iter().copied().collect();
        assert_eq!(unique.len(), 25);
        assert!(unique.is_subset(&allowed));
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_fixed_sample_whole_series() {
        let series = body_series_indices(9, 3, 0, None);
        let mut rng = make_rng(Some(3));
        let picked = sample_indices(&series, 0, SampleSize::Fixed(3), &mut rng).unwrap();
        assert_eq!(picked, vec![0, 3, 6]);
    }

    #[test]
    fn test_fixed_sample_is_reproducible_with_seed() {
        let series = body_series_indices(1000, 2, 1, None);
        let a = sample_indices(&series, 1, SampleSize::Fixed(50), &mut make_rng(Some(9))).unwrap();
        let b = sample_indices(&series, 1, SampleSize::Fixed(50), &mut make_rng(Some(9))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fixed_sample_too_large() {
        let series = body_series_indices(5, 2, 1, None);
        let mut rng = make_rng(Some(0));
        let err = sample_indices(&series, 1, SampleSize::Fixed(3), &mut rng).unwrap_err();
        assert_eq!(
            err,
            SamplingError::SampleTooLarge {
                body: 1,
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn test_sample_size_parsing() {
        assert_eq!("all".parse::<SampleSize>().unwrap(), SampleSize::All);
        assert_eq!("ALL".parse::<SampleSize>().unwrap(), SampleSize::All);
        assert_eq!("250".parse::<SampleSize>().unwrap(), SampleSize::Fixed(250));
        assert!("-1".parse::<SampleSize>().is_err());
        assert!("some".parse::<SampleSize>().is_err());
        assert_eq!(SampleSize::from(None), SampleSize::All);
        assert_eq!(SampleSize::from(Some(4)).to_string(), "4");
    }

    #[test]
    fn test_demultiplex_six_rows_two_bodies() {
        let log = ramp_log(6);
        let mut rng = make_rng(Some(0));
        let samples = demultiplex(&log, 2, None, SampleSize::All, &mut rng).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].rows, vec![0, 2, 4]);
        assert_eq!(samples[1].rows, vec![1, 3, 5]);
        assert_eq!(samples[0].x, vec![0.0, 2.0, 4.0]);
        assert_eq!(samples[1].y, vec![10.0, 30.0, 50.0]);
        assert_eq!(samples[1].z, vec![-1.0, -3.0, -5.0]);

        let points: Vec<_> = samples[0].points().collect();
        assert_eq!(points[1], (2.0, 20.0, -2.0));
    }

    #[test]
    fn test_demultiplex_short_log_yields_empty_bodies() {
        let log = ramp_log(2);
        let mut rng = make_rng(Some(0));
        let samples = demultiplex(&log, 4, None, SampleSize::All, &mut rng).unwrap();

        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].len(), 1);
        assert_eq!(samples[1].len(), 1);
        assert!(samples[2].is_empty());
        assert!(samples[3].is_empty());
        assert_eq!(samples[3].body, 3);
    }

    #[test]
    fn test_demultiplex_respects_row_cap() {
        let log = ramp_log(100);
        let mut rng = make_rng(Some(0));
        let samples = demultiplex(&log, 3, Some(7), SampleSize::All, &mut rng).unwrap();

        assert_eq!(samples[0].rows, vec![0, 3, 6]);
        assert_eq!(samples[1].rows, vec![1, 4]);
        assert_eq!(samples[2].rows, vec![2, 5]);
    }

    #[test]
    fn test_demultiplex_rejects_zero_bodies() {
        let log = ramp_log(4);
        let mut rng = make_rng(Some(0));
        let err = demultiplex(&log, 0, None, SampleSize::All, &mut rng).unwrap_err();
        assert_eq!(err, SamplingError::NoBodies);
    }

    #[test]
    fn test_demultiplex_sample_too_large_for_empty_body() {
        let log = ramp_log(3);
        let mut rng = make_rng(Some(0));
        let err = demultiplex(&log, 4, None, SampleSize::Fixed(1), &mut rng).unwrap_err();
        assert!(matches!(err, SamplingError::SampleTooLarge { body: 3, .. }));
    }
}
