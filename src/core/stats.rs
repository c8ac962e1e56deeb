//! Statistical axis bounds for clipping outlying points.

/// Visible window `[lo, hi]` of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub lo: f64,
    pub hi: f64,
}

impl AxisBounds {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// True when the window has (numerically) zero width relative to the
    /// magnitude of its ends.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        is_degenerate_range(self.lo, self.hi)
    }
}

/// Relative width below which a window counts as a single value.
pub const DEGENERATE_TOLERANCE: f64 = 1e-9;

/// True when `hi - lo` is negligible next to `max(1, |lo|, |hi|)`.
pub fn is_degenerate_range(lo: f64, hi: f64) -> bool {
    let scale = lo.abs().max(hi.abs()).max(1.0);
    (hi - lo).abs() <= scale * DEGENERATE_TOLERANCE
}

/// Mean and population standard deviation of `values`.
///
/// Returns `None` for an empty slice. Deviations are taken from the first
/// sample, so a constant series gives exactly `(v, 0.0)`.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let &shift = values.first()?;
    let n = values.len() as f64;
    let offset = values.iter().map(|v| v - shift).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|v| {
            let d = v - shift - offset;
            d * d
        })
        .sum::<f64>()
        / n;
    Some((shift + offset, var.sqrt()))
}

/// Window of `nsigma` standard deviations either side of the mean.
///
/// Returns `None` for an empty slice. A constant series collapses to
/// `(v, v)` whatever `nsigma` is.
pub fn axis_bounds(values: &[f64], nsigma: f64) -> Option<AxisBounds> {
    let (mean, std) = mean_std(values)?;
    let half = nsigma * std;
    Some(AxisBounds::new(mean - half, mean + half))
}

/// Smallest and largest finite value in `values`.
pub fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
