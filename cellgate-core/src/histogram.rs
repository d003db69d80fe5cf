//! Binned marker intensity distribution.

/// Histogram of intensity values over equal-width bins.
///
/// The last bin is closed on the right so the maximum value is counted.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityHistogram {
    counts: Vec<u64>,
    min: f64,
    max: f64,
    bin_width: f64,
}

impl IntensityHistogram {
    /// Bins the finite values over their own range.
    #[must_use]
    pub fn from_values(values: &[f64], n_bins: usize) -> Self {
        let (min, max) = finite_range(values).unwrap_or((0.0, 1.0));
        Self::with_range(values, n_bins, min, max)
    }

    /// Bins the finite values over `[min, max]`; values outside are dropped.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn with_range(values: &[f64], n_bins: usize, min: f64, max: f64) -> Self {
        let n_bins = n_bins.max(1);
        let span = max - min;
        let bin_width = if span > 0.0 { span / n_bins as f64 } else { 1.0 };
        let mut hist = Self {
            counts: vec![0; n_bins],
            min,
            max,
            bin_width,
        };
        for &v in values {
            if let Some(bin) = hist.bin_of(v) {
                hist.counts[bin] += 1;
            }
        }
        hist
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn bin_of(&self, value: f64) -> Option<usize> {
        if !value.is_finite() || value < self.min || value > self.max {
            return None;
        }
        let bin = ((value - self.min) / self.bin_width) as usize;
        Some(bin.min(self.counts.len() - 1))
    }

    /// Count per bin.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// log10(count + 1) per bin, for a log-scaled view.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn log_counts(&self) -> Vec<f64> {
        self.counts
            .iter()
            .map(|&c| (c as f64 + 1.0).log10())
            .collect()
    }

    /// Center of each bin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bin_centers(&self) -> Vec<f64> {
        (0..self.counts.len())
            .map(|i| self.min + (i as f64 + 0.5) * self.bin_width)
            .collect()
    }

    /// Number of binned values.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Fraction of binned values in bins starting at or above `threshold`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction_above(&self, threshold: f64) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let above: u64 = self
            .counts
            .iter()
            .enumerate()
            .filter(|(i, _)| self.min + *i as f64 * self.bin_width >= threshold)
            .map(|(_, &c)| c)
            .sum();
        above as f64 / total as f64
    }

    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Width of each bin.
    #[must_use]
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Lower edge of the first bin.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper edge of the last bin.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Minimum and maximum of the finite values.
#[must_use]
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
