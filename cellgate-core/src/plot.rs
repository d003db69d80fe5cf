//! Per-sample views of the quantification table for plotting.

use crate::error::{Error, Result};
use crate::histogram::{finite_range, IntensityHistogram};
use crate::quantification::Quantification;

/// Centroid of a cell, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPoint {
    /// Image row (`Y_centroid`).
    pub y: f64,
    /// Image column (`X_centroid`).
    pub x: f64,
}

/// Positive and total cell counts for one gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSummary {
    pub gate: f64,
    pub positive: usize,
    pub total: usize,
}

impl GateSummary {
    /// Fraction of cells above the gate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.positive as f64 / self.total as f64
        }
    }
}

fn sample_column<'a>(q: &'a Quantification, sample: &str, column: &str) -> Result<&'a [f64]> {
    if !q.has_sample(sample) {
        return Err(Error::UnknownSample(sample.to_string()));
    }
    q.column(column)
        .ok_or_else(|| Error::UnknownColumn(column.to_string()))
}

/// Values of `column` for the cells of `sample`.
///
/// # Errors
/// Returns [`Error::UnknownSample`] or [`Error::UnknownColumn`].
pub fn sample_values(q: &Quantification, sample: &str, column: &str) -> Result<Vec<f64>> {
    let values = sample_column(q, sample, column)?;
    Ok(q.rows_for(sample).map(|i| values[i]).collect())
}

/// Scatter points `[marker intensity, y column]` for one sample.
///
/// # Errors
/// Returns [`Error::UnknownSample`] or [`Error::UnknownColumn`].
pub fn scatter_points(
    q: &Quantification,
    sample: &str,
    marker: &str,
    y_column: &str,
) -> Result<Vec<[f64; 2]>> {
    let xs = sample_column(q, sample, marker)?;
    let ys = sample_column(q, sample, y_column)?;
    Ok(q.rows_for(sample).map(|i| [xs[i], ys[i]]).collect())
}

/// Intensity range of a marker within a sample, used as gate slider bounds.
///
/// # Errors
/// Returns [`Error::UnknownSample`] or [`Error::UnknownColumn`].
pub fn intensity_range(q: &Quantification, sample: &str, marker: &str) -> Result<Option<(f64, f64)>> {
    Ok(finite_range(&sample_values(q, sample, marker)?))
}

/// Histogram of a marker's intensities within a sample.
///
/// # Errors
/// Returns [`Error::UnknownSample`] or [`Error::UnknownColumn`].
pub fn intensity_histogram(
    q: &Quantification,
    sample: &str,
    marker: &str,
    n_bins: usize,
) -> Result<IntensityHistogram> {
    Ok(IntensityHistogram::from_values(
        &sample_values(q, sample, marker)?,
        n_bins,
    ))
}

/// Centroids of the cells of `sample` whose marker intensity is strictly
/// above `threshold`.
///
/// # Errors
/// Returns [`Error::UnknownSample`] or [`Error::UnknownColumn`].
pub fn positive_cells(
    q: &Quantification,
    sample: &str,
    marker: &str,
    threshold: f64,
) -> Result<Vec<CellPoint>> {
    let values = sample_column(q, sample, marker)?;
    let (xs, ys) = (q.x_centroid(), q.y_centroid());
    Ok(q.rows_for(sample)
        .filter(|&i| values[i] > threshold)
        .map(|i| CellPoint { y: ys[i], x: xs[i] })
        .collect())
}

/// Counts the cells of `sample` above `gate`.
///
/// # Errors
/// Returns [`Error::UnknownSample`] or [`Error::UnknownColumn`].
pub fn gate_summary(q: &Quantification, sample: &str, marker: &str, gate: f64) -> Result<GateSummary> {
    let values = sample_column(q, sample, marker)?;
    let mut summary = GateSummary {
        gate,
        positive: 0,
        total: 0,
    };
    for i in q.rows_for(sample) {
        summary.total += 1;
        if values[i] > gate {
            summary.positive += 1;
        }
    }
    Ok(summary)
}

/// Display name of a positive-cell point layer.
#[must_use]
pub fn points_layer_name(gate: f64, sample: &str, marker: &str) -> String {
    format!("Gate: {} | {sample}:{marker}", gate.round())
}
