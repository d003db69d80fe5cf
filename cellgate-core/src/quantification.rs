//! Per-cell quantification table.
//!
//! Cells are stored in Structure of Arrays (`SoA`) form: one vector per
//! field, all of the same length, indexed by cell row.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::markers::MarkerIndex;

/// Column holding the sample id of each cell.
pub const SAMPLE_ID_COLUMN: &str = "sample_id";
/// Column holding the cell centroid x coordinate (image column).
pub const X_CENTROID_COLUMN: &str = "X_centroid";
/// Column holding the cell centroid y coordinate (image row).
pub const Y_CENTROID_COLUMN: &str = "Y_centroid";

/// A named numeric column with one value per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Quantification table: one row per segmented cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quantification {
    /// Sample id per cell.
    sample_id: Vec<String>,
    /// Centroid x per cell.
    x_centroid: Vec<f64>,
    /// Centroid y per cell.
    y_centroid: Vec<f64>,
    /// Marker intensities and other numeric measurements, in file order.
    columns: Vec<MeasurementColumn>,
}

impl Quantification {
    /// Creates a table from the required columns.
    ///
    /// # Errors
    /// Returns [`Error::ColumnLength`] if the centroid columns do not have
    /// one value per sample id.
    pub fn new(sample_id: Vec<String>, x_centroid: Vec<f64>, y_centroid: Vec<f64>) -> Result<Self> {
        let expected = sample_id.len();
        for (name, len) in [
            (X_CENTROID_COLUMN, x_centroid.len()),
            (Y_CENTROID_COLUMN, y_centroid.len()),
        ] {
            if len != expected {
                return Err(Error::ColumnLength {
                    column: name.to_string(),
                    expected,
                    found: len,
                });
            }
        }
        Ok(Self {
            sample_id,
            x_centroid,
            y_centroid,
            columns: Vec::new(),
        })
    }

    /// Adds a measurement column, replacing one of the same name.
    ///
    /// # Errors
    /// Returns [`Error::ColumnLength`] if `values` has the wrong length.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(Error::ColumnLength {
                column: name,
                expected: self.len(),
                found: values.len(),
            });
        }
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == name) {
            existing.values = values;
        } else {
            self.columns.push(MeasurementColumn { name, values });
        }
        Ok(())
    }

    /// Builder form of [`Self::insert_column`].
    ///
    /// # Errors
    /// Returns [`Error::ColumnLength`] if `values` has the wrong length.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sample_id.len()
    }

    /// Returns true if there are no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sample_id.is_empty()
    }

    /// Sample id of every cell.
    #[must_use]
    pub fn sample_column(&self) -> &[String] {
        &self.sample_id
    }

    /// Centroid x of every cell.
    #[must_use]
    pub fn x_centroid(&self) -> &[f64] {
        &self.x_centroid
    }

    /// Centroid y of every cell.
    #[must_use]
    pub fn y_centroid(&self) -> &[f64] {
        &self.y_centroid
    }

    /// Distinct sample ids in first-appearance order.
    #[must_use]
    pub fn sample_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sample_id
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    /// Returns true if at least one cell belongs to the sample.
    #[must_use]
    pub fn has_sample(&self, sample: &str) -> bool {
        self.sample_id.iter().any(|s| s == sample)
    }

    /// Values of a measurement column, or a centroid column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            X_CENTROID_COLUMN => Some(&self.x_centroid),
            Y_CENTROID_COLUMN => Some(&self.y_centroid),
            _ => self
                .columns
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.values.as_slice()),
        }
    }

    /// Names of the measurement columns in file order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Measurement columns that are not markers of the index.
    ///
    /// These are the morphology columns (area, eccentricity, ...) offered as
    /// the scatter plot's y axis next to the markers.
    #[must_use]
    pub fn non_marker_columns(&self, markers: &MarkerIndex) -> Vec<&str> {
        self.column_names()
            .filter(|name| !markers.contains(name))
            .collect()
    }

    /// Row indices of the cells in a sample.
    pub fn rows_for<'a>(&'a self, sample: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.sample_id
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.as_str() == sample)
            .map(|(i, _)| i)
    }

    /// Number of cells in a sample.
    #[must_use]
    pub fn cell_count(&self, sample: &str) -> usize {
        self.rows_for(sample).count()
    }

    /// Checks that every indexed marker has an intensity column.
    ///
    /// # Errors
    /// Returns [`Error::MissingMarkerColumn`] for the first marker without one.
    pub fn check_markers(&self, markers: &MarkerIndex) -> Result<()> {
        for marker in markers.names() {
            if self.column(marker).is_none() {
                return Err(Error::MissingMarkerColumn(marker.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Quantification {
        Quantification::new(
            vec!["S2".into(), "S1".into(), "S2".into()],
            vec![10.0, 20.0, 30.0],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap()
        .with_column("CD3", vec![100.0, 200.0, 300.0])
        .unwrap()
        .with_column("Area", vec![50.0, 60.0, 70.0])
        .unwrap()
    }

    #[test]
    fn test_sample_ids_first_appearance() {
        let q = sample_table();
        assert_eq!(q.sample_ids(), vec!["S2".to_string(), "S1".to_string()]);
        assert_eq!(q.cell_count("S2"), 2);
        assert!(q.has_sample("S1"));
        assert!(!q.has_sample("S3"));
    }

    #[test]
    fn test_column_lookup() {
        let q = sample_table();
        assert_eq!(q.column("CD3"), Some(&[100.0, 200.0, 300.0][..]));
        assert_eq!(q.column(X_CENTROID_COLUMN), Some(&[10.0, 20.0, 30.0][..]));
        assert!(q.column("CD8").is_none());
    }

    #[test]
    fn test_insert_column_length_checked() {
        let mut q = sample_table();
        let err = q.insert_column("CD8", vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::ColumnLength { expected: 3, found: 1, .. }));
    }

    #[test]
    fn test_check_markers() {
        let q = sample_table();
        let ok = MarkerIndex::from_names(&["CD3"]).unwrap();
        assert!(q.check_markers(&ok).is_ok());

        let missing = MarkerIndex::from_names(&["CD3", "CD8"]).unwrap();
        assert!(matches!(
            q.check_markers(&missing),
            Err(Error::MissingMarkerColumn(ref m)) if m == "CD8"
        ));
        assert_eq!(q.non_marker_columns(&ok), vec!["Area"]);
    }
}
