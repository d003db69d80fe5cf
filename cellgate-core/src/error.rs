//! Error types for cellgate-core.

use std::fmt;

use thiserror::Error;

/// Result type alias for cellgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The three columns of the gate table, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateColumn {
    SampleId,
    MarkerId,
    GateValue,
}

impl GateColumn {
    /// All columns in serialization order.
    pub const ALL: [GateColumn; 3] = [
        GateColumn::SampleId,
        GateColumn::MarkerId,
        GateColumn::GateValue,
    ];

    /// Column header as it appears in the CSV file.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            GateColumn::SampleId => "sample_id",
            GateColumn::MarkerId => "marker_id",
            GateColumn::GateValue => "gate_value",
        }
    }
}

impl fmt::Display for GateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reasons a gate table is rejected when it is loaded.
///
/// Validation always completes before the session's table is replaced, so a
/// rejected load leaves the previous table untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required column is absent from the file header.
    #[error("{0} column not found in gates table")]
    MissingColumn(GateColumn),

    /// A cell in a required column is empty.
    #[error("empty {column} at row {row}")]
    NullValue { column: GateColumn, row: usize },

    /// The `gate_value` column could not be read as numbers.
    #[error("gate_value column is not numeric (found {dtype})")]
    NonNumericGate { dtype: String },

    /// A gate value is NaN or infinite.
    #[error("gate_value at row {row} is not finite")]
    NonFiniteGate { row: usize },

    /// The same (sample, marker) pair appears more than once.
    #[error("duplicate gate for sample {sample_id:?} and marker {marker_id:?}")]
    DuplicateKey {
        sample_id: String,
        marker_id: String,
    },

    /// The distinct sample ids differ from the quantification samples.
    #[error(
        "samples do not match the quantification table (missing: [{}], unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    SampleMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// The distinct marker ids differ from the marker index.
    #[error(
        "markers do not match the marker index, pick the same quantification files (missing: [{}], unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    MarkerMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

/// Why a gate commit was declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The value is the 0.0 "unset" sentinel.
    Unset,
    /// The stored gate already has this value.
    NoChange,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::Unset => f.write_str("unset value"),
            NoOpReason::NoChange => f.write_str("no change"),
        }
    }
}

/// Core error types for cellgate operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Gate table failed schema or key-space validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No gate exists for the (sample, marker) pair.
    #[error("no gate for sample {sample_id:?} and marker {marker_id:?}")]
    NotFound {
        sample_id: String,
        marker_id: String,
    },

    /// A redundant or sentinel gate write was declined.
    #[error("gate not saved: {0}")]
    NoOp(NoOpReason),

    /// Gate values must be finite.
    #[error("invalid gate value: {0}")]
    InvalidGateValue(f64),

    /// An operation needs both an active sample and an active marker.
    #[error("no sample or marker selected")]
    NoSelection,

    /// Sample id not present in the quantification table.
    #[error("unknown sample: {0}")]
    UnknownSample(String),

    /// Marker id not present in the marker index.
    #[error("unknown marker: {0}")]
    UnknownMarker(String),

    /// Measurement column not present in the quantification table.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A marker of the index has no intensity column.
    #[error("marker {0:?} has no column in the quantification table")]
    MissingMarkerColumn(String),

    /// The same marker name is mapped twice.
    #[error("marker {0:?} listed more than once")]
    DuplicateMarker(String),

    /// A column does not have one value per cell.
    #[error("column {column:?} has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Saving was requested before any gates file was chosen.
    #[error("no file selected to save gates")]
    NoSaveTarget,

    /// Failure reported by a [`crate::GateStorage`] backend.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a backend error.
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Storage(err.into())
    }

    /// True for declined writes, which are shown as passive notices rather
    /// than failures.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, Error::NoOp(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_is_informational() {
        assert!(Error::NoOp(NoOpReason::Unset).is_informational());
        assert!(!Error::NoSelection.is_informational());
        assert!(!Error::Validation(ValidationError::MissingColumn(GateColumn::SampleId))
            .is_informational());
    }

    #[test]
    fn test_mismatch_message_lists_ids() {
        let err = ValidationError::SampleMismatch {
            missing: vec!["S2".into()],
            unexpected: vec!["S3".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing: [S2]"));
        assert!(msg.contains("unexpected: [S3]"));
    }

    #[test]
    fn test_noop_reason_display() {
        assert_eq!(
            Error::NoOp(NoOpReason::NoChange).to_string(),
            "gate not saved: no change"
        );
        assert_eq!(NoOpReason::Unset.to_string(), "unset value");
    }
}
