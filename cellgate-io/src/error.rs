//! I/O error types.

use cellgate_core::ValidationError;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error.
    #[error("CSV error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Project file error.
    #[error("project file error: {0}")]
    Json(#[from] serde_json::Error),

    /// TIFF decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Decoded image data does not fit its dimensions.
    #[error("image shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A required column is absent from a CSV file.
    #[error("{column} column not found in {table}")]
    MissingColumn { table: &'static str, column: String },

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Core library error.
    #[error(transparent)]
    Core(#[from] cellgate_core::Error),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Core(err.into())
    }
}

impl Error {
    /// Converts into a core error for [`cellgate_core::GateStorage`] callers.
    ///
    /// Core errors pass through unchanged, so gate schema problems stay
    /// [`cellgate_core::Error::Validation`].
    #[must_use]
    pub fn into_core(self) -> cellgate_core::Error {
        match self {
            Error::Core(err) => err,
            other => cellgate_core::Error::storage(other),
        }
    }
}
