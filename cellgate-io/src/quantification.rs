//! Quantification and marker CSV readers.

use std::fs;
use std::path::Path;

use cellgate_core::{
    CellPoint, MarkerChannel, MarkerIndex, Quantification, SAMPLE_ID_COLUMN, X_CENTROID_COLUMN,
    Y_CENTROID_COLUMN,
};
use polars::prelude::*;

use crate::frame;
use crate::{Error, Result};

const QUANTIFICATION_TABLE: &str = "quantification table";
const MARKERS_TABLE: &str = "markers table";

/// Marker name column of the markers CSV.
pub const MARKER_NAME_COLUMN: &str = "marker_name";
/// Optional 1-based channel column of the markers CSV.
pub const CHANNEL_NUMBER_COLUMN: &str = "channel_number";

fn require(df: &DataFrame, table: &'static str, column: &str) -> Result<()> {
    if frame::has_column(df, column) {
        Ok(())
    } else {
        Err(Error::MissingColumn {
            table,
            column: column.to_string(),
        })
    }
}

/// Parses a quantification CSV.
///
/// `sample_id` is read as text whatever its inferred type. Every other
/// integer or float column is kept as a measurement column; empty cells
/// become NaN. Text columns other than `sample_id` are skipped.
///
/// # Errors
/// Returns [`Error::MissingColumn`] if `sample_id`, `X_centroid` or
/// `Y_centroid` is absent, and [`Error::InvalidFormat`] for an empty sample id.
pub fn parse_quantification(bytes: &[u8]) -> Result<Quantification> {
    let df = frame::read_csv(bytes, &[SAMPLE_ID_COLUMN])?;
    for column in [SAMPLE_ID_COLUMN, X_CENTROID_COLUMN, Y_CENTROID_COLUMN] {
        require(&df, QUANTIFICATION_TABLE, column)?;
    }

    let sample_id = frame::string_values(&df, SAMPLE_ID_COLUMN)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| Error::InvalidFormat(format!("empty sample_id at row {row}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let floats = |name: &str| -> Result<Vec<f64>> {
        Ok(frame::float_values(&df, name)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    };

    let mut quant = Quantification::new(
        sample_id,
        floats(X_CENTROID_COLUMN)?,
        floats(Y_CENTROID_COLUMN)?,
    )?;

    for name in df.get_column_names() {
        let name = name.as_str();
        if [SAMPLE_ID_COLUMN, X_CENTROID_COLUMN, Y_CENTROID_COLUMN].contains(&name) {
            continue;
        }
        if frame::is_numeric(&df, name)? {
            quant.insert_column(name, floats(name)?)?;
        } else {
            log::debug!("skipping non-numeric quantification column {name}");
        }
    }

    log::debug!(
        "parsed quantification: {} cells, {} samples, {} measurement columns",
        quant.len(),
        quant.sample_ids().len(),
        quant.column_names().count()
    );
    Ok(quant)
}

/// Reads a quantification CSV file.
///
/// # Errors
/// See [`parse_quantification`]; also [`Error::Io`].
pub fn read_quantification(path: &Path) -> Result<Quantification> {
    parse_quantification(&fs::read(path)?)
}

/// Parses a markers CSV.
///
/// Channels follow row order unless a `channel_number` column is present,
/// in which case channel = `channel_number - 1`.
///
/// # Errors
/// Returns [`Error::MissingColumn`] without `marker_name`,
/// [`Error::InvalidFormat`] for an empty name or a channel number below 1,
/// and a core error for a repeated marker.
pub fn parse_markers(bytes: &[u8]) -> Result<MarkerIndex> {
    let df = frame::read_csv(bytes, &[MARKER_NAME_COLUMN])?;
    require(&df, MARKERS_TABLE, MARKER_NAME_COLUMN)?;

    let names = frame::string_values(&df, MARKER_NAME_COLUMN)?;
    let channels = if frame::has_column(&df, CHANNEL_NUMBER_COLUMN) {
        Some(frame::float_values(&df, CHANNEL_NUMBER_COLUMN)?)
    } else {
        None
    };

    let mut entries = Vec::with_capacity(names.len());
    for (row, name) in names.into_iter().enumerate() {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidFormat(format!("empty marker_name at row {row}")))?;
        let channel = match &channels {
            Some(numbers) => channel_from_number(numbers[row], row)?,
            None => row,
        };
        entries.push(MarkerChannel { name, channel });
    }

    let index = MarkerIndex::from_channels(entries)?;
    log::debug!("parsed {} markers", index.len());
    Ok(index)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_from_number(number: Option<f64>, row: usize) -> Result<usize> {
    match number {
        Some(n) if n >= 1.0 && n.fract() == 0.0 => Ok(n as usize - 1),
        _ => Err(Error::InvalidFormat(format!(
            "channel_number at row {row} must be a positive integer"
        ))),
    }
}

/// Reads a markers CSV file.
///
/// # Errors
/// See [`parse_markers`]; also [`Error::Io`].
pub fn read_markers(path: &Path) -> Result<MarkerIndex> {
    parse_markers(&fs::read(path)?)
}

/// Writes cell centroids as a `Y_centroid,X_centroid` CSV.
///
/// # Errors
/// Returns [`Error::Polars`] if the frame cannot be written.
pub fn cells_to_csv(cells: &[CellPoint]) -> Result<Vec<u8>> {
    let ys: Vec<f64> = cells.iter().map(|c| c.y).collect();
    let xs: Vec<f64> = cells.iter().map(|c| c.x).collect();
    let mut df = df!(Y_CENTROID_COLUMN => ys, X_CENTROID_COLUMN => xs)?;
    frame::write_csv(&mut df)
}
