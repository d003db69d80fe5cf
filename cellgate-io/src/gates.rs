//! Gate table CSV codec (`sample_id,marker_id,gate_value`).

use std::fs;
use std::path::Path;

use cellgate_core::{GateColumn, GateRecord, GateStorage, GateTable, ValidationError};
use polars::prelude::*;

use crate::frame;
use crate::Result;

/// Parses a gate CSV and checks its schema, without checking the key space.
///
/// Extra columns are ignored. Sample and marker ids are read as text exactly
/// as written, so `01` stays `01`. An empty file counts as missing
/// `sample_id`.
///
/// # Errors
/// Returns a [`ValidationError`] (wrapped in [`crate::Error::Core`]) for a
/// missing column, an empty cell, a non-numeric or non-finite gate value or
/// a duplicate pair, and [`crate::Error::Polars`] if the bytes are not CSV.
pub fn parse_gates(bytes: &[u8]) -> Result<GateTable> {
    let text = [GateColumn::SampleId.name(), GateColumn::MarkerId.name()];
    let df = match frame::read_csv(bytes, &text) {
        Err(crate::Error::Polars(PolarsError::NoData(_))) => {
            return Err(ValidationError::MissingColumn(GateColumn::SampleId).into());
        }
        other => other?,
    };
    for column in GateColumn::ALL {
        if !frame::has_column(&df, column.name()) {
            return Err(ValidationError::MissingColumn(column).into());
        }
    }

    let samples = required_strings(&df, GateColumn::SampleId)?;
    let markers = required_strings(&df, GateColumn::MarkerId)?;
    let values = gate_values(&df)?;

    let records = samples
        .into_iter()
        .zip(markers)
        .zip(values)
        .map(|((sample, marker), value)| GateRecord::new(sample, marker, value))
        .collect();
    let table = GateTable::from_records(records)?;
    log::debug!("parsed {} gate records", table.len());
    Ok(table)
}

fn required_strings(df: &DataFrame, column: GateColumn) -> Result<Vec<String>> {
    frame::string_values(df, column.name())?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| ValidationError::NullValue { column, row }.into()))
        .collect()
}

fn gate_values(df: &DataFrame) -> Result<Vec<f64>> {
    let name = GateColumn::GateValue.name();
    let raw = frame::string_values(df, name)?;
    if let Some(row) = raw.iter().position(Option::is_none) {
        return Err(ValidationError::NullValue {
            column: GateColumn::GateValue,
            row,
        }
        .into());
    }
    if df.height() > 0 && !frame::is_numeric(df, name)? {
        let dtype = df.column(name)?.dtype().to_string();
        return Err(ValidationError::NonNumericGate { dtype }.into());
    }
    let values: Vec<f64> = frame::float_values(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    if let Some(row) = values.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::NonFiniteGate { row }.into());
    }
    Ok(values)
}

/// Loads a gate table and checks it covers exactly the given samples and
/// markers.
///
/// # Errors
/// Returns every error of [`parse_gates`], plus
/// [`ValidationError::SampleMismatch`] or [`ValidationError::MarkerMismatch`].
pub fn read_gates<S, M>(bytes: &[u8], sample_ids: &[S], marker_ids: &[M]) -> Result<GateTable>
where
    S: AsRef<str>,
    M: AsRef<str>,
{
    let table = parse_gates(bytes)?;
    table.validate_key_space(sample_ids, marker_ids)?;
    Ok(table)
}

/// Serializes a gate table: exactly the three gate columns, header first,
/// one row per record in table order.
///
/// # Errors
/// Returns [`crate::Error::Polars`] if the frame cannot be written.
pub fn gates_to_csv(table: &GateTable) -> Result<Vec<u8>> {
    let samples: Vec<&str> = table.iter().map(|r| r.sample_id.as_str()).collect();
    let markers: Vec<&str> = table.iter().map(|r| r.marker_id.as_str()).collect();
    let values: Vec<f64> = table.iter().map(|r| r.gate_value).collect();
    let mut df = df!(
        GateColumn::SampleId.name() => samples,
        GateColumn::MarkerId.name() => markers,
        GateColumn::GateValue.name() => values,
    )?;
    frame::write_csv(&mut df)
}

/// Reads and schema-checks a gate CSV file.
///
/// # Errors
/// See [`parse_gates`]; also [`crate::Error::Io`].
pub fn read_gates_file(path: &Path) -> Result<GateTable> {
    let bytes = fs::read(path)?;
    parse_gates(&bytes)
}

/// Writes a gate table to a CSV file, replacing it.
///
/// # Errors
/// Returns [`crate::Error::Io`] or [`crate::Error::Polars`].
pub fn write_gates_file(path: &Path, table: &GateTable) -> Result<()> {
    fs::write(path, gates_to_csv(table)?)?;
    log::debug!("wrote {} gate records to {}", table.len(), path.display());
    Ok(())
}

/// [`GateStorage`] backed by CSV files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvGateStorage;

impl GateStorage for CsvGateStorage {
    fn read(&mut self, path: &Path) -> cellgate_core::Result<GateTable> {
        read_gates_file(path).map_err(crate::Error::into_core)
    }

    fn write(&mut self, path: &Path, table: &GateTable) -> cellgate_core::Result<()> {
        write_gates_file(path, table).map_err(crate::Error::into_core)
    }
}
