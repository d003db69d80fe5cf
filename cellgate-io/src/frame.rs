//! Shared `polars` helpers for the CSV codecs.

use std::io::Cursor;
use std::sync::Arc;

use polars::prelude::*;

use crate::Result;

/// Parses CSV bytes with a header row, inferring types from every row.
///
/// Columns named in `text_columns` are read as strings, so ids such as `01`
/// keep their leading zeros.
pub(crate) fn read_csv(bytes: &[u8], text_columns: &[&str]) -> Result<DataFrame> {
    let header = header_names(bytes);
    let text: Vec<Field> = text_columns
        .iter()
        .filter(|name| header.contains(*name))
        .map(|name| Field::new((*name).into(), DataType::String))
        .collect();
    let overwrite = (!text.is_empty()).then(|| Arc::new(Schema::from_iter(text)));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_schema_overwrite(overwrite)
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Ok(df)
}

/// Column names of the first line.
fn header_names(bytes: &[u8]) -> Vec<&str> {
    let line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    std::str::from_utf8(line)
        .map(|l| {
            l.trim_end_matches('\r')
                .split(',')
                .map(|name| name.trim().trim_matches('"'))
                .collect()
        })
        .unwrap_or_default()
}

/// Writes a frame as CSV with a header row.
pub(crate) fn write_csv(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(df)?;
    Ok(buf)
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Column values as optional strings; numbers are rendered as text.
pub(crate) fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Column values as optional floats. Values that do not parse become `None`.
pub(crate) fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// True for integer and float columns.
pub(crate) fn is_numeric(df: &DataFrame, name: &str) -> Result<bool> {
    let dtype = df.column(name)?.dtype();
    Ok(dtype.is_integer() || dtype.is_float())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names() {
        assert_eq!(header_names(b"a,\"b\" , c\r\n1,2,3\n"), ["a", "b", "c"]);
        assert!(header_names(b"").iter().all(|n| n.is_empty()));
    }

    #[test]
    fn test_text_columns_keep_leading_zeros() {
        let df = read_csv(b"id,value\n01,1\n002,2\n", &["id", "absent"]).unwrap();
        let ids = string_values(&df, "id").unwrap();
        assert_eq!(ids, [Some("01".to_string()), Some("002".to_string())]);
        assert!(is_numeric(&df, "value").unwrap());
    }
}
