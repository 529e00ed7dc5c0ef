use std::path::Path;

use chrono::{NaiveDate, ParseError};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::error::{Error, Result};
use crate::table::{Cell, LabeledTable, RowLabel};

/// Writes a labeled table to CSV: index first, then every column in order.
///
/// Any existing file at `output_path` is overwritten. The parent directory is
/// expected to exist.
pub fn write_table<R: RowLabel, T: Cell>(
    table: &LabeledTable<R, T>,
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let output_path = output_path.as_ref();
    let io_err = |e: csv::Error| Error::io(output_path, e.into());

    let mut wtr = WriterBuilder::new()
        .has_headers(true)
        .from_path(output_path)
        .map_err(io_err)?;

    let mut header = vec![R::HEADER.to_string()];
    header.extend(table.columns().iter().cloned());
    wtr.write_record(&header).map_err(io_err)?;

    for (label, row) in table.index().iter().zip(table.values().rows()) {
        let mut record = vec![label.to_string()];
        record.extend(row.iter().map(Cell::to_field));
        wtr.write_record(&record).map_err(io_err)?;
    }
    wtr.flush().map_err(|e| Error::io(output_path, e))?;

    info!("Data saved to file: {}", output_path.display());
    Ok(())
}

/// Maps a csv reader error: I/O problems stay `IoFailure`, anything else
/// (ragged rows, bad UTF-8) means the file is not a valid table.
pub(crate) fn read_error(path: &Path, e: csv::Error) -> Error {
    if e.is_io_error() {
        Error::io(path, e.into())
    } else {
        Error::InvalidTable(format!("{}: {}", path.display(), e))
    }
}

/// Reads back a table written by [`write_table`].
pub fn read_table<R: RowLabel, T: Cell>(input_path: impl AsRef<Path>) -> Result<LabeledTable<R, T>> {
    let input_path = input_path.as_ref();
    let read_err = |e: csv::Error| read_error(input_path, e);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(input_path)
        .map_err(read_err)?;
    let headers = rdr.headers().map_err(read_err)?.clone();
    match headers.get(0) {
        Some(first) if first == R::HEADER => {}
        first => {
            return Err(Error::InvalidTable(format!(
                "{}: index column must be {:?}, found {:?}",
                input_path.display(),
                R::HEADER,
                first.unwrap_or_default()
            )));
        }
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut index = Vec::new();
    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(read_err)?;
        let label = record.get(0).unwrap_or_default();
        let label = label.parse::<R>().map_err(|_| {
            Error::InvalidTable(format!("row {}: bad index label {:?}", line + 1, label))
        })?;

        let row = record
            .iter()
            .skip(1)
            .map(|field| {
                T::from_field(field).ok_or_else(|| {
                    Error::InvalidTable(format!("row {}: bad value {:?}", line + 1, field))
                })
            })
            .collect::<Result<Vec<T>>>()?;

        index.push(label);
        rows.push(row);
    }

    LabeledTable::from_rows(index, columns, rows)
}

pub fn parse_date(date_str: &str) -> std::result::Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}
