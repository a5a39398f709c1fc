#![forbid(unsafe_code)]

//! CSV loading and saving for record tables.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use fe_columnar::{Column, ColumnError};
use fe_frame::{DataFrame, FrameError};
use fe_index::Index;
use fe_types::{DType, NullKind, Scalar, format_timestamp, parse_timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no header row")]
    MissingHeaders,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("csv output is not valid utf-8")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Read CSV with a header row into a frame with a `0..n` index.
///
/// Each column gets the narrowest dtype all its non-empty fields parse as
/// (`Int64`, `Float64`, `Bool`, `Timestamp`); columns that mix kinds stay
/// `Utf8`. Empty fields are missing.
pub fn read_csv_from<R: Read>(source: R) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }
    let records = reader.records().collect::<Result<Vec<StringRecord>, _>>()?;

    let mut columns = BTreeMap::new();
    for (idx, name) in headers.iter().enumerate() {
        let fields = records
            .iter()
            .map(|record| record.get(idx).unwrap_or_default())
            .collect::<Vec<_>>();
        columns.insert(name.to_owned(), infer_column(&fields)?);
    }

    let index = Index::range(records.len()).map_err(FrameError::from)?;
    let column_order = headers.iter().map(str::to_owned).collect();
    Ok(DataFrame::new_with_column_order(index, columns, column_order)?)
}

pub fn read_csv_str(input: &str) -> Result<DataFrame, IoError> {
    read_csv_from(input.as_bytes())
}

pub fn read_csv(path: &Path) -> Result<DataFrame, IoError> {
    read_csv_from(BufReader::new(File::open(path)?))
}

/// Write the frame as CSV, columns in frame order and no index column.
///
/// Missing values and `NaN` become empty fields.
pub fn write_csv_to<W: Write>(frame: &DataFrame, sink: W) -> Result<(), IoError> {
    let mut writer = WriterBuilder::new().from_writer(sink);
    let names = frame.column_names();
    let columns = names
        .iter()
        .map(|name| frame.require_column(name))
        .collect::<Result<Vec<_>, _>>()?;

    writer.write_record(&names)?;
    for row in 0..frame.len() {
        writer.write_record(
            columns
                .iter()
                .map(|column| column.value(row).map_or_else(String::new, format_field)),
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv_string(frame: &DataFrame) -> Result<String, IoError> {
    let mut bytes = Vec::new();
    write_csv_to(frame, &mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_csv(frame: &DataFrame, path: &Path) -> Result<(), IoError> {
    write_csv_to(frame, BufWriter::new(File::create(path)?))
}

fn infer_column(fields: &[&str]) -> Result<Column, IoError> {
    let parsed = fields.iter().map(|field| parse_field(field)).collect();
    match Column::from_values(parsed) {
        Err(ColumnError::Type(_)) => {
            let text = fields
                .iter()
                .map(|field| match *field {
                    "" => Scalar::Null(NullKind::Null),
                    text => Scalar::Utf8(text.to_owned()),
                })
                .collect();
            Ok(Column::new(DType::Utf8, text)?)
        }
        other => Ok(other?),
    }
}

fn parse_field(field: &str) -> Scalar {
    if field.is_empty() {
        Scalar::Null(NullKind::Null)
    } else if let Ok(value) = field.parse::<i64>() {
        Scalar::Int64(value)
    } else if let Ok(value) = field.parse::<f64>() {
        Scalar::Float64(value)
    } else if let Ok(value) = field.parse::<bool>() {
        Scalar::Bool(value)
    } else if let Some(nanos) = parse_timestamp(field) {
        Scalar::Timestamp(nanos)
    } else {
        Scalar::Utf8(field.to_owned())
    }
}

fn format_field(value: &Scalar) -> String {
    match value {
        Scalar::Null(_) => String::new(),
        Scalar::Float64(v) if v.is_nan() => String::new(),
        Scalar::Timestamp(nanos) => format_timestamp(*nanos),
        Scalar::Bool(v) => v.to_string(),
        Scalar::Int64(v) => v.to_string(),
        Scalar::Float64(v) => v.to_string(),
        Scalar::Utf8(v) => v.clone(),
    }
}
