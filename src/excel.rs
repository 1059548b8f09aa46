//! Workbook reading (calamine) and writing (rust_xlsxwriter).
//!
//! Only the first worksheet is read, and its first row names the columns.
//! Cell types are narrowed per column: all-integral numbers become Int64,
//! mixed numbers Float64, booleans Boolean and anything else text.
//! Date cells become text in the same `%Y-%m-%d %H:%M:%S` form the
//! transformer stamps rows with. Repeated header names get a `.1`, `.2`, ...
//! suffix.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::domain::DataError;
use crate::transformer::TIMESTAMP_FORMAT;

static EMPTY: Data = Data::Empty;

// Integral floats beyond this are not exact in f64 and stay Float64.
const MAX_EXACT_INT: f64 = 9.0e15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    Text,
}

pub fn read_workbook(path: &Path) -> Result<DataFrame, DataError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DataError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let body: Vec<&[Data]> = rows.collect();
    debug!(
        "Worksheet has {} columns and {} data rows",
        header.len(),
        body.len()
    );

    let names = header_names(header);
    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&EMPTY))
                .collect();
            build_column(name, &cells)
        })
        .collect::<Vec<Column>>();

    Ok(DataFrame::new(columns)?)
}

fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell {
                Data::Empty => format!("Unnamed: {idx}"),
                other => cell_text(other),
            };
            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}.{n}");
                n += 1;
            }
            name
        })
        .collect()
}

pub fn write_workbook(frame: &mut DataFrame, file: &mut File) -> Result<(), DataError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (idx, column) in frame.get_columns().iter().enumerate() {
        let col = u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)?;
        worksheet.write_string(0, col, column.name().as_str())?;
        write_cells(worksheet, col, column)?;
    }

    let buffer = workbook.save_to_buffer()?;
    file.write_all(&buffer)?;
    Ok(())
}

fn write_cells(worksheet: &mut Worksheet, col: u16, column: &Column) -> Result<(), DataError> {
    let series = column.as_materialized_series();
    match series.dtype() {
        DataType::Boolean => {
            for (idx, value) in series.bool()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_boolean(data_row(idx)?, col, v)?;
                }
            }
        }
        dtype if is_numeric_type(dtype) => {
            let numbers = series.cast(&DataType::Float64)?;
            for (idx, value) in numbers.f64()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_number(data_row(idx)?, col, v)?;
                }
            }
        }
        _ => {
            let text = series.cast(&DataType::String)?;
            for (idx, value) in text.str()?.into_iter().enumerate() {
                if let Some(v) = value {
                    worksheet.write_string(data_row(idx)?, col, v)?;
                }
            }
        }
    }
    Ok(())
}

// Row 0 holds the header.
fn data_row(idx: usize) -> Result<u32, XlsxError> {
    u32::try_from(idx + 1).map_err(|_| XlsxError::RowColumnLimitError)
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn is_missing(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

fn cell_kind(cell: &Data) -> CellKind {
    match cell {
        Data::Int(_) => CellKind::Int,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => CellKind::Int,
        Data::Float(_) => CellKind::Float,
        Data::Bool(_) => CellKind::Bool,
        _ => CellKind::Text,
    }
}

fn infer_kind(cells: &[&Data]) -> CellKind {
    cells
        .iter()
        .filter(|cell| !is_missing(cell))
        .map(|cell| cell_kind(cell))
        .reduce(|acc, kind| match (acc, kind) {
            (a, b) if a == b => a,
            (CellKind::Int | CellKind::Float, CellKind::Int | CellKind::Float) => CellKind::Float,
            _ => CellKind::Text,
        })
        .unwrap_or(CellKind::Text)
}

fn build_column(name: &str, cells: &[&Data]) -> Column {
    match infer_kind(cells) {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(i) => Some(*i as f64),
                    Data::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell_text(cell))
                    }
                })
                .collect();
            Column::new(name.into(), values)
        }
    }
}

// Dates render like etl_timestamp; anything unparseable keeps calamine's text.
fn cell_text(cell: &Data) -> String {
    let datetime = match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
        _ => None,
    };
    match datetime {
        Some(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        None => cell.to_string(),
    }
}
