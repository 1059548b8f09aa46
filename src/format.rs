//! Extension-keyed registry of the file formats a pipeline can read and write.
//!
//! Each supported format is one [`FormatHandler`] entry in [`REGISTRY`]. A
//! format that can only be read (or only written) leaves the other side as
//! `None`, and asking for it fails the same way an unknown extension does.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::domain::{DataError, EtlError};
use crate::excel;

pub type ReadFn = fn(&Path) -> Result<DataFrame, DataError>;
pub type WriteFn = fn(&mut DataFrame, &mut File) -> Result<(), DataError>;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    CSV,
    JSON,
    XLSX,
    XLS,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FormatHandler {
    pub file_type: FileType,
    pub extensions: &'static [&'static str],
    pub reader: Option<ReadFn>,
    pub writer: Option<WriteFn>,
}

pub static REGISTRY: &[FormatHandler] = &[
    FormatHandler {
        file_type: FileType::CSV,
        extensions: &["csv"],
        reader: Some(read_csv),
        writer: Some(write_csv),
    },
    FormatHandler {
        file_type: FileType::JSON,
        extensions: &["json"],
        reader: Some(read_json),
        writer: Some(write_json),
    },
    FormatHandler {
        file_type: FileType::XLSX,
        extensions: &["xlsx"],
        reader: Some(excel::read_workbook),
        writer: Some(excel::write_workbook),
    },
    // Legacy workbooks can be read but there is no .xls writer.
    FormatHandler {
        file_type: FileType::XLS,
        extensions: &["xls"],
        reader: Some(excel::read_workbook),
        writer: None,
    },
    FormatHandler {
        file_type: FileType::PARQUET,
        extensions: &["parquet", "pq"],
        reader: Some(read_parquet),
        writer: Some(write_parquet),
    },
    FormatHandler {
        file_type: FileType::ARROW,
        extensions: &["arrow", "ipc", "feather"],
        reader: Some(read_arrow),
        writer: Some(write_arrow),
    },
];

impl FileType {
    /// Finds the registry entry for the extension of `path`.
    pub fn detect(path: &Path) -> Result<&'static FormatHandler, EtlError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .ok_or_else(|| EtlError::unsupported(path))?;

        REGISTRY
            .iter()
            .find(|handler| handler.extensions.iter().any(|ext| *ext == extension))
            .ok_or_else(|| EtlError::unsupported(path))
    }

    pub fn reader_for(path: &Path) -> Result<ReadFn, EtlError> {
        Self::detect(path)?
            .reader
            .ok_or_else(|| EtlError::unsupported(path))
    }

    pub fn writer_for(path: &Path) -> Result<WriteFn, EtlError> {
        Self::detect(path)?
            .writer
            .ok_or_else(|| EtlError::unsupported(path))
    }
}

fn read_csv(path: &Path) -> Result<DataFrame, DataError> {
    let frame = LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()?;
    Ok(frame.collect()?)
}

fn read_json(path: &Path) -> Result<DataFrame, DataError> {
    let file = File::open(path)?;
    Ok(JsonReader::new(file)
        .with_json_format(JsonFormat::Json)
        .finish()?)
}

fn read_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let frame = LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())?;
    Ok(frame.collect()?)
}

fn read_arrow(path: &Path) -> Result<DataFrame, DataError> {
    let frame = LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )?;
    Ok(frame.collect()?)
}

fn write_csv(frame: &mut DataFrame, file: &mut File) -> Result<(), DataError> {
    CsvWriter::new(file).include_header(true).finish(frame)?;
    Ok(())
}

// Array of records, one object per row.
fn write_json(frame: &mut DataFrame, file: &mut File) -> Result<(), DataError> {
    JsonWriter::new(file)
        .with_json_format(JsonFormat::Json)
        .finish(frame)?;
    Ok(())
}

fn write_parquet(frame: &mut DataFrame, file: &mut File) -> Result<(), DataError> {
    ParquetWriter::new(file).finish(frame)?;
    Ok(())
}

fn write_arrow(frame: &mut DataFrame, file: &mut File) -> Result<(), DataError> {
    IpcWriter::new(file).finish(frame)?;
    Ok(())
}
