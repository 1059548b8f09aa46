//! Cleaning rules applied to every extracted table.
//!
//! In order: rows with any missing cell are dropped, column names are
//! lowercased, an `id` column numbering the surviving rows from 1 is added
//! unless one already exists, and every row is stamped with the same
//! `etl_timestamp`. Filtering runs first so the ids stay dense.

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};
use polars::prelude::*;
use tracing::{debug, info};

use crate::domain::EtlError;
use crate::table::Table;

pub const ID_COLUMN: &str = "id";
pub const TIMESTAMP_COLUMN: &str = "etl_timestamp";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    captured_at: Option<NaiveDateTime>,
}

impl Transformer {
    /// Stamps rows with the local time at which `transform` runs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps rows with a fixed capture time.
    pub fn at(captured_at: NaiveDateTime) -> Self {
        Self {
            captured_at: Some(captured_at),
        }
    }

    pub fn transform(&self, table: Table) -> Result<Table, EtlError> {
        info!("Transforming data");
        let captured_at = self
            .captured_at
            .unwrap_or_else(|| Local::now().naive_local());

        let frame = table.into_frame();
        if frame.width() == 0 {
            return Err(EtlError::transformation("table has no columns"));
        }

        let nrows = frame.height();
        let frame = Self::drop_incomplete_rows(&frame)?;
        debug!("Dropped {} incomplete rows", nrows - frame.height());

        let mut frame = Self::lowercase_column_names(&frame)?;
        if !frame
            .get_column_names()
            .iter()
            .any(|name| name.as_str() == ID_COLUMN)
        {
            Self::assign_ids(&mut frame)?;
        }
        Self::stamp(&mut frame, captured_at)?;

        info!(
            "Transformation complete. {} records after transformation",
            frame.height()
        );
        Ok(Table::new(frame))
    }

    // A cell is missing when it is null, or NaN in a float column.
    fn drop_incomplete_rows(frame: &DataFrame) -> PolarsResult<DataFrame> {
        let mut complete =
            BooleanChunked::full(PlSmallStr::from_static("complete"), true, frame.height());
        for column in frame.get_columns() {
            let series = column.as_materialized_series();
            let mut present = series.is_not_null();
            if series.dtype().is_float() {
                let nan = series.is_nan()?;
                present = &present & &(!&nan);
            }
            complete = &complete & &present;
        }
        frame.filter(&complete)
    }

    fn lowercase_column_names(frame: &DataFrame) -> Result<DataFrame, EtlError> {
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let lowered = column.name().to_lowercase();
            if !seen.insert(lowered.clone()) {
                return Err(EtlError::transformation(format!(
                    "more than one column is named '{lowered}' after lowercasing"
                )));
            }
            let mut column = column.clone();
            column.rename(lowered.into());
            columns.push(column);
        }
        Ok(DataFrame::new(columns)?)
    }

    fn assign_ids(frame: &mut DataFrame) -> PolarsResult<()> {
        let ids: Vec<i64> = (1..=frame.height() as i64).collect();
        frame.with_column(Column::new(PlSmallStr::from_static(ID_COLUMN), ids))?;
        Ok(())
    }

    fn stamp(frame: &mut DataFrame, captured_at: NaiveDateTime) -> PolarsResult<()> {
        let stamp = captured_at.format(TIMESTAMP_FORMAT).to_string();
        let values = vec![stamp.as_str(); frame.height()];
        frame.with_column(Column::new(
            PlSmallStr::from_static(TIMESTAMP_COLUMN),
            values,
        ))?;
        Ok(())
    }
}
