//! CSV and XLSX export of the segmented table

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use polars::prelude::*;
use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::model::{output_columns, RfvTable};
use crate::segment::Metric;

pub const SHEET_NAME: &str = "Sheet1";

/// Write the table as CSV with a header row.
/// Missing actions are written as `null_value`.
pub fn write_csv<W: Write>(table: &RfvTable, writer: W, null_value: &str) -> crate::Result<()> {
    let mut df = table.to_dataframe()?;
    CsvWriter::new(writer)
        .include_header(true)
        .with_null_value(null_value.to_string())
        .finish(&mut df)?;
    Ok(())
}

pub fn to_csv_bytes(table: &RfvTable, null_value: &str) -> crate::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer, null_value)?;
    Ok(buffer)
}

pub fn write_csv_file(
    table: &RfvTable,
    output_path: impl AsRef<Path>,
    null_value: &str,
) -> crate::Result<()> {
    let output_path = output_path.as_ref();
    let file = File::create(output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    write_csv(table, file, null_value)?;
    info!(path = %output_path.display(), rows = table.len(), "csv written");
    Ok(())
}

/// Build the XLSX workbook in memory
pub fn to_xlsx_bytes(table: &RfvTable) -> crate::Result<Vec<u8>> {
    let mut workbook = build_workbook(table)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn write_xlsx_file(table: &RfvTable, output_path: impl AsRef<Path>) -> crate::Result<()> {
    let output_path = output_path.as_ref();
    let mut workbook = build_workbook(table)?;
    workbook
        .save(output_path)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!(path = %output_path.display(), rows = table.len(), "xlsx written");
    Ok(())
}

fn build_workbook(table: &RfvTable) -> crate::Result<Workbook> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    write_sheet(worksheet, table)?;
    Ok(workbook)
}

fn write_sheet(worksheet: &mut Worksheet, table: &RfvTable) -> crate::Result<()> {
    for (col, name) in output_columns().iter().enumerate() {
        worksheet.write_string(0, u16::try_from(col)?, *name)?;
    }

    for (index, customer) in table.customers.iter().enumerate() {
        let row = u32::try_from(index + 1)?;
        let score = customer.classification.score;

        worksheet.write_string(row, 0, customer.metrics.customer_id.as_str())?;
        worksheet.write_number(row, 1, customer.metrics.recency as f64)?;
        worksheet.write_number(row, 2, customer.metrics.frequency)?;
        worksheet.write_number(row, 3, customer.metrics.value)?;
        worksheet.write_string(row, 4, score.band(Metric::Recency).to_string())?;
        worksheet.write_string(row, 5, score.band(Metric::Frequency).to_string())?;
        worksheet.write_string(row, 6, score.band(Metric::Value).to_string())?;
        worksheet.write_string(row, 7, score.to_string())?;
        // Missing actions stay as empty cells.
        if let Some(action) = &customer.classification.action {
            worksheet.write_string(row, 8, action.as_str())?;
        }
    }
    Ok(())
}
