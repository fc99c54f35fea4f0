use crate::error::{Result, UsageForecastError};
use crate::report::{ForecastReport, ReportCell};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::io::Write;

pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const DEFAULT_FILE_NAME: &str = "usage_forecast.xlsx";

const FORECAST_SHEET: &str = "Forecast";
const BASELINE_SHEET: &str = "Weekday Baseline";

/// Serializes the report as an Office Open XML workbook: the forecast table
/// on the first sheet, the weekday baseline on the second.
pub fn to_xlsx_bytes(report: &ForecastReport) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(FORECAST_SHEET)?;
        let rows: Vec<Vec<ReportCell>> = report.rows.iter().map(|r| report.row_cells(r)).collect();
        write_table(sheet, &header_format, &report.column_headers(), &rows)?;
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(BASELINE_SHEET)?;
        write_table(
            sheet,
            &header_format,
            &report.baseline_headers(),
            &report.baseline_cells(),
        )?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_table(
    sheet: &mut Worksheet,
    header_format: &Format,
    headers: &[String],
    rows: &[Vec<ReportCell>],
) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, column_number(col)?, header, header_format)?;
    }

    for (row_idx, cells) in rows.iter().enumerate() {
        let row = u32::try_from(row_idx + 1)
            .map_err(|_| UsageForecastError::Export(format!("row {} out of range", row_idx)))?;
        for (col, cell) in cells.iter().enumerate() {
            let col = column_number(col)?;
            match cell {
                ReportCell::Number(value) => {
                    sheet.write_number(row, col, *value)?;
                }
                ReportCell::Text(text) => {
                    sheet.write_string(row, col, text)?;
                }
                ReportCell::Empty => {}
            }
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn column_number(col: usize) -> Result<u16> {
    u16::try_from(col)
        .map_err(|_| UsageForecastError::Export(format!("column {} out of range", col)))
}

/// Writes the forecast table as CSV. Missing values become empty fields.
pub fn write_csv<W: Write>(report: &ForecastReport, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(report.column_headers())?;

    for row in &report.rows {
        let fields: Vec<String> = report
            .row_cells(row)
            .into_iter()
            .map(|cell| match cell {
                ReportCell::Number(value) => value.to_string(),
                ReportCell::Text(text) => text,
                ReportCell::Empty => String::new(),
            })
            .collect();
        csv_writer.write_record(&fields)?;
    }

    csv_writer.flush()?;
    Ok(())
}
