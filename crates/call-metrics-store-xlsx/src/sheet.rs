//! Spreadsheet and CSV reading/writing between files and [`RawTable`]s.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use call_metrics_core::{excel_serial_to_date, Cell, RawTable, TabularRows};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::NamedTempFile;

/// Read an uploaded `.csv` or `.xlsx`/`.xls` file; the first row is the header.
///
/// # Errors
/// Returns an error for unsupported extensions or unreadable files.
pub fn read_upload(path: &Path) -> Result<RawTable> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xls" | "xlsm" => read_workbook(path),
        other => Err(anyhow!(
            "unsupported upload type `{other}` for {}; expected .xlsx or .csv",
            path.display()
        )),
    }
}

/// # Errors
/// Returns an error when the file cannot be opened or is not valid CSV.
pub fn read_csv(path: &Path) -> Result<RawTable> {
    let file = File::open(path)
        .with_context(|| format!("failed to open CSV file {}", path.display()))?;
    read_csv_from(file).with_context(|| format!("failed to parse CSV file {}", path.display()))
}

/// Parse CSV text; every non-empty field becomes a text cell.
///
/// # Errors
/// Returns an error on malformed CSV or invalid UTF-8.
pub fn read_csv_from<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("failed to read CSV header row")?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    let mut table = RawTable::new(headers);
    for (index, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("failed to read CSV row {}", index + 2))?;
        table.push_row(
            row.iter()
                .map(|field| if field.trim().is_empty() { Cell::Empty } else { Cell::text(field) })
                .collect(),
        );
    }
    Ok(table)
}

/// Read the first worksheet of a workbook, skipping completely empty rows.
///
/// # Errors
/// Returns an error when the workbook cannot be opened or has no worksheet.
pub fn read_workbook(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(anyhow!("workbook {} has no worksheets", path.display()));
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("failed to read sheet `{sheet_name}` in {}", path.display()))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|header| header.iter().map(header_text).collect::<Vec<_>>())
        .unwrap_or_default();

    let mut table = RawTable::new(headers);
    for row in rows {
        let cells = row.iter().map(data_to_cell).collect::<Vec<_>>();
        if cells.iter().all(|cell| matches!(cell, Cell::Empty)) {
            continue;
        }
        table.push_row(cells);
    }
    Ok(table)
}

fn header_text(cell: &Data) -> String {
    match data_to_cell(cell) {
        Cell::Text(text) => text.trim().to_string(),
        other => call_metrics_core::coerce_text(&other),
    }
}

fn data_to_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) => {
            if text.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(text.clone())
            }
        }
        Data::Float(value) => Cell::Number(*value),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(flag) => Cell::Bool(*flag),
        Data::DateTime(value) => {
            excel_serial_to_date(value.as_f64()).map_or(Cell::Empty, Cell::Date)
        }
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

/// Render rows as a single-sheet `.xlsx` workbook held in memory.
///
/// # Errors
/// Returns an error when a cell cannot be encoded or the workbook cannot be serialized.
pub fn write_xlsx<T: TabularRows>(rows: &[T], sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).context("invalid worksheet name")?;

    for (col, header) in T::headers().into_iter().enumerate() {
        worksheet
            .write_string_with_format(0, sheet_col(col)?, header, &header_format)
            .context("failed to write header cell")?;
    }

    for (index, row) in rows.iter().enumerate() {
        let sheet_row = u32::try_from(index + 1).context("too many rows for one worksheet")?;
        for (col, cell) in row.cells().into_iter().enumerate() {
            let col = sheet_col(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    worksheet
                        .write_string(sheet_row, col, text)
                        .context("failed to write text cell")?;
                }
                Cell::Number(value) => {
                    worksheet
                        .write_number(sheet_row, col, value)
                        .context("failed to write number cell")?;
                }
                Cell::Bool(flag) => {
                    worksheet
                        .write_boolean(sheet_row, col, flag)
                        .context("failed to write boolean cell")?;
                }
                Cell::Date(date) => {
                    let year = u16::try_from(date.year())
                        .with_context(|| format!("date {date} is outside the sheet range"))?;
                    let value = ExcelDateTime::from_ymd(year, u8::from(date.month()), date.day())
                        .with_context(|| format!("date {date} is outside the sheet range"))?;
                    worksheet
                        .write_datetime_with_format(sheet_row, col, &value, &date_format)
                        .context("failed to write date cell")?;
                }
            }
        }
    }

    workbook.save_to_buffer().context("failed to serialize workbook")
}

/// Render rows as CSV text with a header line.
///
/// # Errors
/// Returns an error when the CSV buffer cannot be written.
pub fn write_csv<T: TabularRows>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(T::headers()).context("failed to write CSV header")?;
    for row in rows {
        writer
            .write_record(row.cells().iter().map(cell_text))
            .context("failed to write CSV row")?;
    }
    writer.into_inner().map_err(|err| anyhow!("failed to finish CSV buffer: {}", err.error()))
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        other => call_metrics_core::coerce_text(other),
    }
}

fn sheet_col(index: usize) -> Result<u16> {
    u16::try_from(index).context("too many columns for one worksheet")
}

/// Replace `path` with `bytes` via a sibling temp file, so a failed write leaves
/// the previous file untouched.
///
/// # Errors
/// Returns an error when the directory cannot be created or the file cannot be replaced.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    staged
        .write_all(bytes)
        .and_then(|()| staged.flush())
        .with_context(|| format!("failed to stage write for {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("failed to sync staged write for {}", path.display()))?;
    staged.persist(path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use call_metrics_core::{normalize, CallRecord, Column};
    use time::macros::date;

    use super::*;

    #[test]
    fn csv_upload_reads_headers_and_blank_fields() -> Result<()> {
        let body = "Date,Employee Name,Completed %,Missed Calls\n\
                    2024-01-01,A,85%,\n\
                    2024-01-02,B,nan,3\n";
        let raw = read_csv_from(body.as_bytes())?;
        assert_eq!(raw.headers, vec!["Date", "Employee Name", "Completed %", "Missed Calls"]);
        assert_eq!(raw.rows[0][3], Cell::Empty);

        let records = normalize(&raw);
        assert_eq!(records[0].completed_pct, 85.0);
        assert_eq!(records[1].completed_pct, 0.0);
        assert_eq!(records[1].missed_calls, 3.0);
        Ok(())
    }

    #[test]
    fn csv_rows_may_be_ragged() -> Result<()> {
        let raw = read_csv_from("Employee Name,Overall Calls\nA\nB,4,extra\n".as_bytes())?;
        let records = normalize(&raw);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].overall_calls, 0.0);
        assert_eq!(records[1].overall_calls, 4.0);
        Ok(())
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = read_upload(Path::new("daily.txt"));
        assert!(err.is_err());
    }

    #[test]
    fn workbook_round_trip_preserves_types() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("upload.xlsx");
        let records = vec![
            CallRecord {
                date: Some(date!(2024 - 02 - 29)),
                employee_name: "A".to_string(),
                login_hours: 7.5,
                ..CallRecord::default()
            },
            CallRecord { employee_name: "B".to_string(), ..CallRecord::default() },
        ];
        write_atomic(&path, &write_xlsx(&records, "Master")?)?;

        let raw = read_upload(&path)?;
        assert_eq!(raw.headers.len(), Column::ALL.len());
        assert_eq!(normalize(&raw), records);
        Ok(())
    }

    #[test]
    fn csv_output_renders_whole_numbers_without_decimals() -> Result<()> {
        let records = vec![CallRecord {
            date: Some(date!(2024 - 01 - 03)),
            employee_name: "A".to_string(),
            overall_calls: 12.0,
            productivity_pct: 87.5,
            ..CallRecord::default()
        }];
        let text = String::from_utf8(write_csv(&records)?)?;
        let mut lines = text.lines();
        assert_eq!(lines.next().map(|line| line.starts_with("Date,Employee Name,")), Some(true));
        let data = lines.next().unwrap_or_default();
        assert!(data.starts_with("2024-01-03,A,12,"));
        assert!(data.ends_with(",87.5"));
        Ok(())
    }

    #[test]
    fn atomic_write_creates_missing_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/data/out.csv");
        write_atomic(&path, b"a,b\n")?;
        assert_eq!(fs::read(&path)?, b"a,b\n");
        Ok(())
    }
}
