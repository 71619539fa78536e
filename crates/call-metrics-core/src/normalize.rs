//! Coercion of arbitrary input tables into canonical [`CallRecord`]s.
//!
//! Normalization never fails on cell contents: unparseable numbers become `0`
//! and unparseable dates become `None`.

use time::macros::{date, format_description};
use time::{Date, Duration};

use crate::schema::{Column, ColumnKind, COLUMN_COUNT};
use crate::table::{CallRecord, Cell, RawTable};

static EMPTY_CELL: Cell = Cell::Empty;

/// Dates a workbook cell can hold; anything else cannot be persisted.
const FIRST_SHEET_DATE: Date = date!(1900 - 01 - 01);
const LAST_SHEET_DATE: Date = date!(9999 - 12 - 31);

/// Normalize every row of `raw` into the canonical schema.
///
/// Columns missing from the input read as empty cells; extra columns are ignored.
#[must_use]
pub fn normalize(raw: &RawTable) -> Vec<CallRecord> {
    let positions = column_positions(&raw.headers);
    raw.rows.iter().map(|row| normalize_row(&positions, row)).collect()
}

/// Re-apply normalization to records that are already canonical.
#[must_use]
pub fn renormalize(records: &[CallRecord]) -> Vec<CallRecord> {
    normalize(&RawTable::from_records(records))
}

fn column_positions(headers: &[String]) -> [Option<usize>; COLUMN_COUNT] {
    let mut positions = [None; COLUMN_COUNT];
    for (index, header) in headers.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            let slot = &mut positions[column.index()];
            if slot.is_none() {
                *slot = Some(index);
            }
        }
    }
    positions
}

fn normalize_row(positions: &[Option<usize>; COLUMN_COUNT], row: &[Cell]) -> CallRecord {
    let mut record = CallRecord::default();
    for column in Column::ALL {
        let cell =
            positions[column.index()].and_then(|index| row.get(index)).unwrap_or(&EMPTY_CELL);
        match column.kind() {
            ColumnKind::Date => record.date = coerce_date(cell),
            ColumnKind::Text => record.employee_name = coerce_text(cell),
            ColumnKind::Numeric => {
                if let Some(slot) = record.numeric_mut(column) {
                    *slot = coerce_numeric(cell);
                }
            }
            ColumnKind::Percentage => {
                if let Some(slot) = record.numeric_mut(column) {
                    *slot = coerce_percentage(cell);
                }
            }
        }
    }
    record
}

/// Coerce a cell to a finite number, falling back to `0`.
#[must_use]
pub fn coerce_numeric(cell: &Cell) -> f64 {
    let value = match cell {
        Cell::Number(value) => *value,
        Cell::Bool(flag) => f64::from(u8::from(*flag)),
        Cell::Text(text) => parse_number(text).unwrap_or(0.0),
        Cell::Empty | Cell::Date(_) => 0.0,
    };
    finite_or_zero(value)
}

/// Like [`coerce_numeric`], but strips one trailing `%` from text first.
#[must_use]
pub fn coerce_percentage(cell: &Cell) -> f64 {
    match cell {
        Cell::Text(text) => {
            let trimmed = text.trim();
            let stripped = trimmed.strip_suffix('%').unwrap_or(trimmed);
            finite_or_zero(parse_number(stripped).unwrap_or(0.0))
        }
        other => coerce_numeric(other),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn finite_or_zero(value: f64) -> f64 {
    // also folds -0.0 into 0.0
    if value.is_finite() && value != 0.0 {
        value
    } else {
        0.0
    }
}

#[must_use]
pub fn coerce_text(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(text) => text.trim().to_string(),
        Cell::Number(value) => {
            if value.fract() == 0.0 && value.is_finite() {
                format!("{value:.0}")
            } else {
                value.to_string()
            }
        }
        Cell::Bool(flag) => String::from(if *flag { "TRUE" } else { "FALSE" }),
        Cell::Date(date) => date.to_string(),
    }
}

/// Coerce a cell to a calendar date; anything unrecognised is `None`.
///
/// Dates outside 1900-01-01..=9999-12-31 are also `None`, since the master
/// workbook cannot store them.
#[must_use]
pub fn coerce_date(cell: &Cell) -> Option<Date> {
    let date = match cell {
        Cell::Date(date) => Some(*date),
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(text) => parse_date_text(text),
        Cell::Empty | Cell::Bool(_) => None,
    }?;
    (FIRST_SHEET_DATE..=LAST_SHEET_DATE).contains(&date).then_some(date)
}

/// Convert a spreadsheet serial day number (1900 date system) to a date.
///
/// The fractional part is the time of day and is discarded. Serial 60 is the
/// nonexistent 1900-02-29 of the 1900 system and reads as 1900-02-28.
#[must_use]
pub fn excel_serial_to_date(serial: f64) -> Option<Date> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let days = serial.floor() as i64;
    let offset = if days < 60 { days + 1 } else { days };
    date!(1899 - 12 - 30).checked_add(Duration::days(offset))
}

fn parse_date_text(text: &str) -> Option<Date> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date_part = trimmed.split(['T', ' ']).next().unwrap_or(trimmed);

    let iso = format_description!("[year]-[month padding:none]-[day padding:none]");
    let slashed_iso = format_description!("[year]/[month padding:none]/[day padding:none]");
    let month_first = format_description!("[month padding:none]/[day padding:none]/[year]");
    let day_first_dashed = format_description!("[day padding:none]-[month padding:none]-[year]");

    Date::parse(date_part, iso)
        .or_else(|_| Date::parse(date_part, slashed_iso))
        .or_else(|_| Date::parse(date_part, month_first))
        .or_else(|_| Date::parse(date_part, day_first_dashed))
        .ok()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::macros::date;

    use super::*;
    use crate::schema::canonical_headers;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[test]
    fn missing_columns_default_to_zero_and_null_date() {
        let mut raw = RawTable::new(headers(&["Employee Name", "Completed Calls"]));
        raw.push_row(vec![Cell::text("A"), Cell::Number(8.0)]);

        let records = normalize(&raw);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.date, None);
        assert_eq!(record.employee_name, "A");
        assert_eq!(record.completed_calls, 8.0);
        assert_eq!(record.overall_calls, 0.0);
        assert_eq!(record.cons_count, 0.0);
    }

    #[test]
    fn extra_and_reordered_columns_are_ignored() {
        let mut raw = RawTable::new(headers(&["Shift", "Overall Calls", "Date", "Employee Name"]));
        raw.push_row(vec![
            Cell::text("night"),
            Cell::text("10"),
            Cell::text("2024-01-01"),
            Cell::text("A"),
        ]);

        let records = normalize(&raw);
        assert_eq!(records[0].date, Some(date!(2024 - 01 - 01)));
        assert_eq!(records[0].overall_calls, 10.0);
        assert_eq!(RawTable::from_records(&records).headers, canonical_headers());
    }

    #[test]
    fn percentage_text_is_stripped_and_coerced() {
        assert_eq!(coerce_percentage(&Cell::text("85%")), 85.0);
        assert_eq!(coerce_percentage(&Cell::text(" 72.5 % ")), 72.5);
        assert_eq!(coerce_percentage(&Cell::text("nan")), 0.0);
        assert_eq!(coerce_percentage(&Cell::text("")), 0.0);
        assert_eq!(coerce_percentage(&Cell::Empty), 0.0);
        assert_eq!(coerce_percentage(&Cell::Number(0.5)), 0.5);
    }

    #[test]
    fn unparseable_numbers_fall_back_to_zero() {
        assert_eq!(coerce_numeric(&Cell::text("N/A")), 0.0);
        assert_eq!(coerce_numeric(&Cell::text("inf")), 0.0);
        assert_eq!(coerce_numeric(&Cell::text("1,234")), 0.0);
        assert_eq!(coerce_numeric(&Cell::Number(f64::NAN)), 0.0);
        assert_eq!(coerce_numeric(&Cell::text(" 12 ")), 12.0);
        assert_eq!(coerce_numeric(&Cell::Bool(true)), 1.0);
        assert_eq!(coerce_numeric(&Cell::Date(date!(2024 - 01 - 01))), 0.0);
        assert!(coerce_numeric(&Cell::Number(-0.0)).is_sign_positive());
    }

    #[test]
    fn dates_parse_from_common_layouts() {
        let expected = Some(date!(2024 - 03 - 07));
        assert_eq!(coerce_date(&Cell::text("2024-03-07")), expected);
        assert_eq!(coerce_date(&Cell::text("2024-03-07 14:30:00")), expected);
        assert_eq!(coerce_date(&Cell::text("2024-03-07T08:00:00")), expected);
        assert_eq!(coerce_date(&Cell::text("2024/3/7")), expected);
        assert_eq!(coerce_date(&Cell::text("3/7/2024")), expected);
        assert_eq!(coerce_date(&Cell::text("07-03-2024")), expected);
        assert_eq!(coerce_date(&Cell::Number(45_358.75)), expected);
        assert_eq!(coerce_date(&Cell::Date(date!(2024 - 03 - 07))), expected);
    }

    #[test]
    fn serials_around_the_1900_leap_day_match_spreadsheets() {
        assert_eq!(excel_serial_to_date(1.0), Some(date!(1900 - 01 - 01)));
        assert_eq!(excel_serial_to_date(59.0), Some(date!(1900 - 02 - 28)));
        assert_eq!(excel_serial_to_date(60.0), Some(date!(1900 - 02 - 28)));
        assert_eq!(excel_serial_to_date(61.0), Some(date!(1900 - 03 - 01)));
        assert_eq!(excel_serial_to_date(2_958_465.5), Some(date!(9999 - 12 - 31)));
        assert_eq!(excel_serial_to_date(2_958_466.0), None);
    }

    #[test]
    fn dates_a_workbook_cannot_hold_become_null() {
        assert_eq!(coerce_date(&Cell::text("1850-06-01")), None);
        assert_eq!(coerce_date(&Cell::text("1899-12-31")), None);
        assert_eq!(coerce_date(&Cell::Date(date!(1776 - 07 - 04))), None);
        assert_eq!(coerce_date(&Cell::text("1900-01-01")), Some(date!(1900 - 01 - 01)));
        assert_eq!(coerce_date(&Cell::text("9999-12-31")), Some(date!(9999 - 12 - 31)));
    }

    #[test]
    fn unparseable_dates_become_null() {
        assert_eq!(coerce_date(&Cell::text("yesterday")), None);
        assert_eq!(coerce_date(&Cell::text("2024-13-01")), None);
        assert_eq!(coerce_date(&Cell::Empty), None);
        assert_eq!(coerce_date(&Cell::Number(-4.0)), None);
    }

    #[test]
    fn employee_names_are_rendered_as_text() {
        assert_eq!(coerce_text(&Cell::text("  Priya ")), "Priya");
        assert_eq!(coerce_text(&Cell::Number(1042.0)), "1042");
        assert_eq!(coerce_text(&Cell::Empty), "");
    }

    #[test]
    fn short_rows_read_missing_cells_as_empty() {
        let mut raw = RawTable::new(headers(&["Date", "Employee Name", "Missed Calls"]));
        raw.push_row(vec![Cell::text("2024-01-02")]);
        let records = normalize(&raw);
        assert_eq!(records[0].employee_name, "");
        assert_eq!(records[0].missed_calls, 0.0);
    }

    #[test]
    fn duplicate_headers_use_first_occurrence() {
        let mut raw = RawTable::new(headers(&["Missed Calls", "missed_calls"]));
        raw.push_row(vec![Cell::Number(3.0), Cell::Number(9.0)]);
        assert_eq!(normalize(&raw)[0].missed_calls, 3.0);
    }

    fn arb_cell() -> impl Strategy<Value = Cell> {
        prop_oneof![
            Just(Cell::Empty),
            any::<bool>().prop_map(Cell::Bool),
            (-1.0e6..1.0e6_f64).prop_map(Cell::Number),
            "[0-9]{1,4}(\\.[0-9]{1,2})?%?".prop_map(Cell::Text),
            "[A-Za-z /-]{0,8}".prop_map(Cell::Text),
            (2000_i32..2030, 1_u8..=12, 1_u8..=28).prop_map(|(year, month, day)| {
                Cell::Text(format!("{year}-{month:02}-{day:02}"))
            }),
        ]
    }

    fn arb_table() -> impl Strategy<Value = RawTable> {
        let header_pool = prop::sample::subsequence(
            Column::ALL.iter().map(|column| column.header().to_string()).collect::<Vec<_>>(),
            0..=Column::ALL.len(),
        )
        .prop_shuffle();
        header_pool.prop_flat_map(|mut names| {
            names.push("Unrelated".to_string());
            let width = names.len();
            prop::collection::vec(prop::collection::vec(arb_cell(), width), 0..6)
                .prop_map(move |rows| RawTable { headers: names.clone(), rows })
        })
    }

    proptest! {
        #[test]
        fn property_normalize_is_idempotent(raw in arb_table()) {
            let once = normalize(&raw);
            let twice = renormalize(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn property_normalized_values_are_finite(raw in arb_table()) {
            for record in normalize(&raw) {
                for column in Column::ALL {
                    if let Some(value) = record.numeric(column) {
                        prop_assert!(value.is_finite());
                    }
                }
            }
        }

        #[test]
        fn property_row_count_is_preserved(raw in arb_table()) {
            prop_assert_eq!(normalize(&raw).len(), raw.rows.len());
        }
    }
}
