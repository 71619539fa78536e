//! Canonical schema, normalization, and aggregation for daily agent call metrics.
//!
//! Everything in this crate is pure: file I/O lives in the store crate.

use time::Date;

mod aggregate;
mod manual;
mod normalize;
mod schema;
mod table;

pub use aggregate::{
    available_months, dashboard_kpis, employees, filter_by_date, filter_by_employee,
    filter_by_month, sort_by_date_desc, summarize_by_employee, summarize_daily, DailySummary,
    EmployeeSummary, Kpis, YearMonth,
};
pub use manual::{apply_manual_counts, current_manual_counts, ManualCounts, ManualEntry};
pub use normalize::{
    coerce_date, coerce_numeric, coerce_percentage, coerce_text, excel_serial_to_date, normalize,
    renormalize,
};
pub use schema::{canonical_headers, Column, ColumnKind, COLUMN_COUNT};
pub use table::{CallRecord, Cell, RawTable, RecordKey, TabularRows};

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid month `{0}`; expected YYYY-MM")]
    InvalidMonth(String),
    #[error("nothing to update: no rows for employee `{employee_name}` on {date}")]
    NoMatch { employee_name: String, date: Date },
}

/// Concatenate `existing` and `incoming`, dropping exact duplicates across all columns.
///
/// When two rows are identical the later one is kept, so an incoming row
/// replaces its pre-existing twin at the incoming position. Order within each
/// side is otherwise preserved.
#[must_use]
pub fn merge_dedup(existing: Vec<CallRecord>, incoming: Vec<CallRecord>) -> Vec<CallRecord> {
    let mut combined = existing;
    combined.extend(incoming);

    let mut seen = std::collections::HashSet::with_capacity(combined.len());
    let mut kept = combined
        .into_iter()
        .rev()
        .filter(|record| seen.insert(record.dedup_key()))
        .collect::<Vec<_>>();
    kept.reverse();
    kept
}
