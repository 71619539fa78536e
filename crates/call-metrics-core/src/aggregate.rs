//! Grouped summaries and filters over canonical records.
//!
//! Every function here is a fresh computation over its input slice.
//! `productivity_pct` is always averaged, never summed.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use time::{Date, Month};

use crate::schema::Column;
use crate::table::{iso_date, CallRecord, Cell, TabularRows};
use crate::CoreError;

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: Month,
}

impl YearMonth {
    #[must_use]
    pub fn of(date: Date) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    #[must_use]
    pub fn contains(self, date: Date) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl Ord for YearMonth {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.year, u8::from(self.month)).cmp(&(other.year, u8::from(other.month)))
    }
}

impl PartialOrd for YearMonth {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, u8::from(self.month))
    }
}

impl FromStr for YearMonth {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidMonth(raw.to_string());
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmployeeSummary {
    pub employee_name: String,
    pub overall_calls: f64,
    pub completed_calls: f64,
    pub missed_calls: f64,
    pub login_hours: f64,
    pub cons_count: f64,
    pub audit_count: f64,
    pub fatal_count: f64,
    pub achieve_points: f64,
    pub productivity_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailySummary {
    #[serde(serialize_with = "serialize_date")]
    pub date: Date,
    pub overall_calls: f64,
    pub completed_calls: f64,
    pub missed_calls: f64,
    pub productivity_pct: f64,
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    iso_date::serialize(&Some(*date), serializer)
}

/// Headline figures shown above the agent summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Kpis {
    pub total_calls: f64,
    pub completed_calls: f64,
    pub avg_completed_pct: f64,
    pub avg_productivity_pct: f64,
}

/// Group by employee, summing counters and averaging productivity.
///
/// Sorted by `completed_calls` descending, then by name.
#[must_use]
pub fn summarize_by_employee(records: &[CallRecord]) -> Vec<EmployeeSummary> {
    let mut groups: BTreeMap<&str, (EmployeeSummary, usize)> = BTreeMap::new();
    for record in records {
        let (summary, rows) = groups.entry(record.employee_name.as_str()).or_insert_with(|| {
            (
                EmployeeSummary {
                    employee_name: record.employee_name.clone(),
                    overall_calls: 0.0,
                    completed_calls: 0.0,
                    missed_calls: 0.0,
                    login_hours: 0.0,
                    cons_count: 0.0,
                    audit_count: 0.0,
                    fatal_count: 0.0,
                    achieve_points: 0.0,
                    productivity_pct: 0.0,
                },
                0,
            )
        });
        summary.overall_calls += record.overall_calls;
        summary.completed_calls += record.completed_calls;
        summary.missed_calls += record.missed_calls;
        summary.login_hours += record.login_hours;
        summary.cons_count += record.cons_count;
        summary.audit_count += record.audit_count;
        summary.fatal_count += record.fatal_count;
        summary.achieve_points += record.achieve_points;
        summary.productivity_pct += record.productivity_pct;
        *rows += 1;
    }

    let mut summaries = groups
        .into_values()
        .map(|(mut summary, rows)| {
            summary.productivity_pct = mean(summary.productivity_pct, rows);
            summary
        })
        .collect::<Vec<_>>();
    summaries.sort_by(|left, right| {
        right
            .completed_calls
            .total_cmp(&left.completed_calls)
            .then_with(|| left.employee_name.cmp(&right.employee_name))
    });
    summaries
}

/// Group by date, ascending. Rows with a null date are left out.
#[must_use]
pub fn summarize_daily(records: &[CallRecord]) -> Vec<DailySummary> {
    let mut groups: BTreeMap<Date, (DailySummary, usize)> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date else {
            continue;
        };
        let (summary, rows) = groups.entry(date).or_insert_with(|| {
            (
                DailySummary {
                    date,
                    overall_calls: 0.0,
                    completed_calls: 0.0,
                    missed_calls: 0.0,
                    productivity_pct: 0.0,
                },
                0,
            )
        });
        summary.overall_calls += record.overall_calls;
        summary.completed_calls += record.completed_calls;
        summary.missed_calls += record.missed_calls;
        summary.productivity_pct += record.productivity_pct;
        *rows += 1;
    }

    groups
        .into_values()
        .map(|(mut summary, rows)| {
            summary.productivity_pct = mean(summary.productivity_pct, rows);
            summary
        })
        .collect()
}

#[must_use]
pub fn dashboard_kpis(records: &[CallRecord]) -> Kpis {
    let total_calls: f64 = records.iter().map(|record| record.overall_calls).sum();
    let completed_calls: f64 = records.iter().map(|record| record.completed_calls).sum();
    let completed_pct_sum: f64 = records.iter().map(|record| record.completed_pct).sum();
    let productivity_sum: f64 = records.iter().map(|record| record.productivity_pct).sum();
    Kpis {
        total_calls,
        completed_calls,
        avg_completed_pct: round2(mean(completed_pct_sum, records.len())),
        avg_productivity_pct: round2(mean(productivity_sum, records.len())),
    }
}

/// Keep rows whose date falls in the given calendar month.
#[must_use]
pub fn filter_by_month(records: &[CallRecord], year: i32, month: Month) -> Vec<CallRecord> {
    let target = YearMonth { year, month };
    records
        .iter()
        .filter(|record| record.date.is_some_and(|date| target.contains(date)))
        .cloned()
        .collect()
}

#[must_use]
pub fn filter_by_employee(records: &[CallRecord], employee_name: &str) -> Vec<CallRecord> {
    records.iter().filter(|record| record.employee_name == employee_name).cloned().collect()
}

#[must_use]
pub fn filter_by_date(records: &[CallRecord], date: Date) -> Vec<CallRecord> {
    records.iter().filter(|record| record.date == Some(date)).cloned().collect()
}

/// Newest first; null dates sink to the end. Stable within a date.
pub fn sort_by_date_desc(records: &mut [CallRecord]) {
    records.sort_by(|left, right| match (left.date, right.date) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Distinct months present in the data, ascending.
#[must_use]
pub fn available_months(records: &[CallRecord]) -> Vec<YearMonth> {
    let mut months =
        records.iter().filter_map(|record| record.date.map(YearMonth::of)).collect::<Vec<_>>();
    months.sort_unstable();
    months.dedup();
    months
}

/// Distinct non-empty employee names, ascending.
#[must_use]
pub fn employees(records: &[CallRecord]) -> Vec<String> {
    let mut names = records
        .iter()
        .map(|record| record.employee_name.as_str())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    names.sort_unstable();
    names.dedup();
    names.into_iter().map(str::to_string).collect()
}

#[allow(clippy::cast_precision_loss)]
fn mean(sum: f64, rows: usize) -> f64 {
    if rows == 0 {
        0.0
    } else {
        sum / rows as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl TabularRows for EmployeeSummary {
    fn headers() -> Vec<&'static str> {
        [
            Column::EmployeeName,
            Column::OverallCalls,
            Column::CompletedCalls,
            Column::MissedCalls,
            Column::LoginHours,
            Column::ConsCount,
            Column::AuditCount,
            Column::FatalCount,
            Column::AchievePoints,
            Column::ProductivityPct,
        ]
        .iter()
        .map(|column| column.header())
        .collect()
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Text(self.employee_name.clone()),
            Cell::Number(self.overall_calls),
            Cell::Number(self.completed_calls),
            Cell::Number(self.missed_calls),
            Cell::Number(self.login_hours),
            Cell::Number(self.cons_count),
            Cell::Number(self.audit_count),
            Cell::Number(self.fatal_count),
            Cell::Number(self.achieve_points),
            Cell::Number(round2(self.productivity_pct)),
        ]
    }
}

impl TabularRows for DailySummary {
    fn headers() -> Vec<&'static str> {
        [
            Column::Date,
            Column::OverallCalls,
            Column::CompletedCalls,
            Column::MissedCalls,
            Column::ProductivityPct,
        ]
        .iter()
        .map(|column| column.header())
        .collect()
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::Date(self.date),
            Cell::Number(self.overall_calls),
            Cell::Number(self.completed_calls),
            Cell::Number(self.missed_calls),
            Cell::Number(round2(self.productivity_pct)),
        ]
    }
}
