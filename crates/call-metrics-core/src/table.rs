use serde::{Deserialize, Serialize};
use time::Date;

use crate::schema::{canonical_headers, Column};

/// A single untyped input cell as read from an upload or the master file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(Date),
}

impl Cell {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// A header row plus data rows of arbitrary shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    #[must_use]
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a raw table in canonical column order from already-normalized records.
    #[must_use]
    pub fn from_records(records: &[CallRecord]) -> Self {
        Self {
            headers: canonical_headers().into_iter().map(str::to_string).collect(),
            rows: records.iter().map(TabularRows::cells).collect(),
        }
    }
}

/// One agent-day observation in canonical form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallRecord {
    #[serde(with = "iso_date")]
    pub date: Option<Date>,
    pub employee_name: String,
    pub overall_calls: f64,
    pub completed_calls: f64,
    pub completed_pct: f64,
    pub incoming_calls: f64,
    pub incoming_completed_calls: f64,
    pub incoming_pct: f64,
    pub outbound_calls: f64,
    pub missed_calls: f64,
    pub login_hours: f64,
    pub cons_count: f64,
    pub audit_count: f64,
    pub fatal_count: f64,
    pub total_points: f64,
    pub achieve_points: f64,
    pub productivity_pct: f64,
}

/// Exact-match identity of a record across every schema column.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RecordKey {
    date: Option<Date>,
    employee_name: String,
    numbers: [u64; 15],
}

impl CallRecord {
    /// Mutable access to a numeric or percentage field.
    ///
    /// Returns `None` for the date and employee-name columns.
    pub fn numeric_mut(&mut self, column: Column) -> Option<&mut f64> {
        let slot = match column {
            Column::Date | Column::EmployeeName => return None,
            Column::OverallCalls => &mut self.overall_calls,
            Column::CompletedCalls => &mut self.completed_calls,
            Column::CompletedPct => &mut self.completed_pct,
            Column::IncomingCalls => &mut self.incoming_calls,
            Column::IncomingCompletedCalls => &mut self.incoming_completed_calls,
            Column::IncomingPct => &mut self.incoming_pct,
            Column::OutboundCalls => &mut self.outbound_calls,
            Column::MissedCalls => &mut self.missed_calls,
            Column::LoginHours => &mut self.login_hours,
            Column::ConsCount => &mut self.cons_count,
            Column::AuditCount => &mut self.audit_count,
            Column::FatalCount => &mut self.fatal_count,
            Column::TotalPoints => &mut self.total_points,
            Column::AchievePoints => &mut self.achieve_points,
            Column::ProductivityPct => &mut self.productivity_pct,
        };
        Some(slot)
    }

    #[must_use]
    pub fn numeric(&self, column: Column) -> Option<f64> {
        match column {
            Column::Date | Column::EmployeeName => None,
            Column::OverallCalls => Some(self.overall_calls),
            Column::CompletedCalls => Some(self.completed_calls),
            Column::CompletedPct => Some(self.completed_pct),
            Column::IncomingCalls => Some(self.incoming_calls),
            Column::IncomingCompletedCalls => Some(self.incoming_completed_calls),
            Column::IncomingPct => Some(self.incoming_pct),
            Column::OutboundCalls => Some(self.outbound_calls),
            Column::MissedCalls => Some(self.missed_calls),
            Column::LoginHours => Some(self.login_hours),
            Column::ConsCount => Some(self.cons_count),
            Column::AuditCount => Some(self.audit_count),
            Column::FatalCount => Some(self.fatal_count),
            Column::TotalPoints => Some(self.total_points),
            Column::AchievePoints => Some(self.achieve_points),
            Column::ProductivityPct => Some(self.productivity_pct),
        }
    }

    #[must_use]
    pub fn dedup_key(&self) -> RecordKey {
        let mut numbers = [0_u64; 15];
        let numeric_columns = Column::ALL.iter().filter_map(|column| self.numeric(*column));
        for (slot, value) in numbers.iter_mut().zip(numeric_columns) {
            // -0.0 and 0.0 compare equal, so they must share a key
            *slot = if value == 0.0 { 0 } else { value.to_bits() };
        }
        RecordKey { date: self.date, employee_name: self.employee_name.clone(), numbers }
    }
}

/// Rows that can be written out as a sheet or CSV file.
pub trait TabularRows {
    fn headers() -> Vec<&'static str>;
    fn cells(&self) -> Vec<Cell>;
}

impl TabularRows for CallRecord {
    fn headers() -> Vec<&'static str> {
        canonical_headers()
    }

    fn cells(&self) -> Vec<Cell> {
        Column::ALL
            .iter()
            .map(|column| match column {
                Column::Date => self.date.map_or(Cell::Empty, Cell::Date),
                Column::EmployeeName => Cell::Text(self.employee_name.clone()),
                other => Cell::Number(self.numeric(*other).unwrap_or_default()),
            })
            .collect()
    }
}

pub(crate) mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::macros::format_description;
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.collect_str(date),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| {
            Date::parse(&value, format_description!("[year]-[month]-[day]"))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
