use serde::{Deserialize, Serialize};

/// How a column's cells are coerced during normalization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Date,
    Text,
    Numeric,
    Percentage,
}

/// One column of the canonical call-metrics schema.
///
/// Declaration order is the canonical column order; [`Column::ALL`] mirrors it.
/// Adding a variant is a breaking change for every persisted master file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Date,
    EmployeeName,
    OverallCalls,
    CompletedCalls,
    CompletedPct,
    IncomingCalls,
    IncomingCompletedCalls,
    IncomingPct,
    OutboundCalls,
    MissedCalls,
    LoginHours,
    ConsCount,
    AuditCount,
    FatalCount,
    TotalPoints,
    AchievePoints,
    ProductivityPct,
}

pub const COLUMN_COUNT: usize = 17;

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Self::Date,
        Self::EmployeeName,
        Self::OverallCalls,
        Self::CompletedCalls,
        Self::CompletedPct,
        Self::IncomingCalls,
        Self::IncomingCompletedCalls,
        Self::IncomingPct,
        Self::OutboundCalls,
        Self::MissedCalls,
        Self::LoginHours,
        Self::ConsCount,
        Self::AuditCount,
        Self::FatalCount,
        Self::TotalPoints,
        Self::AchievePoints,
        Self::ProductivityPct,
    ];

    /// Header text used in uploaded sheets and in the persisted master file.
    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::EmployeeName => "Employee Name",
            Self::OverallCalls => "Overall Calls",
            Self::CompletedCalls => "Completed Calls",
            Self::CompletedPct => "Completed %",
            Self::IncomingCalls => "Incoming Calls",
            Self::IncomingCompletedCalls => "Incoming completed call",
            Self::IncomingPct => "Incoming %",
            Self::OutboundCalls => "Outbound Calls",
            Self::MissedCalls => "Missed Calls",
            Self::LoginHours => "Login Hours",
            Self::ConsCount => "Cons Count",
            Self::AuditCount => "Audit Count",
            Self::FatalCount => "Fatal Count",
            Self::TotalPoints => "Total Points",
            Self::AchievePoints => "Achieve Points",
            Self::ProductivityPct => "Productivity%",
        }
    }

    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::EmployeeName => "employee_name",
            Self::OverallCalls => "overall_calls",
            Self::CompletedCalls => "completed_calls",
            Self::CompletedPct => "completed_pct",
            Self::IncomingCalls => "incoming_calls",
            Self::IncomingCompletedCalls => "incoming_completed_calls",
            Self::IncomingPct => "incoming_pct",
            Self::OutboundCalls => "outbound_calls",
            Self::MissedCalls => "missed_calls",
            Self::LoginHours => "login_hours",
            Self::ConsCount => "cons_count",
            Self::AuditCount => "audit_count",
            Self::FatalCount => "fatal_count",
            Self::TotalPoints => "total_points",
            Self::AchievePoints => "achieve_points",
            Self::ProductivityPct => "productivity_pct",
        }
    }

    #[must_use]
    pub fn kind(self) -> ColumnKind {
        match self {
            Self::Date => ColumnKind::Date,
            Self::EmployeeName => ColumnKind::Text,
            Self::CompletedPct | Self::IncomingPct | Self::ProductivityPct => {
                ColumnKind::Percentage
            }
            _ => ColumnKind::Numeric,
        }
    }

    /// Resolve an input header, accepting either the sheet header or the field name.
    #[must_use]
    pub fn from_header(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|column| column.header() == trimmed || column.field_name() == trimmed)
    }

    /// Position of this column in canonical order.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[must_use]
pub fn canonical_headers() -> Vec<&'static str> {
    Column::ALL.iter().map(|column| column.header()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_columns_follow_declaration_order() {
        for (position, column) in Column::ALL.iter().enumerate() {
            assert_eq!(column.index(), position);
        }
    }

    #[test]
    fn headers_resolve_in_both_spellings() {
        assert_eq!(Column::from_header("Productivity%"), Some(Column::ProductivityPct));
        assert_eq!(Column::from_header("  Employee Name "), Some(Column::EmployeeName));
        assert_eq!(Column::from_header("incoming_completed_calls"), Some(Column::IncomingCompletedCalls));
        assert_eq!(Column::from_header("employee name"), None);
        assert_eq!(Column::from_header("Shift"), None);
    }

    #[test]
    fn percentage_columns_are_exactly_three() {
        let percentages = Column::ALL
            .iter()
            .filter(|column| column.kind() == ColumnKind::Percentage)
            .count();
        assert_eq!(percentages, 3);
        assert_eq!(Column::Date.kind(), ColumnKind::Date);
        assert_eq!(Column::EmployeeName.kind(), ColumnKind::Text);
        assert_eq!(Column::LoginHours.kind(), ColumnKind::Numeric);
    }
}
