use serde::{Deserialize, Serialize};
use time::Date;

use crate::table::CallRecord;
use crate::CoreError;

/// Quality-audit counters that are entered by hand after upload.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ManualCounts {
    pub cons_count: f64,
    pub audit_count: f64,
    pub fatal_count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub employee_name: String,
    pub date: Date,
    pub counts: ManualCounts,
}

impl ManualEntry {
    /// Reject negative or non-finite counters before they reach the master file.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] for an empty employee name or a bad counter.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.employee_name.trim().is_empty() {
            return Err(CoreError::Validation("employee name MUST be provided".to_string()));
        }
        for (label, value) in [
            ("cons_count", self.counts.cons_count),
            ("audit_count", self.counts.audit_count),
            ("fatal_count", self.counts.fatal_count),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::Validation(format!(
                    "{label} MUST be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    fn matches(&self, record: &CallRecord) -> bool {
        record.employee_name == self.employee_name && record.date == Some(self.date)
    }
}

/// Overwrite the manual counters on every row matching the entry's employee and date.
///
/// Returns the number of rows updated. Prior values are not retained.
///
/// # Errors
/// Returns [`CoreError::NoMatch`] when no row matches, or a validation error.
pub fn apply_manual_counts(
    records: &mut [CallRecord],
    entry: &ManualEntry,
) -> Result<usize, CoreError> {
    entry.validate()?;
    let mut updated = 0_usize;
    for record in records.iter_mut().filter(|record| entry.matches(record)) {
        record.cons_count = entry.counts.cons_count;
        record.audit_count = entry.counts.audit_count;
        record.fatal_count = entry.counts.fatal_count;
        updated += 1;
    }
    if updated == 0 {
        return Err(CoreError::NoMatch {
            employee_name: entry.employee_name.clone(),
            date: entry.date,
        });
    }
    Ok(updated)
}

/// Summed counters over the rows for one employee and date, used to prefill an edit.
#[must_use]
pub fn current_manual_counts(
    records: &[CallRecord],
    employee_name: &str,
    date: Date,
) -> Option<ManualCounts> {
    let mut matched = records
        .iter()
        .filter(|record| record.employee_name == employee_name && record.date == Some(date))
        .peekable();
    matched.peek()?;
    Some(matched.fold(ManualCounts::default(), |mut counts, record| {
        counts.cons_count += record.cons_count;
        counts.audit_count += record.audit_count;
        counts.fatal_count += record.fatal_count;
        counts
    }))
}
