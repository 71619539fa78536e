use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use call_metrics_core::{
    apply_manual_counts, merge_dedup, normalize, CallRecord, ManualEntry, RawTable,
};
use serde::Serialize;

mod export;
mod sheet;

pub use export::{
    export_master, export_summary, summary_file_name, ExportFormat, MASTER_SHEET_NAME,
    SUMMARY_SHEET_NAME,
};
pub use sheet::{
    read_csv, read_csv_from, read_upload, read_workbook, write_atomic, write_csv, write_xlsx,
};

pub const DEFAULT_MASTER_PATH: &str = "data/master_data.xlsx";

/// The persisted master dataset: one workbook, read whole and rewritten whole.
///
/// There is no locking. Two processes appending at the same time can each
/// read the same snapshot and the later write silently discards the earlier
/// one's rows; callers must ensure a single writer.
#[derive(Debug, Clone)]
pub struct MasterStore {
    path: PathBuf,
}

/// Result of a lenient read: parse failures become a warning and an empty table.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct MasterRead {
    pub records: Vec<CallRecord>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppendSummary {
    pub incoming_rows: usize,
    pub duplicates_dropped: usize,
    pub total_rows: usize,
    #[serde(skip)]
    pub records: Vec<CallRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ManualUpdate {
    pub updated_rows: usize,
    #[serde(skip)]
    pub records: Vec<CallRecord>,
}

impl MasterStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and re-normalize the master table.
    ///
    /// A missing file is an empty table. An unreadable file is also an empty
    /// table, with the failure logged and returned in [`MasterRead::warning`].
    #[must_use]
    pub fn read(&self) -> MasterRead {
        match self.try_read() {
            Ok(records) => MasterRead { records, warning: None },
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "failed to read master file"
                );
                MasterRead {
                    records: Vec::new(),
                    warning: Some(format!("failed to read master file: {err:#}")),
                }
            }
        }
    }

    /// Like [`MasterStore::read`], but a corrupt file is an error.
    ///
    /// # Errors
    /// Returns an error when the master file exists but cannot be parsed.
    pub fn try_read(&self) -> Result<Vec<CallRecord>> {
        if !self.exists() {
            tracing::debug!(path = %self.path.display(), "master file absent; starting empty");
            return Ok(Vec::new());
        }
        let raw = read_workbook(&self.path)?;
        Ok(normalize(&raw))
    }

    /// Normalize `incoming`, merge it after the persisted rows, drop exact
    /// duplicates (keeping the later copy), persist, and return the result.
    ///
    /// An existing master file that cannot be parsed aborts the append rather
    /// than being replaced by the incoming rows alone.
    ///
    /// # Errors
    /// Returns an error when the existing file is unreadable or the write fails.
    pub fn append(&self, incoming: &RawTable) -> Result<AppendSummary> {
        let existing = self
            .try_read()
            .context("refusing to append: the existing master file could not be read")?;
        let incoming = normalize(incoming);
        let incoming_rows = incoming.len();
        let before = existing.len() + incoming_rows;

        let records = merge_dedup(existing, incoming);
        self.overwrite(&records)?;

        let summary = AppendSummary {
            incoming_rows,
            duplicates_dropped: before - records.len(),
            total_rows: records.len(),
            records,
        };
        tracing::info!(
            incoming = summary.incoming_rows,
            dropped = summary.duplicates_dropped,
            total = summary.total_rows,
            "appended upload to master"
        );
        Ok(summary)
    }

    /// Write `records` verbatim, replacing the whole file.
    ///
    /// No normalization or de-duplication happens here. The previous file is
    /// left intact if the write fails.
    ///
    /// # Errors
    /// Returns an error when the workbook cannot be rendered or written.
    pub fn overwrite(&self, records: &[CallRecord]) -> Result<()> {
        let bytes = write_xlsx(records, MASTER_SHEET_NAME)?;
        write_atomic(&self.path, &bytes)
            .with_context(|| format!("failed to save master file {}", self.path.display()))?;
        tracing::debug!(rows = records.len(), path = %self.path.display(), "saved master file");
        Ok(())
    }

    /// Set the manual counters for one employee and date, then persist.
    ///
    /// # Errors
    /// Returns an error when nothing matches, the entry is invalid, or I/O fails.
    /// The file is not rewritten unless at least one row changed.
    pub fn update_manual_counts(&self, entry: &ManualEntry) -> Result<ManualUpdate> {
        let mut records = self.try_read()?;
        let updated_rows = apply_manual_counts(&mut records, entry)?;
        self.overwrite(&records)?;
        tracing::info!(
            employee = %entry.employee_name,
            date = %entry.date,
            updated_rows,
            "applied manual counts"
        );
        Ok(ManualUpdate { updated_rows, records })
    }
}
