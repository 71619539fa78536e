use std::path::{Path, PathBuf};

use anyhow::Result;
use call_metrics_core::{CallRecord, TabularRows};
use serde::{Deserialize, Serialize};

use crate::sheet::{write_atomic, write_csv, write_xlsx};

pub const MASTER_SHEET_NAME: &str = "Master";
pub const SUMMARY_SHEET_NAME: &str = "Summary";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

/// File name for a summary export, e.g. `monthly_summary_2024-01.xlsx`.
#[must_use]
pub fn summary_file_name(scope: &str, format: ExportFormat) -> String {
    format!("monthly_summary_{scope}.{}", format.extension())
}

/// Write the full master table as a workbook at `out`.
///
/// # Errors
/// Returns an error when the workbook cannot be built or written.
pub fn export_master(records: &[CallRecord], out: &Path) -> Result<()> {
    let bytes = write_xlsx(records, MASTER_SHEET_NAME)?;
    write_atomic(out, &bytes)?;
    tracing::info!(rows = records.len(), path = %out.display(), "exported master table");
    Ok(())
}

/// Write a computed summary into `out_dir`, naming the file after `scope`.
///
/// # Errors
/// Returns an error when the file cannot be rendered or written.
pub fn export_summary<T: TabularRows>(
    rows: &[T],
    format: ExportFormat,
    out_dir: &Path,
    scope: &str,
) -> Result<PathBuf> {
    let path = out_dir.join(summary_file_name(scope, format));
    let bytes = match format {
        ExportFormat::Xlsx => write_xlsx(rows, SUMMARY_SHEET_NAME)?,
        ExportFormat::Csv => write_csv(rows)?,
    };
    write_atomic(&path, &bytes)?;
    tracing::info!(rows = rows.len(), path = %path.display(), "exported summary");
    Ok(path)
}
