use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use call_metrics_core::{
    available_months, current_manual_counts, dashboard_kpis, employees, filter_by_date,
    filter_by_employee, filter_by_month, normalize, sort_by_date_desc, summarize_by_employee,
    summarize_daily, CallRecord, Column, ManualCounts, ManualEntry, YearMonth,
};
use call_metrics_store_xlsx::{
    export_master, export_summary, read_upload, ExportFormat, MasterStore, DEFAULT_MASTER_PATH,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use time::macros::format_description;
use time::Date;
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const UPLOAD_TAIL_ROWS: usize = 10;
const NO_DATA_MESSAGE: &str = "No master data found. Upload a sheet first.";

#[derive(Debug, Parser)]
#[command(name = "cm")]
#[command(about = "Call-center agent metrics: upload, review, and export")]
struct Cli {
    #[arg(long, default_value = DEFAULT_MASTER_PATH)]
    master: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Append a daily .xlsx or .csv report to the master data.
    Upload(UploadArgs),
    /// Show how a report would normalize, without saving it.
    Preview(PreviewArgs),
    /// List master rows, newest first.
    View(ViewArgs),
    /// KPIs, per-agent summary, and daily trend.
    Dashboard(DashboardArgs),
    /// Inspect or set the hand-entered audit counters.
    Manual {
        #[command(subcommand)]
        command: ManualCommand,
    },
    /// Write the master table or a monthly summary to disk.
    Export {
        #[command(subcommand)]
        command: ExportCommand,
    },
    /// List the months or employees present in the master data.
    List {
        #[command(subcommand)]
        command: ListCommand,
    },
}

#[derive(Debug, Args)]
struct UploadArgs {
    #[arg(long)]
    file: PathBuf,
}

#[derive(Debug, Args)]
struct PreviewArgs {
    #[arg(long)]
    file: PathBuf,
    #[arg(long, default_value_t = 5)]
    limit: usize,
}

#[derive(Debug, Args)]
struct ViewArgs {
    #[arg(long)]
    employee: Option<String>,
    #[arg(long)]
    date: Option<String>,
}

#[derive(Debug, Args)]
struct DashboardArgs {
    #[arg(long)]
    month: Option<String>,
    #[arg(long)]
    employee: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ManualCommand {
    /// Show current counters for one employee and date.
    Show(ManualSelectArgs),
    /// Overwrite counters on every row for one employee and date.
    Set(ManualSetArgs),
}

#[derive(Debug, Args)]
struct ManualSelectArgs {
    #[arg(long)]
    employee: String,
    #[arg(long)]
    date: String,
}

#[derive(Debug, Args)]
struct ManualSetArgs {
    #[command(flatten)]
    select: ManualSelectArgs,
    /// Defaults to the current value when omitted.
    #[arg(long)]
    cons: Option<f64>,
    #[arg(long)]
    audit: Option<f64>,
    #[arg(long)]
    fatal: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum ExportCommand {
    /// Copy the full master table to a workbook.
    Master(ExportMasterArgs),
    /// Write the per-employee summary for one month.
    Summary(ExportSummaryArgs),
}

#[derive(Debug, Args)]
struct ExportMasterArgs {
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct ExportSummaryArgs {
    #[arg(long)]
    month: String,
    #[arg(long, value_enum, default_value_t = FormatArg::Xlsx)]
    format: FormatArg,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    /// Months with data, as YYYY-MM.
    Months,
    /// Distinct employee names.
    Employees,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Xlsx,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Xlsx => Self::Xlsx,
            FormatArg::Csv => Self::Csv,
        }
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let store = MasterStore::new(&cli.master);
    tracing::debug!(master = %store.path().display(), "using master file");

    match cli.command {
        Command::Upload(args) => run_upload(&args, &store),
        Command::Preview(args) => run_preview(&args),
        Command::View(args) => run_view(&args, &store),
        Command::Dashboard(args) => run_dashboard(&args, &store),
        Command::Manual { command } => run_manual(command, &store),
        Command::Export { command } => run_export(command, &store),
        Command::List { command } => run_list(&command, &store),
    }
}

fn run_upload(args: &UploadArgs, store: &MasterStore) -> Result<()> {
    let upload = read_upload(&args.file)
        .with_context(|| format!("failed to read uploaded file {}", args.file.display()))?;
    let summary = store.append(&upload)?;
    let tail_start = summary.records.len().saturating_sub(UPLOAD_TAIL_ROWS);
    emit_json(serde_json::json!({
        "file": args.file,
        "master": store.path(),
        "incoming_rows": summary.incoming_rows,
        "duplicates_dropped": summary.duplicates_dropped,
        "total_rows": summary.total_rows,
        "tail": &summary.records[tail_start..]
    }))
}

fn run_preview(args: &PreviewArgs) -> Result<()> {
    let upload = read_upload(&args.file)
        .with_context(|| format!("failed to read uploaded file {}", args.file.display()))?;
    let records = normalize(&upload);
    let unrecognized = upload
        .headers
        .iter()
        .filter(|header| Column::from_header(header).is_none())
        .collect::<Vec<_>>();
    emit_json(serde_json::json!({
        "file": args.file,
        "rows": records.len(),
        "ignored_columns": unrecognized,
        "preview": records.iter().take(args.limit).collect::<Vec<_>>()
    }))
}

fn run_view(args: &ViewArgs, store: &MasterStore) -> Result<()> {
    let read = store.read();
    let mut rows = read.records;
    if let Some(employee) = args.employee.as_deref() {
        rows = filter_by_employee(&rows, employee);
    }
    if let Some(raw) = args.date.as_deref() {
        rows = filter_by_date(&rows, parse_date_arg(raw)?);
    }
    sort_by_date_desc(&mut rows);
    emit_json(serde_json::json!({
        "total_rows": rows.len(),
        "rows": rows,
        "warning": read.warning
    }))
}

fn run_dashboard(args: &DashboardArgs, store: &MasterStore) -> Result<()> {
    let month = args.month.as_deref().map(parse_month_arg).transpose()?;
    let read = store.read();
    if read.records.is_empty() {
        return emit_json(serde_json::json!({
            "message": NO_DATA_MESSAGE,
            "warning": read.warning
        }));
    }

    let mut rows = read.records;
    if let Some(month) = month {
        rows = filter_by_month(&rows, month.year, month.month);
    }
    if let Some(employee) = args.employee.as_deref() {
        rows = filter_by_employee(&rows, employee);
    }

    emit_json(serde_json::json!({
        "filters": {
            "month": month,
            "employee": args.employee
        },
        "rows": rows.len(),
        "kpis": dashboard_kpis(&rows),
        "agent_summary": summarize_by_employee(&rows),
        "daily_trend": summarize_daily(&rows),
        "warning": read.warning
    }))
}

fn run_manual(command: ManualCommand, store: &MasterStore) -> Result<()> {
    match command {
        ManualCommand::Show(args) => run_manual_show(&args, store),
        ManualCommand::Set(args) => run_manual_set(&args, store),
    }
}

fn run_manual_show(args: &ManualSelectArgs, store: &MasterStore) -> Result<()> {
    let date = parse_date_arg(&args.date)?;
    let read = store.read();
    let matching = matching_rows(&read.records, &args.employee, date);
    let current = current_manual_counts(&read.records, &args.employee, date);
    let message = current.is_none().then(|| {
        format!("nothing to update: no rows for employee `{}` on {date}", args.employee)
    });
    emit_json(serde_json::json!({
        "employee": args.employee,
        "date": date.to_string(),
        "matched_rows": matching.len(),
        "current": current,
        "rows": matching,
        "message": message,
        "warning": read.warning
    }))
}

fn run_manual_set(args: &ManualSetArgs, store: &MasterStore) -> Result<()> {
    let date = parse_date_arg(&args.select.date)?;
    let existing = store.try_read()?;
    let current = current_manual_counts(&existing, &args.select.employee, date).unwrap_or_default();
    let entry = ManualEntry {
        employee_name: args.select.employee.clone(),
        date,
        counts: ManualCounts {
            cons_count: args.cons.unwrap_or(current.cons_count),
            audit_count: args.audit.unwrap_or(current.audit_count),
            fatal_count: args.fatal.unwrap_or(current.fatal_count),
        },
    };

    let update = store.update_manual_counts(&entry)?;
    emit_json(serde_json::json!({
        "employee": entry.employee_name,
        "date": date.to_string(),
        "updated_rows": update.updated_rows,
        "counts": entry.counts,
        "rows": matching_rows(&update.records, &entry.employee_name, date)
    }))
}

fn matching_rows(records: &[CallRecord], employee: &str, date: Date) -> Vec<CallRecord> {
    filter_by_date(&filter_by_employee(records, employee), date)
}

fn run_export(command: ExportCommand, store: &MasterStore) -> Result<()> {
    match command {
        ExportCommand::Master(args) => {
            let read = store.read();
            if read.records.is_empty() {
                return emit_json(serde_json::json!({
                    "written": false,
                    "message": NO_DATA_MESSAGE,
                    "warning": read.warning
                }));
            }
            export_master(&read.records, &args.out)?;
            emit_json(serde_json::json!({
                "written": true,
                "path": args.out,
                "rows": read.records.len()
            }))
        }
        ExportCommand::Summary(args) => {
            let month = parse_month_arg(&args.month)?;
            let read = store.read();
            let rows = filter_by_month(&read.records, month.year, month.month);
            if rows.is_empty() {
                return emit_json(serde_json::json!({
                    "written": false,
                    "month": month,
                    "message": "No data for this month.",
                    "warning": read.warning
                }));
            }
            let summary = summarize_by_employee(&rows);
            let path =
                export_summary(&summary, args.format.into(), &args.out_dir, &month.to_string())?;
            emit_json(serde_json::json!({
                "written": true,
                "month": month,
                "path": path,
                "employees": summary.len(),
                "summary": summary
            }))
        }
    }
}

fn run_list(command: &ListCommand, store: &MasterStore) -> Result<()> {
    let read = store.read();
    match command {
        ListCommand::Months => emit_json(serde_json::json!({
            "months": available_months(&read.records),
            "warning": read.warning
        })),
        ListCommand::Employees => emit_json(serde_json::json!({
            "employees": employees(&read.records),
            "warning": read.warning
        })),
    }
}

fn parse_date_arg(raw: &str) -> Result<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|err| anyhow!("invalid date `{raw}`; expected YYYY-MM-DD: {err}"))
}

fn parse_month_arg(raw: &str) -> Result<YearMonth> {
    raw.parse::<YearMonth>().map_err(anyhow::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn every_subcommand_has_help_text() {
        use clap::CommandFactory;

        fn walk(command: &clap::Command, path: &str) {
            for sub in command.get_subcommands().filter(|sub| sub.get_name() != "help") {
                let name = format!("{path} {}", sub.get_name());
                assert!(sub.get_about().is_some(), "`{name}` has no help text");
                walk(sub, &name);
            }
        }
        walk(&Cli::command(), "cm");
    }

    #[test]
    fn date_args_require_iso_layout() {
        assert!(parse_date_arg("2024-01-05").is_ok());
        assert!(parse_date_arg("01/05/2024").is_err());
    }

    #[test]
    fn month_args_round_trip() -> Result<()> {
        assert_eq!(parse_month_arg("2024-02")?.to_string(), "2024-02");
        assert!(parse_month_arg("2024-00").is_err());
        Ok(())
    }

    #[test]
    fn scalar_payloads_are_wrapped_with_contract_version() {
        let wrapped = with_contract_version(serde_json::json!([1, 2]));
        assert_eq!(wrapped["contract_version"], CLI_CONTRACT_VERSION);
        assert_eq!(wrapped["payload"], serde_json::json!([1, 2]));
    }
}
