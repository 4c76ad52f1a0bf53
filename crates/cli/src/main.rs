mod logging;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use logging::{init_logging, logging_installed, LogFile};
use std::path::PathBuf;
use std::process::ExitCode;
use timeline_version_core::{
    app_paths, load_config, load_config_from, load_snapshot, run_batch, save_snapshot, AppConfig,
    BatchOptions, BatchSummary, Pattern, ResolveOptions, SnapshotPool, TracingReporter,
    DATE_FORMAT,
};

#[derive(Debug, Parser)]
#[command(name = "timeline-version-up")]
#[command(about = "選択したタイムラインをパターンに従ってリネーム・バージョンアップします")]
struct Cli {
    /// 例: "{version+1}", "{original}_{current_date}", "Reel_{n}"
    pattern: String,
    /// プロジェクトスナップショット (JSON)
    #[arg(long)]
    project: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// 実行日の代わりに使う日付 (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    #[arg(long, default_value_t = false)]
    stamp_date: bool,
    #[arg(long, default_value_t = false)]
    no_relocate: bool,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long, default_value_t = false, conflicts_with = "log_file")]
    no_log_file: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

/// Errors raised before the subscriber is installed (config loading) go straight to stderr.
fn report_fatal(err: &anyhow::Error) {
    if logging_installed() {
        tracing::error!("{err:#}");
    } else {
        eprintln!("ERROR: {err:#}");
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    init_logging(log_target(&cli, &config).as_ref())?;

    tracing::info!("パターン: {}", cli.pattern);
    let pattern = Pattern::parse(&cli.pattern)?;

    let project_path = cli
        .project
        .clone()
        .or_else(|| config.project_file.clone())
        .context("プロジェクトが指定されていません (--project)")?;
    let snapshot = load_snapshot(&project_path)?;
    tracing::info!("プロジェクト: {}", snapshot.name);

    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let options = BatchOptions {
        today,
        resolve: ResolveOptions {
            stamp_date: cli.stamp_date,
        },
        relocate_duplicates: config.relocate_duplicates && !cli.no_relocate,
        version_folder_prefix: config.version_folder_prefix.clone(),
        settle: config.settle_policy(),
        dry_run: cli.dry_run,
    };

    let mut pool = SnapshotPool::new(snapshot);
    let report = run_batch(&mut pool, &pattern, &options, &mut TracingReporter)?;
    print_summary(&report.summary);

    if cli.dry_run {
        tracing::info!("dry-runモード: プロジェクトは変更していません");
    } else {
        save_snapshot(&project_path, pool.snapshot())?;
    }
    Ok(())
}

fn log_target(cli: &Cli, config: &AppConfig) -> Option<LogFile> {
    if cli.no_log_file {
        return None;
    }
    let path = match &cli.log_file {
        Some(path) => path.clone(),
        None => {
            let paths = app_paths().ok()?;
            config.resolved_log_file(&paths)?
        }
    };
    Some(LogFile {
        path,
        max_bytes: config.log_max_bytes,
        backup_count: config.log_backup_count,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| format!("日付は YYYY-MM-DD 形式で指定してください: {err}"))
}

fn print_summary(summary: &BatchSummary) {
    tracing::info!("{}件を処理しました:", summary.processed);
    tracing::info!("- リネーム: {}", summary.succeeded());
    tracing::info!("- スキップ: {}", summary.skipped());
    tracing::info!("- 失敗: {}", summary.failed);
    tracing::info!(
        "内訳: renamed={} duplicated={} not_timeline={} no_version={} pattern_error={}",
        summary.renamed,
        summary.duplicated,
        summary.skipped_not_timeline,
        summary.skipped_no_version,
        summary.skipped_pattern_error
    );
}
