use crate::catalog::{classify_item, CatalogError, ItemKind, MediaPool};
use crate::resolver::{resolve, Resolution, ResolveContext, ResolveError, ResolveOptions};
use crate::template::Pattern;
use crate::version::format_version;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const MIN_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameOutcome {
    Renamed,
    DuplicatedAndRelocated,
    SkippedNotTimeline,
    SkippedNoVersion,
    SkippedPatternError,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReport {
    /// 1-based position in the selection.
    pub index: usize,
    pub kind: ItemKind,
    pub original_name: Option<String>,
    pub new_name: Option<String>,
    pub outcome: RenameOutcome,
    /// Only meaningful for duplicates: whether the copy ended up in its version folder.
    pub relocated: bool,
    /// `false` for dry runs.
    pub applied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub renamed: usize,
    pub duplicated: usize,
    pub skipped_not_timeline: usize,
    pub skipped_no_version: usize,
    pub skipped_pattern_error: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: RenameOutcome) {
        self.processed += 1;
        match outcome {
            RenameOutcome::Renamed => self.renamed += 1,
            RenameOutcome::DuplicatedAndRelocated => self.duplicated += 1,
            RenameOutcome::SkippedNotTimeline => self.skipped_not_timeline += 1,
            RenameOutcome::SkippedNoVersion => self.skipped_no_version += 1,
            RenameOutcome::SkippedPatternError => self.skipped_pattern_error += 1,
            RenameOutcome::Failed => self.failed += 1,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.renamed + self.duplicated
    }

    pub fn skipped(&self) -> usize {
        self.skipped_not_timeline + self.skipped_no_version + self.skipped_pattern_error
    }

    /// Items that reached pattern resolution.
    pub fn attempted(&self) -> usize {
        self.processed - self.skipped_not_timeline
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub summary: BatchSummary,
}

/// How long to wait for a duplicate to show up in the host catalog.
///
/// Sleeps `initial_delay`, then polls, doubling the delay until `max_wait` has passed.
/// Setting both to the same value gives a single fixed pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub initial_delay: Duration,
    pub max_wait: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_wait: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub today: NaiveDate,
    pub resolve: ResolveOptions,
    pub relocate_duplicates: bool,
    pub version_folder_prefix: String,
    pub settle: SettlePolicy,
    pub dry_run: bool,
}

impl BatchOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            resolve: ResolveOptions::default(),
            relocate_duplicates: true,
            version_folder_prefix: String::new(),
            settle: SettlePolicy::default(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("アイテムが選択されていません")]
    EmptySelection,
    #[error("選択アイテムを取得できませんでした: {0}")]
    Selection(#[from] CatalogError),
}

/// Receives each item's report as soon as it is final.
pub trait Reporter {
    fn item_finished(&mut self, report: &ItemReport);
}

/// Default reporter: one log line per item.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn item_finished(&mut self, report: &ItemReport) {
        let original = report.original_name.as_deref().unwrap_or("?");
        let new_name = report.new_name.as_deref().unwrap_or("");
        let prefix = if report.applied { "" } else { "[dry-run] " };
        match report.outcome {
            RenameOutcome::Renamed => {
                tracing::info!("{prefix}リネーム: '{original}' → '{new_name}'")
            }
            RenameOutcome::DuplicatedAndRelocated if report.relocated || !report.applied => {
                tracing::info!("{prefix}複製: '{original}' → '{new_name}'")
            }
            RenameOutcome::DuplicatedAndRelocated => {
                tracing::info!("複製: '{original}' → '{new_name}' (フォルダ移動なし)")
            }
            RenameOutcome::SkippedNotTimeline => tracing::warn!(
                "アイテム {} はタイムラインではありません (種別: {:?})、スキップします",
                report.index,
                report.kind
            ),
            RenameOutcome::SkippedNoVersion => {
                tracing::warn!("バージョン番号がないためスキップ: '{original}'")
            }
            RenameOutcome::SkippedPatternError => {
                tracing::error!("パターンを適用できないためスキップ: '{original}'")
            }
            RenameOutcome::Failed => {
                tracing::error!("アイテム {} の処理に失敗しました: '{original}'", report.index)
            }
        }
    }
}

/// Runs the pattern over the current selection, one item at a time.
///
/// Only an unreadable or empty selection aborts the run. Everything that goes wrong
/// with a single item is recorded in that item's report.
pub fn run_batch<P: MediaPool>(
    pool: &mut P,
    pattern: &Pattern,
    options: &BatchOptions,
    reporter: &mut dyn Reporter,
) -> Result<BatchReport, BatchError> {
    let selection = pool.selected_items()?;
    if selection.is_empty() {
        return Err(BatchError::EmptySelection);
    }
    tracing::info!("{}件のアイテムが選択されています", selection.len());

    let mut items = Vec::with_capacity(selection.len());
    let mut summary = BatchSummary::default();

    for (offset, item) in selection.iter().enumerate() {
        let index = offset + 1;
        let report = process_item(pool, item, index, pattern, options);
        summary.record(report.outcome);
        reporter.item_finished(&report);
        items.push(report);
    }

    Ok(BatchReport { items, summary })
}

fn process_item<P: MediaPool>(
    pool: &mut P,
    item: &P::Item,
    index: usize,
    pattern: &Pattern,
    options: &BatchOptions,
) -> ItemReport {
    let kind = classify_item(&*pool, item);
    let mut report = ItemReport {
        index,
        kind,
        original_name: None,
        new_name: None,
        outcome: RenameOutcome::Failed,
        relocated: false,
        applied: !options.dry_run,
    };

    if kind != ItemKind::Timeline {
        report.original_name = pool.item_name(item).ok();
        report.outcome = RenameOutcome::SkippedNotTimeline;
        return report;
    }

    let original = match pool.item_name(item) {
        Ok(name) => name,
        Err(err) => {
            tracing::error!("アイテム {index} の名前を取得できませんでした: {err}");
            return report;
        }
    };
    report.original_name = Some(original.clone());

    let ctx = ResolveContext {
        original: &original,
        index,
        today: options.today,
    };
    let resolution = match resolve(pattern, &ctx, &options.resolve) {
        Ok(resolution) => resolution,
        Err(err) => {
            report.outcome = match err {
                ResolveError::NoVersion(_) => RenameOutcome::SkippedNoVersion,
                ResolveError::VersionOutOfRange(_)
                | ResolveError::UnresolvedPlaceholder(_)
                | ResolveError::EmptyName => {
                    tracing::error!("パターン処理エラー: {err}");
                    RenameOutcome::SkippedPatternError
                }
            };
            return report;
        }
    };
    tracing::info!("新しい名前: {}", resolution.name);
    report.new_name = Some(resolution.name.to_string());

    if options.dry_run {
        report.outcome = planned_outcome(&resolution);
        return report;
    }

    match apply_resolution(pool, item, &original, &resolution, options) {
        Ok((outcome, relocated)) => {
            report.outcome = outcome;
            report.relocated = relocated;
        }
        Err(err) => {
            tracing::error!("アイテム {index} ('{original}') の処理中にエラー: {err}");
        }
    }
    report
}

fn planned_outcome(resolution: &Resolution) -> RenameOutcome {
    if resolution.duplicate {
        RenameOutcome::DuplicatedAndRelocated
    } else {
        RenameOutcome::Renamed
    }
}

fn apply_resolution<P: MediaPool>(
    pool: &mut P,
    item: &P::Item,
    original: &str,
    resolution: &Resolution,
    options: &BatchOptions,
) -> Result<(RenameOutcome, bool), CatalogError> {
    let new_name = resolution.name.as_str();

    if !resolution.duplicate {
        if pool.rename_item(item, new_name)? {
            return Ok((RenameOutcome::Renamed, false));
        }
        tracing::error!("リネームに失敗しました: '{original}'");
        return Ok((RenameOutcome::Failed, false));
    }

    tracing::info!("タイムラインを複製します: {original}");
    let Some(copy) = pool.duplicate_item(item, new_name)? else {
        tracing::error!("タイムラインの複製に失敗しました: '{original}'");
        return Ok((RenameOutcome::Failed, false));
    };

    let relocated = match (options.relocate_duplicates, resolution.version) {
        (true, Some(version)) => {
            let label = format!("{}{}", options.version_folder_prefix, format_version(version));
            match relocate(pool, &copy, &label, &options.settle) {
                Ok(true) => true,
                Ok(false) => {
                    tracing::warn!("'{new_name}' をフォルダ '{label}' へ移動できませんでした");
                    false
                }
                Err(err) => {
                    tracing::warn!("'{new_name}' のフォルダ移動中にエラー: {err}");
                    false
                }
            }
        }
        _ => false,
    };

    Ok((RenameOutcome::DuplicatedAndRelocated, relocated))
}

/// Moves a fresh duplicate into the version folder under the current folder.
fn relocate<P: MediaPool>(
    pool: &mut P,
    copy: &P::Item,
    label: &str,
    settle: &SettlePolicy,
) -> Result<bool, CatalogError> {
    let Some(folder) = find_or_create_folder(pool, label)? else {
        tracing::warn!("フォルダ '{label}' を用意できませんでした");
        return Ok(false);
    };
    let Some(entry) = await_catalog_entry(&*pool, copy, settle)? else {
        tracing::warn!("複製したアイテムがカタログに現れませんでした");
        return Ok(false);
    };
    pool.move_item(&entry, &folder)
}

fn find_or_create_folder<P: MediaPool>(
    pool: &mut P,
    label: &str,
) -> Result<Option<P::Folder>, CatalogError> {
    let parent = match pool.current_folder()? {
        Some(folder) => folder,
        None => match pool.root_folder()? {
            Some(root) => root,
            None => return Ok(None),
        },
    };

    for folder in pool.subfolders(&parent)? {
        if pool.folder_name(&folder)? == label {
            return Ok(Some(folder));
        }
    }

    tracing::info!("フォルダを作成します: {label}");
    pool.create_subfolder(&parent, label)
}

fn await_catalog_entry<P: MediaPool>(
    pool: &P,
    copy: &P::Item,
    settle: &SettlePolicy,
) -> Result<Option<P::Item>, CatalogError> {
    let mut delay = settle.initial_delay;
    let mut waited = Duration::ZERO;

    loop {
        thread::sleep(delay);
        waited += delay;
        if let Some(entry) = pool.catalog_entry(copy)? {
            return Ok(Some(entry));
        }
        if waited >= settle.max_wait {
            return Ok(None);
        }
        let remaining = settle.max_wait - waited;
        delay = (delay * 2).max(MIN_BACKOFF).min(remaining);
        tracing::debug!("カタログ反映待ち: {delay:?}");
    }
}
