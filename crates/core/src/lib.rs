mod catalog;
mod config;
mod date;
mod orchestrator;
mod resolver;
mod sanitize;
mod snapshot;
mod template;
mod version;

pub use catalog::{classify_item, CatalogError, ItemKind, MediaPool};
pub use config::{app_paths, load_config, load_config_from, AppConfig, AppPaths, LOG_FILE_NAME};
pub use date::{format_date, process_date, stamp_current_date, strip_known_dates, DATE_FORMAT};
pub use orchestrator::{
    run_batch, BatchError, BatchOptions, BatchReport, BatchSummary, ItemReport, RenameOutcome,
    Reporter, SettlePolicy, TracingReporter,
};
pub use resolver::{
    resolve, version_base, ResolveContext, ResolveError, ResolveOptions, Resolution, ResolvedName,
};
pub use sanitize::cleanup_name;
pub use snapshot::{
    load_snapshot, save_snapshot, FolderId, ItemId, ProjectSnapshot, SnapshotFolder, SnapshotItem,
    SnapshotPool,
};
pub use template::{validate_pattern, Pattern, PatternError, PatternPart, Placeholder};
pub use version::{
    apply_version_delta, extract_version, find_version_token, format_version, shift_version,
    VersionError, VersionStyle, VersionToken,
};
