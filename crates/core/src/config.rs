use crate::orchestrator::SettlePolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LOG_FILE_NAME: &str = "timeline-version-up.log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Project snapshot used when `--project` is not given.
    pub project_file: Option<PathBuf>,
    /// `None` keeps the log next to the config under the data directory.
    pub log_file: Option<PathBuf>,
    pub log_to_file: bool,
    pub log_max_bytes: u64,
    pub log_backup_count: usize,
    pub relocate_duplicates: bool,
    pub version_folder_prefix: String,
    pub settle_initial_delay_ms: u64,
    pub settle_max_wait_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_file: None,
            log_file: None,
            log_to_file: true,
            log_max_bytes: 1024 * 1024,
            log_backup_count: 5,
            relocate_duplicates: true,
            version_folder_prefix: String::new(),
            settle_initial_delay_ms: 1000,
            settle_max_wait_ms: 5000,
        }
    }
}

impl AppConfig {
    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy {
            initial_delay: Duration::from_millis(self.settle_initial_delay_ms),
            max_wait: Duration::from_millis(
                self.settle_max_wait_ms.max(self.settle_initial_delay_ms),
            ),
        }
    }

    pub fn resolved_log_file(&self, paths: &AppPaths) -> Option<PathBuf> {
        if !self.log_to_file {
            return None;
        }
        Some(
            self.log_file
                .clone()
                .unwrap_or_else(|| paths.default_log_path.clone()),
        )
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_path: PathBuf,
    pub default_log_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "timeline-tools", "timeline-version-up")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    Ok(AppPaths {
        config_path: proj.config_dir().join("config.toml"),
        default_log_path: proj.data_local_dir().join(LOG_FILE_NAME),
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("設定ファイルを読めませんでした: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    Ok(config)
}
