pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "SAKURAFORM_CONFIG_PATH";

/// ゾーンを上書きする環境変数 (usacloud と共通)
pub const ZONE_ENV: &str = "SAKURACLOUD_ZONE";

/// usacloud のパスを上書きする環境変数
pub const USACLOUD_ENV: &str = "SAKURAFORM_USACLOUD";

/// さくらのクラウドのゾーン
pub const KNOWN_ZONES: &[&str] = &["is1a", "is1b", "tk1a", "tk1b", "tk1v"];

/// power_timeout_secs の上限 (24時間)
pub const MAX_POWER_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// プロバイダー設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// 操作対象のゾーン
    pub zone: String,

    /// usacloud の実行ファイル
    pub usacloud_path: String,

    /// 電源状態をポーリングする間隔 (秒)
    pub poll_interval_secs: u64,

    /// 起動・停止を待つ上限 (秒)
    pub power_timeout_secs: u64,

    /// 読み込んだ設定ファイル (デフォルト値のみの場合は None)
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            zone: "is1a".to_string(),
            usacloud_path: "usacloud".to_string(),
            poll_interval_secs: 5,
            power_timeout_secs: 600,
            source: None,
        }
    }
}

impl ProviderConfig {
    /// 設定ファイルを探して読み込み、環境変数を反映して検証する
    ///
    /// 設定ファイルが無い場合はデフォルト値を使う。
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file()? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// YAML ファイルから読み込む (環境変数は反映しない)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// SAKURACLOUD_ZONE / SAKURAFORM_USACLOUD を反映
    pub fn apply_env_overrides(&mut self) {
        if let Some(zone) = non_empty_env(ZONE_ENV) {
            self.zone = zone;
        }
        if let Some(path) = non_empty_env(USACLOUD_ENV) {
            self.usacloud_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !KNOWN_ZONES.contains(&self.zone.as_str()) {
            return Err(ConfigError::InvalidZone(self.zone.clone()));
        }
        if self.usacloud_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "usacloud_path が空です".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 || self.power_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_secs と power_timeout_secs は 1 以上を指定してください".to_string(),
            ));
        }
        if self.poll_interval_secs >= self.power_timeout_secs {
            return Err(ConfigError::InvalidValue(format!(
                "poll_interval_secs ({}) は power_timeout_secs ({}) より小さくしてください",
                self.poll_interval_secs, self.power_timeout_secs
            )));
        }
        if self.power_timeout_secs > MAX_POWER_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue(format!(
                "power_timeout_secs ({}) は {} 以下を指定してください",
                self.power_timeout_secs, MAX_POWER_TIMEOUT_SECS
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn power_timeout(&self) -> Duration {
        Duration::from_secs(self.power_timeout_secs)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// SakuraFormのグローバル設定ディレクトリ (~/.config/sakuraform)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("sakuraform"))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 SAKURAFORM_CONFIG_PATH (直接パス指定、存在しなければエラー)
/// 2. カレントディレクトリ: sakuraform.yaml, .sakuraform.yaml
/// 3. ~/.config/sakuraform/config.yaml (グローバル設定)
///
/// どれも無ければ `Ok(None)`。
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Some(config_path) = non_empty_env(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    // 2. カレントディレクトリで検索
    let current_dir = std::env::current_dir()?;
    for filename in ["sakuraform.yaml", ".sakuraform.yaml"] {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. グローバル設定ファイル
    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}
