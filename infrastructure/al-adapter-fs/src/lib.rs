//! ファイルシステムアダプター（設定/保護リストの永続化、インストール先の参照）
//! JSONファイルで実装。書き込みは一時ファイル＋renameで原子的に行う。
use al_domain::error::DomainError;
use al_domain::model::LockConfig;
use al_domain::port::driven::{AppCatalog, CatalogEntry, ConfigRepository, SettingsStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

#[derive(Debug)]
pub struct FsAdapter {
    config_path: PathBuf,
    settings_path: PathBuf,
    /// 設定ストアの読み書きを直列化する（同一プロセス内）
    settings_lock: Mutex<()>,
}

impl FsAdapter {
    /// 指定ルートディレクトリでアダプターを作成。ファイルは遅延作成。
    pub fn new(root: impl AsRef<Path>) -> Self {
        let config_dir = root.as_ref().join("config");
        Self {
            config_path: config_dir.join("config.json"),
            settings_path: config_dir.join("settings.json"),
            settings_lock: Mutex::new(()),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// 設定ストアの最終更新時刻（外部変更の検出用）
    pub fn settings_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.settings_path)
            .and_then(|m| m.modified())
            .ok()
    }

    fn ensure_parent_dir(&self, path: &Path) -> Result<(), DomainError> {
        let Some(dir) = path.parent() else {
            return Ok(());
        };
        fs::create_dir_all(dir)
            .map_err(|e| DomainError::IoError(format!("create_dir_all: {e}")))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), DomainError> {
        self.ensure_parent_dir(path)?;
        let suffix = unique_suffix();
        let tmp_path = path.with_extension(format!("tmp.{suffix}"));
        {
            let mut f = fs::File::create(&tmp_path)
                .map_err(|e| DomainError::IoError(format!("create temp file: {e}")))?;
            f.write_all(data)
                .map_err(|e| DomainError::IoError(format!("write temp file: {e}")))?;
            let _ = f.sync_all();
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(DomainError::IoError(format!("rename temp file: {e}")));
        }
        Ok(())
    }

    fn read_settings(&self) -> Result<Map<String, Value>, DomainError> {
        if !self.settings_path.exists() {
            return Ok(Map::new());
        }
        let data = fs::read_to_string(&self.settings_path)
            .map_err(|e| DomainError::IoError(format!("read settings: {e}")))?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&data)
            .map_err(|e| DomainError::ConfigLoadFailed(format!("parse settings: {e}")))?
        {
            Value::Object(map) => Ok(map),
            _ => Err(DomainError::ConfigLoadFailed(
                "settings.json must contain a JSON object".into(),
            )),
        }
    }

    fn update_settings(&self, key: &str, value: Value) -> Result<(), DomainError> {
        let _guard = self
            .settings_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_settings()?;
        map.insert(key.to_string(), value);
        let data = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| DomainError::IoError(format!("serialize settings: {e}")))?;
        self.write_atomic(&self.settings_path, data.as_bytes())
    }

    fn read_key(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let _guard = self
            .settings_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_settings()?.remove(key))
    }
}

impl ConfigRepository for FsAdapter {
    fn load(&self) -> Result<LockConfig, DomainError> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "設定ファイルが無いため既定値を使用");
            return Ok(LockConfig::default());
        }
        let buf = fs::read_to_string(&self.config_path)
            .map_err(|e| DomainError::ConfigLoadFailed(format!("read config: {e}")))?;
        let dto: ConfigDto =
            serde_json::from_str(&buf).map_err(|e| DomainError::ConfigLoadFailed(e.to_string()))?;
        LockConfig::try_from(dto).map_err(|e| DomainError::ConfigLoadFailed(e.to_string()))
    }

    fn save(&self, config: &LockConfig) -> Result<(), DomainError> {
        config.validate()?;
        let dto = ConfigDto::from(config);
        let data = serde_json::to_string_pretty(&dto)
            .map_err(|e| DomainError::IoError(format!("serialize config: {e}")))?;
        self.write_atomic(&self.config_path, data.as_bytes())
            .map_err(|e| DomainError::IoError(format!("write config: {e}")))?;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

impl SettingsStore for FsAdapter {
    fn load_list(&self, key: &str) -> Result<Option<Vec<String>>, DomainError> {
        match self.read_key(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value::<Vec<String>>(value)
                .map(Some)
                .map_err(|e| DomainError::ConfigLoadFailed(format!("{key}: {e}"))),
        }
    }

    fn save_list(&self, key: &str, items: &[String]) -> Result<(), DomainError> {
        let value = Value::Array(items.iter().cloned().map(Value::String).collect());
        self.update_settings(key, value)
    }

    fn load_flag(&self, key: &str) -> Result<Option<bool>, DomainError> {
        match self.read_key(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(flag)),
            Some(other) => Err(DomainError::ConfigLoadFailed(format!(
                "{key}: expected boolean, found {other}"
            ))),
        }
    }

    fn save_flag(&self, key: &str, value: bool) -> Result<(), DomainError> {
        self.update_settings(key, Value::Bool(value))
    }
}

/// インストールディレクトリの参照（一覧は名前順で決定的）
#[derive(Debug, Default)]
pub struct DirectoryCatalog;

impl DirectoryCatalog {
    pub fn new() -> Self {
        Self
    }
}

impl AppCatalog for DirectoryCatalog {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_entries(&self, dir: &Path) -> Result<Vec<CatalogEntry>, DomainError> {
        let read = fs::read_dir(dir)
            .map_err(|e| DomainError::IoError(format!("read_dir {}: {e}", dir.display())))?;
        let mut entries: Vec<CatalogEntry> = read
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                // シンボリックリンク先がディレクトリの場合も含める
                let is_dir = entry.path().is_dir();
                Some(CatalogEntry::new(name, entry.path(), is_dir))
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}.{}", std::process::id(), nanos)
}

// ---------- DTO 定義 ----------

#[derive(Serialize, Deserialize)]
struct ConfigDto {
    version: String,
    #[serde(default)]
    extra_search_dirs: Vec<String>,
    #[serde(default)]
    timing: TimingDto,
    /// パスフレーズのSHA-256（16進）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    passphrase_sha256: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct TimingDto {
    suppression_grace_ms: u64,
    watchdog_secs: u64,
    index_timeout_ms: u64,
    prompt_timeout_secs: u64,
    poll_interval_ms: u64,
}

impl Default for TimingDto {
    fn default() -> Self {
        Self::from(&LockConfig::default())
    }
}

impl From<&LockConfig> for TimingDto {
    fn from(cfg: &LockConfig) -> Self {
        Self {
            suppression_grace_ms: cfg.suppression_grace_ms,
            watchdog_secs: cfg.watchdog_secs,
            index_timeout_ms: cfg.index_timeout_ms,
            prompt_timeout_secs: cfg.prompt_timeout_secs,
            poll_interval_ms: cfg.poll_interval_ms,
        }
    }
}

impl From<&LockConfig> for ConfigDto {
    fn from(cfg: &LockConfig) -> Self {
        Self {
            version: cfg.version.clone(),
            extra_search_dirs: cfg.extra_search_dirs.clone(),
            timing: TimingDto::from(cfg),
            passphrase_sha256: cfg.passphrase_sha256.clone(),
        }
    }
}

impl TryFrom<ConfigDto> for LockConfig {
    type Error = DomainError;

    fn try_from(dto: ConfigDto) -> Result<Self, Self::Error> {
        let mut cfg = LockConfig {
            version: dto.version,
            extra_search_dirs: dto.extra_search_dirs,
            suppression_grace_ms: dto.timing.suppression_grace_ms,
            watchdog_secs: dto.timing.watchdog_secs,
            index_timeout_ms: dto.timing.index_timeout_ms,
            prompt_timeout_secs: dto.timing.prompt_timeout_secs,
            poll_interval_ms: dto.timing.poll_interval_ms,
            passphrase_sha256: dto.passphrase_sha256,
        };
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }
}
