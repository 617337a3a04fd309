//! AppLockの既定パス解決

use al_domain::model::LockConfig;
use std::path::{Path, PathBuf};

/// データディレクトリを上書きする環境変数（テスト・開発用）
pub const HOME_OVERRIDE_ENV: &str = "APPLOCK_HOME";

/// 監視デーモンの実行ファイル名
pub const MONITOR_EXE_NAME: &str = "al-monitor";

/// ユーザーのホームディレクトリ
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `~/` で始まるパスをホームディレクトリに展開する
pub fn expand_home(raw: &str) -> PathBuf {
    expand_with(raw, home_dir().as_deref())
}

fn expand_with(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if raw == "~" => home.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(raw)),
        _ => PathBuf::from(raw),
    }
}

/// 既定のデータディレクトリ
///
/// - `APPLOCK_HOME` が設定されていればそれ
/// - macOS: `~/Library/Application Support/AppLock`
/// - Windows: `%LOCALAPPDATA%\AppLock`
/// - その他: `$XDG_CONFIG_HOME/applock`（無ければ `~/.config/applock`）
/// - ホームが分からない場合: `./var`
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_OVERRIDE_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .map(|h| h.join("Library").join("Application Support").join("AppLock"))
            .unwrap_or_else(|| PathBuf::from("./var"))
    }
    #[cfg(windows)]
    {
        std::env::var_os("LOCALAPPDATA")
            .map(PathBuf::from)
            .map(|p| p.join("AppLock"))
            .unwrap_or_else(|| PathBuf::from("./var"))
    }
    #[cfg(not(any(target_os = "macos", windows)))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|h| h.join(".config")))
            .map(|p| p.join("applock"))
            .unwrap_or_else(|| PathBuf::from("./var"))
    }
}

/// 設定ファイル用ディレクトリ
pub fn default_config_dir() -> PathBuf {
    default_data_dir().join("config")
}

/// ログファイル用ディレクトリ
pub fn default_log_dir() -> PathBuf {
    default_data_dir().join("logs")
}

/// 設定ファイルの既定パス
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

/// 保護リスト・フラグの既定パス
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// 監視デーモンのログの既定パス
pub fn default_monitor_log_path() -> PathBuf {
    default_log_dir().join("al-monitor.log")
}

/// 展開済みの検索ディレクトリ（優先順）
pub fn install_search_dirs(config: &LockConfig) -> Vec<PathBuf> {
    config
        .search_dirs()
        .iter()
        .map(|dir| expand_home(dir))
        .collect()
}

/// 実行中バイナリと同じディレクトリにある別バイナリ
///
/// 見つからなければ名前だけを返す（PATH 解決に任せる）。
pub fn sibling_executable(name: &str) -> PathBuf {
    let file = if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    };
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file)))
        .filter(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(file))
}
