use crate::DomainError;
use std::collections::BTreeSet;
use std::time::Duration;

const DEFAULT_SUPPRESSION_GRACE_MS: u64 = 2_000;
const DEFAULT_WATCHDOG_SECS: u64 = 300;
const DEFAULT_INDEX_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// 既定の検索ディレクトリ（先頭ほど優先）
pub const DEFAULT_INSTALL_DIRS: [&str; 8] = [
    "/Applications",
    "/System/Applications",
    "/Applications/Utilities",
    "/System/Library/PreferencePanes",
    "/Library/PreferencePanes",
    "~/Applications",
    "/opt/homebrew/Applications",
    "/usr/local/Applications",
];

/// 監視デーモンの設定（永続化対象）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    pub version: String,
    /// 既定ディレクトリの後ろに追加する検索ディレクトリ
    pub extra_search_dirs: Vec<String>,
    /// 再起動後に起動通知を無視する猶予（OSの起動→通知遅延より長くする）
    pub suppression_grace_ms: u64,
    /// 放置された認証エントリを回収するまでの時間
    pub watchdog_secs: u64,
    /// インデックス検索（第3段）の上限時間
    pub index_timeout_ms: u64,
    /// 各プロンプトの応答待ち上限
    pub prompt_timeout_secs: u64,
    /// 起動監視のポーリング間隔
    pub poll_interval_ms: u64,
    /// パスフレーズの SHA-256（16進）。未設定ならパスワード段は常に失敗。
    pub passphrase_sha256: Option<String>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            version: "0.3.0".into(),
            extra_search_dirs: Vec::new(),
            suppression_grace_ms: DEFAULT_SUPPRESSION_GRACE_MS,
            watchdog_secs: DEFAULT_WATCHDOG_SECS,
            index_timeout_ms: DEFAULT_INDEX_TIMEOUT_MS,
            prompt_timeout_secs: DEFAULT_PROMPT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            passphrase_sha256: None,
        }
    }
}

impl LockConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        ensure_range(self.suppression_grace_ms, 500, 30_000, "suppression_grace_ms")?;
        ensure_range(self.watchdog_secs, 10, 3_600, "watchdog_secs")?;
        ensure_range(self.index_timeout_ms, 100, 30_000, "index_timeout_ms")?;
        ensure_range(self.prompt_timeout_secs, 5, 3_600, "prompt_timeout_secs")?;
        ensure_range(self.poll_interval_ms, 100, 10_000, "poll_interval_ms")?;
        // 再起動の起動通知は次のポーリングで届くので、猶予はポーリング間隔より長くする
        if self.suppression_grace_ms <= self.poll_interval_ms {
            return Err(DomainError::ValidationError(format!(
                "suppression_grace_ms は poll_interval_ms より大きい必要があります (現在 {} <= {})",
                self.suppression_grace_ms, self.poll_interval_ms
            )));
        }
        for dir in &self.extra_search_dirs {
            let trimmed = dir.trim();
            if trimmed.is_empty() {
                return Err(DomainError::ValidationError(
                    "extra_search_dirs must not contain empty entries".into(),
                ));
            }
            if !(trimmed.starts_with('/') || trimmed.starts_with("~/")) {
                return Err(DomainError::ValidationError(format!(
                    "extra_search_dirs は絶対パスである必要があります (現在 {})",
                    trimmed
                )));
            }
        }
        if let Some(digest) = &self.passphrase_sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(DomainError::ValidationError(
                    "passphrase_sha256 は64桁の16進文字列である必要があります".into(),
                ));
            }
        }
        Ok(())
    }

    /// 範囲外の値を既定値に戻し、検索ディレクトリの重複を除く。
    pub fn normalize(&mut self) {
        self.suppression_grace_ms =
            clamp_or_default(self.suppression_grace_ms, 500, 30_000, DEFAULT_SUPPRESSION_GRACE_MS);
        self.watchdog_secs = clamp_or_default(self.watchdog_secs, 10, 3_600, DEFAULT_WATCHDOG_SECS);
        self.index_timeout_ms =
            clamp_or_default(self.index_timeout_ms, 100, 30_000, DEFAULT_INDEX_TIMEOUT_MS);
        self.prompt_timeout_secs =
            clamp_or_default(self.prompt_timeout_secs, 5, 3_600, DEFAULT_PROMPT_TIMEOUT_SECS);
        self.poll_interval_ms =
            clamp_or_default(self.poll_interval_ms, 100, 10_000, DEFAULT_POLL_INTERVAL_MS);
        if self.suppression_grace_ms <= self.poll_interval_ms {
            self.suppression_grace_ms = (self.poll_interval_ms * 2).clamp(500, 30_000);
        }

        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut dirs = Vec::new();
        for raw in &self.extra_search_dirs {
            let trimmed = raw.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_string()) {
                dirs.push(trimmed.to_string());
            }
        }
        self.extra_search_dirs = dirs;

        if let Some(digest) = &self.passphrase_sha256 {
            let digest = digest.trim().to_ascii_lowercase();
            self.passphrase_sha256 = if digest.is_empty() { None } else { Some(digest) };
        }
    }

    /// 既定ディレクトリ＋追加ディレクトリ（順序付き）
    pub fn search_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = DEFAULT_INSTALL_DIRS.iter().map(|d| d.to_string()).collect();
        for dir in &self.extra_search_dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }

    pub fn suppression_grace(&self) -> Duration {
        Duration::from_millis(self.suppression_grace_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.watchdog_secs)
    }

    pub fn index_timeout(&self) -> Duration {
        Duration::from_millis(self.index_timeout_ms)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// 値が指定範囲内かチェックするヘルパー
fn ensure_range(value: u64, min: u64, max: u64, field: &str) -> Result<(), DomainError> {
    if value < min || value > max {
        return Err(DomainError::ValidationError(format!(
            "{} は {}-{} の範囲内である必要があります (現在 {})",
            field, min, max, value
        )));
    }
    Ok(())
}

fn clamp_or_default(value: u64, min: u64, max: u64, default: u64) -> u64 {
    if value < min || value > max {
        default
    } else {
        value
    }
}
