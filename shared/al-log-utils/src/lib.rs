//! ログユーティリティ
//!
//! - `init_tracing`: tracing-subscriber の初期化（標準出力またはファイル追記）
//! - ライフサイクル行: 起動・停止を1行で残す簡易ログ

use al_adapter_clock::ClockAdapter;
use al_domain::port::driven::Clock;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// フィルタ式が不正なときの既定レベル
pub const DEFAULT_LEVEL: &str = "info";

/// グローバルな subscriber を設定する。
///
/// `level` は `EnvFilter` の式（`RUST_LOG` と同じ書式）。
/// `log_file` があれば追記モードで開き、ANSI 装飾を切る。
pub fn init_tracing(level: &str, log_file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    let result = if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };
    result.map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

/// UTCタイムスタンプ付きのライフサイクル行を作成する。
pub fn lifecycle_line(component: &str, message: &str) -> String {
    let timestamp = ClockAdapter::new().now_iso8601();
    format!("[{}] [{}] {}\n", timestamp, component, message)
}

/// ライフサイクルログの既定出力先
pub fn default_lifecycle_log_paths() -> Vec<PathBuf> {
    vec![
        al_adapter_paths::default_log_dir().join("al-lifecycle.log"),
        std::env::temp_dir().join("al-lifecycle.log"),
    ]
}

/// 書き込めた最初の出力先を返す
pub fn write_line_to_paths(line: &str, paths: &[PathBuf]) -> Option<PathBuf> {
    for path in paths {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            if file.write_all(line.as_bytes()).and_then(|_| file.flush()).is_ok() {
                return Some(path.clone());
            }
        }
    }
    None
}

/// 既定の出力先にライフサイクル行を書き込む
pub fn write_lifecycle_line(component: &str, message: &str) {
    let line = lifecycle_line(component, message);
    let _ = write_line_to_paths(&line, &default_lifecycle_log_paths());
}
