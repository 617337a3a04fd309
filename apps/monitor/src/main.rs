//! al-monitor: 保護対象アプリの起動を監視し、終了させて再認証後に再起動する常駐デーモン。
//! ログイン時に自動起動される。設定の変更は CLI（applock）から行う。

use al_composition::log;
use al_composition::monitor::{default_log_path, MonitorRuntime};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const COMPONENT: &str = "al-monitor";

#[derive(Parser, Debug)]
#[command(name = "al-monitor", version, about = "AppLock launch monitor")]
struct Args {
    /// Log filter (EnvFilter syntax)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file (defaults to the per-user log directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log to stdout instead of a file
    #[arg(long)]
    foreground: bool,

    /// Data directory override
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_file = if args.foreground {
        None
    } else {
        Some(args.log_file.clone().unwrap_or_else(default_log_path))
    };
    log::init_tracing(&args.log_level, log_file.as_deref()).context("failed to initialize logging")?;

    log::write_lifecycle_line(COMPONENT, "starting");
    let runtime = match &args.data_dir {
        Some(dir) => MonitorRuntime::with_root(dir),
        None => MonitorRuntime::new(),
    };
    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %format!("{err:#}"), "監視デーモンを開始できません");
            log::write_lifecycle_line(COMPONENT, &format!("start failed: {err:#}"));
            return Err(err);
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(forward_shutdown_signal(shutdown.clone()));

    let result = runtime.run(shutdown).await;
    info!("監視を停止しました");
    log::write_lifecycle_line(COMPONENT, "stopped");
    result
}

/// Ctrl-C / SIGTERM で停止トークンを発火する
async fn forward_shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Ctrl-C を受信しました"),
                    _ = term.recv() => info!("SIGTERM を受信しました"),
                }
            }
            Err(err) => {
                error!(error = %err, "SIGTERM ハンドラを登録できません");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl-C を受信しました");
    }
    shutdown.cancel();
}
