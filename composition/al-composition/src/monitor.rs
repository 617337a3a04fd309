//! 監視デーモン用ランタイム配線。

use al_adapter_auth::{PassphraseAuthProvider, SecretReader};
use al_adapter_autostart::AutostartAdapter;
use al_adapter_clock::ClockAdapter;
use al_adapter_desktop::{DesktopNotifier, SpotlightIndex};
use al_adapter_fs::{DirectoryCatalog, FsAdapter};
use al_adapter_paths as paths;
use al_adapter_process::{LaunchWatcher, ProcessAdapter};
use al_app::{Pipeline, PipelineDeps, ProtectionController};
use al_domain::model::LockConfig;
use al_domain::port::driven::{Clock, ConfigRepository};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 起動イベントのキュー長
const LAUNCH_QUEUE_DEPTH: usize = 256;
/// 設定ファイルの変更確認間隔
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 監視デーモンの依存関係
pub struct MonitorRuntime {
    fs: Arc<FsAdapter>,
    config: LockConfig,
    clock: Arc<dyn Clock>,
    pipeline: Pipeline,
}

impl MonitorRuntime {
    /// 既定のデータディレクトリで作成
    pub fn new() -> Result<Self> {
        Self::with_root(paths::default_data_dir())
    }

    pub fn with_root(root: impl AsRef<Path>) -> Result<Self> {
        Self::assemble(root, al_adapter_auth::default_reader())
    }

    fn assemble(root: impl AsRef<Path>, reader: Arc<dyn SecretReader>) -> Result<Self> {
        let fs = Arc::new(FsAdapter::new(root));
        let config = fs
            .load()
            .with_context(|| format!("failed to load {}", fs.config_path().display()))?;
        let clock: Arc<dyn Clock> = Arc::new(ClockAdapter::new());
        let autostart = AutostartAdapter::for_current_user()
            .context("failed to locate autostart directory")?;
        let exe_path = std::env::current_exe()
            .unwrap_or_else(|_| paths::sibling_executable(paths::MONITOR_EXE_NAME));

        let deps = PipelineDeps {
            settings: fs.clone(),
            process: Arc::new(ProcessAdapter::new()),
            autostart: Arc::new(autostart),
            clock: clock.clone(),
            auth: Arc::new(PassphraseAuthProvider::new(fs.clone(), reader)),
            catalog: Arc::new(DirectoryCatalog::new()),
            index: Arc::new(SpotlightIndex::new()),
            notifier: Arc::new(DesktopNotifier::new()),
            exe_path,
            search_dirs: paths::install_search_dirs(&config),
        };
        let pipeline = Pipeline::assemble(deps, &config).context("failed to assemble pipeline")?;
        Ok(Self {
            fs,
            config,
            clock,
            pipeline,
        })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<ProtectionController> {
        &self.pipeline.controller
    }

    pub fn settings_path(&self) -> &Path {
        self.fs.settings_path()
    }

    /// `shutdown` されるまで監視する
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        match self.pipeline.controller.ensure_autostart() {
            Ok(true) => info!("ログイン項目に登録しました"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "ログイン項目の登録に失敗しました"),
        }

        let (tx, rx) = mpsc::channel(LAUNCH_QUEUE_DEPTH);
        let watcher = LaunchWatcher::new(self.config.poll_interval(), self.clock.clone())
            .spawn(tx, shutdown.clone());
        let reloader = tokio::spawn(watch_settings(
            self.fs.clone(),
            self.pipeline.controller.clone(),
            shutdown.clone(),
        ));

        info!(
            protected = self.pipeline.controller.identifiers().len(),
            enabled = self.pipeline.controller.is_enabled(),
            search_dirs = self.pipeline.resolver.search_dirs().len(),
            "監視を開始しました"
        );
        self.pipeline.monitor.run(rx, shutdown.clone()).await;

        // 監視ループがイベント枯渇で抜けた場合も周辺タスクを止める
        shutdown.cancel();
        if let Err(err) = watcher.await {
            warn!(error = %err, "起動ウォッチャーのタスクが異常終了しました");
        }
        if let Err(err) = reloader.await {
            warn!(error = %err, "設定監視タスクが異常終了しました");
        }
        Ok(())
    }
}

/// 設定ストアの更新時刻の変化を検出する
#[derive(Debug)]
pub struct SettingsChangeDetector {
    last: Option<SystemTime>,
}

impl SettingsChangeDetector {
    pub fn new(initial: Option<SystemTime>) -> Self {
        Self { last: initial }
    }

    /// 前回から変化していれば `true`
    pub fn observe(&mut self, current: Option<SystemTime>) -> bool {
        if current == self.last {
            return false;
        }
        self.last = current;
        true
    }
}

async fn watch_settings(
    fs: Arc<FsAdapter>,
    controller: Arc<ProtectionController>,
    shutdown: CancellationToken,
) {
    let mut detector = SettingsChangeDetector::new(fs.settings_modified());
    let mut ticker = tokio::time::interval(SETTINGS_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if !detector.observe(fs.settings_modified()) {
            continue;
        }
        debug!(path = %fs.settings_path().display(), "設定ファイルが変更されました");
        if let Err(err) = controller.reload_from_store() {
            warn!(error = %err, "設定の再読込に失敗しました");
        }
    }
}

/// 監視デーモンのログファイル
pub fn default_log_path() -> PathBuf {
    paths::default_monitor_log_path()
}
