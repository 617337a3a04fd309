//! CLI 用ランタイム配線。

use al_adapter_auth::hash_passphrase;
use al_adapter_autostart::AutostartAdapter;
use al_adapter_clock::ClockAdapter;
use al_adapter_fs::FsAdapter;
use al_adapter_paths as paths;
use al_adapter_process::ProcessAdapter;
use al_app::{ControllerDeps, ProtectionController};
use al_domain::model::LockConfig;
use al_domain::port::driven::ConfigRepository;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

/// CLI実行ファイル用の依存関係
pub struct CliRuntime {
    fs: Arc<FsAdapter>,
    controller: ProtectionController,
}

impl CliRuntime {
    /// 既定のデータディレクトリで作成
    pub fn new() -> Result<Self> {
        Self::with_root(paths::default_data_dir())
    }

    pub fn with_root(root: impl AsRef<Path>) -> Result<Self> {
        let fs = Arc::new(FsAdapter::new(root));
        let autostart = AutostartAdapter::for_current_user()
            .context("failed to locate autostart directory")?;
        let controller = ProtectionController::load(ControllerDeps {
            settings: fs.clone(),
            process: Arc::new(ProcessAdapter::new()),
            autostart: Arc::new(autostart),
            clock: Arc::new(ClockAdapter::new()),
            exe_path: paths::sibling_executable(paths::MONITOR_EXE_NAME),
        })
        .with_context(|| format!("failed to load {}", fs.settings_path().display()))?;
        Ok(Self { fs, controller })
    }

    /// 保護管理ユースケース
    pub fn controller(&self) -> &ProtectionController {
        &self.controller
    }

    pub fn config_path(&self) -> &Path {
        self.fs.config_path()
    }

    pub fn settings_path(&self) -> &Path {
        self.fs.settings_path()
    }

    pub fn load_config(&self) -> Result<LockConfig> {
        self.fs
            .load()
            .with_context(|| format!("failed to load {}", self.fs.config_path().display()))
    }

    /// パスフレーズのダイジェストを保存する（平文は保存しない）
    pub fn set_passphrase(&self, passphrase: &str) -> Result<()> {
        if passphrase.trim().is_empty() {
            bail!("passphrase must not be empty");
        }
        let mut config = self.load_config()?;
        config.passphrase_sha256 = Some(hash_passphrase(passphrase));
        self.fs
            .save(&config)
            .with_context(|| format!("failed to save {}", self.fs.config_path().display()))
    }

    pub fn clear_passphrase(&self) -> Result<()> {
        let mut config = self.load_config()?;
        config.passphrase_sha256 = None;
        self.fs
            .save(&config)
            .with_context(|| format!("failed to save {}", self.fs.config_path().display()))
    }
}
