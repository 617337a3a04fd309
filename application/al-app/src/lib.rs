//! al-app: アプリケーション層。
//!
//! 起動監視・認証待ちレジストリ・認証ゲート・パス解決・保護コントローラを
//! ドメインポートの上に組み立てる。

pub mod controller;
pub mod gate;
pub mod monitor;
pub mod registry;
pub mod resolver;
mod state;

#[cfg(test)]
mod testing;

pub use controller::{ControllerDeps, ProtectionController};
pub use gate::{AuthenticationGate, GateDeps, GateTimings};
pub use monitor::{LaunchDisposition, LaunchMonitor};
pub use registry::PendingRelaunchRegistry;
pub use resolver::{AppResolver, ResolverDeps};

use al_domain::model::LockConfig;
use al_domain::port::driven::{
    AppCatalog, AuthProvider, AutostartRegistrar, Clock, ContentIndex, ProcessControl,
    SettingsStore, UserNotifier,
};
use al_domain::DomainError;
use std::path::PathBuf;
use std::sync::Arc;

/// パイプライン全体が使うポート
pub struct PipelineDeps {
    pub settings: Arc<dyn SettingsStore>,
    pub process: Arc<dyn ProcessControl>,
    pub autostart: Arc<dyn AutostartRegistrar>,
    pub clock: Arc<dyn Clock>,
    pub auth: Arc<dyn AuthProvider>,
    pub catalog: Arc<dyn AppCatalog>,
    pub index: Arc<dyn ContentIndex>,
    pub notifier: Arc<dyn UserNotifier>,
    /// 自動起動に登録する実行ファイル
    pub exe_path: PathBuf,
    /// 展開済みの検索ディレクトリ（優先順）
    pub search_dirs: Vec<PathBuf>,
}

/// 組み立て済みの監視パイプライン
pub struct Pipeline {
    pub controller: Arc<ProtectionController>,
    pub resolver: Arc<AppResolver>,
    pub gate: Arc<AuthenticationGate>,
    pub registry: PendingRelaunchRegistry,
    pub monitor: Arc<LaunchMonitor>,
}

impl Pipeline {
    pub fn assemble(deps: PipelineDeps, config: &LockConfig) -> Result<Self, DomainError> {
        let controller = Arc::new(ProtectionController::load(ControllerDeps {
            settings: deps.settings,
            process: deps.process.clone(),
            autostart: deps.autostart,
            clock: deps.clock,
            exe_path: deps.exe_path,
        })?);
        let resolver = Arc::new(AppResolver::new(
            ResolverDeps {
                catalog: deps.catalog,
                index: deps.index,
                process: deps.process.clone(),
                notifier: deps.notifier.clone(),
            },
            deps.search_dirs,
            config.index_timeout(),
        ));
        let gate = Arc::new(AuthenticationGate::new(
            GateDeps {
                auth: deps.auth,
                resolver: resolver.clone(),
                controller: controller.clone(),
                notifier: deps.notifier,
            },
            GateTimings::from_config(config),
        ));
        let registry = PendingRelaunchRegistry::new(controller.clone(), gate.clone(), config.watchdog());
        let monitor = Arc::new(LaunchMonitor::new(
            controller.clone(),
            registry.clone(),
            deps.process,
        ));
        Ok(Self {
            controller,
            resolver,
            gate,
            registry,
            monitor,
        })
    }
}
