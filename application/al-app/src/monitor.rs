//! 起動監視。
//!
//! 起動イベントのストリームを1つのハンドラで消費し、保護対象なら
//! プロセスを終了して認証待ちに登録する。

use crate::controller::ProtectionController;
use crate::registry::PendingRelaunchRegistry;
use al_domain::model::LaunchEvent;
use al_domain::port::driven::ProcessControl;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 起動イベント1件の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchDisposition {
    /// 保護が無効
    Disabled,
    /// 再起動直後の抑止ウィンドウ内
    Suppressed,
    /// 保護対象ではない
    Unprotected,
    /// 終了させたが、既に認証待ちがある
    Duplicate,
    /// 終了させて認証待ちに登録した
    Intercepted,
}

impl LaunchDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Suppressed => "suppressed",
            Self::Unprotected => "unprotected",
            Self::Duplicate => "duplicate",
            Self::Intercepted => "intercepted",
        }
    }
}

pub struct LaunchMonitor {
    controller: Arc<ProtectionController>,
    registry: PendingRelaunchRegistry,
    process: Arc<dyn ProcessControl>,
}

impl LaunchMonitor {
    pub fn new(
        controller: Arc<ProtectionController>,
        registry: PendingRelaunchRegistry,
        process: Arc<dyn ProcessControl>,
    ) -> Self {
        Self {
            controller,
            registry,
            process,
        }
    }

    pub fn on_launch(&self, event: &LaunchEvent) -> LaunchDisposition {
        let identifier = event.identifier.as_str();
        let pid = event.process.pid();
        let screened = self.controller.screen_launch(identifier);
        if screened != LaunchDisposition::Intercepted {
            if screened == LaunchDisposition::Suppressed {
                debug!(identifier, pid, "再起動直後の起動のため無視");
            }
            return screened;
        }

        info!(identifier, pid, "保護対象の起動を検出しました");
        if let Err(err) = self.process.terminate(event.process) {
            warn!(identifier, pid, error = %err, "プロセスの終了に失敗しました");
        }

        if self.registry.admit(identifier, event.process) {
            LaunchDisposition::Intercepted
        } else {
            LaunchDisposition::Duplicate
        }
    }

    /// ストリームが閉じるか `shutdown` されるまで起動イベントを処理する
    pub async fn run(&self, mut events: mpsc::Receiver<LaunchEvent>, shutdown: CancellationToken) {
        info!("起動監視を開始しました");
        let mut intercepted = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        if self.on_launch(&event) == LaunchDisposition::Intercepted {
                            intercepted += 1;
                        }
                    }
                    None => {
                        warn!("起動イベントのストリームが閉じました");
                        break;
                    }
                },
            }
        }
        info!(intercepted, "起動監視を終了しました");
    }
}
