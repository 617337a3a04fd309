//! 共有状態（保護リスト・有効フラグ・認証待ち・抑止ウィンドウ）
//!
//! すべて1つの Mutex の内側に置き、確認と更新を同じクリティカルセクションで行う。
//! `.await` をまたいでロックを保持しないこと。

use al_domain::model::{PendingRelaunch, ProtectedAppSet, SuppressionWindows};
use al_domain::port::driving::ProtectionStatus;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// 認証待ちエントリと、そのゲート実行を止めるトークン
pub(crate) struct PendingEntry {
    pub relaunch: PendingRelaunch,
    pub cancel: CancellationToken,
}

#[derive(Default)]
pub(crate) struct ProtectionCore {
    pub apps: ProtectedAppSet,
    pub enabled: bool,
    pub autostart: bool,
    pub suppressions: SuppressionWindows,
    pub pending: HashMap<String, PendingEntry>,
    next_ticket: u64,
}

impl ProtectionCore {
    pub fn new(apps: ProtectedAppSet, enabled: bool, autostart: bool) -> Self {
        Self {
            apps,
            enabled,
            autostart,
            ..Self::default()
        }
    }

    /// 登録ごとに一意な番号（ウォッチドッグが新しいエントリを消さないため）
    pub fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// 保護対象から外れた識別子の認証を止める。止めた件数を返す。
    pub fn cancel_unprotected(&mut self) -> usize {
        let mut cancelled = 0;
        for (identifier, entry) in &self.pending {
            if !self.apps.contains(identifier) && !entry.cancel.is_cancelled() {
                entry.cancel.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn status(&self, now_ms: u64) -> ProtectionStatus {
        let mut pending: Vec<String> = self.pending.keys().cloned().collect();
        pending.sort();
        ProtectionStatus {
            identifiers: self.apps.to_vec(),
            enabled: self.enabled,
            autostart: self.autostart,
            pending,
            suppressed: self.suppressions.active_identifiers(now_ms),
        }
    }
}
