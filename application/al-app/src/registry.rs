//! 認証待ちレジストリ。
//!
//! 識別子ごとに高々1件のエントリを持ち、登録時にゲートを独立タスクとして起動する。
//! ゲートが終端に達するか、ウォッチドッグが期限切れを検出したときに回収する。

use crate::controller::ProtectionController;
use crate::gate::AuthenticationGate;
use crate::state::PendingEntry;
use al_domain::model::{AuthState, PendingRelaunch, ProcessHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct PendingRelaunchRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    controller: Arc<ProtectionController>,
    gate: Arc<AuthenticationGate>,
    watchdog: Duration,
}

impl PendingRelaunchRegistry {
    pub fn new(
        controller: Arc<ProtectionController>,
        gate: Arc<AuthenticationGate>,
        watchdog: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                controller,
                gate,
                watchdog,
            }),
        }
    }

    /// 認証待ちとして登録し、ゲートを起動する。
    ///
    /// 既にエントリがあるか、抑止ウィンドウが有効なら何もせず `false`。
    /// tokio ランタイム上で呼ぶこと。
    pub fn admit(&self, identifier: &str, handle: ProcessHandle) -> bool {
        let admitted = self.inner.controller.with_core(|core, now| {
            if core.suppressions.is_active(identifier, now) || core.pending.contains_key(identifier) {
                return None;
            }
            let ticket = core.issue_ticket();
            let cancel = CancellationToken::new();
            core.pending.insert(
                identifier.to_string(),
                PendingEntry {
                    relaunch: PendingRelaunch::new(identifier, handle, now, ticket),
                    cancel: cancel.clone(),
                },
            );
            Some((ticket, cancel))
        });

        let Some((ticket, cancel)) = admitted else {
            debug!(identifier, pid = handle.pid(), "認証待ちが既にあるため無視");
            return false;
        };
        info!(identifier, pid = handle.pid(), ticket, "認証待ちに登録しました");
        self.spawn_flow(identifier.to_string(), ticket, cancel);
        true
    }

    fn spawn_flow(&self, identifier: String, ticket: u64, cancel: CancellationToken) {
        let done = CancellationToken::new();

        let registry = self.clone();
        let flow_id = identifier.clone();
        let flow_cancel = cancel.clone();
        let flow_done = done.clone();
        tokio::spawn(async move {
            let report = |state: AuthState| registry.record_state(&flow_id, ticket, state);
            let outcome = registry
                .inner
                .gate
                .run(&flow_id, &flow_cancel, &report)
                .await;
            registry.retire_ticket(&flow_id, ticket);
            flow_done.cancel();
            debug!(identifier = %flow_id, ticket, ?outcome, "ゲート実行が終了しました");
        });

        let registry = self.clone();
        let watchdog = self.inner.watchdog;
        tokio::spawn(async move {
            tokio::select! {
                _ = done.cancelled() => {}
                _ = tokio::time::sleep(watchdog) => {
                    if registry.retire_ticket(&identifier, ticket) {
                        warn!(identifier = %identifier, ticket, "放置された認証待ちを回収しました");
                        cancel.cancel();
                    }
                }
            }
        });
    }

    /// エントリを削除する（冪等）
    pub fn retire(&self, identifier: &str) -> bool {
        self.inner
            .controller
            .with_core(|core, _| core.pending.remove(identifier).is_some())
    }

    /// 同じ登録番号のエントリだけを削除する
    fn retire_ticket(&self, identifier: &str, ticket: u64) -> bool {
        self.inner.controller.with_core(|core, _| {
            match core.pending.get(identifier) {
                Some(entry) if entry.relaunch.ticket == ticket => {
                    core.pending.remove(identifier);
                    true
                }
                _ => false,
            }
        })
    }

    fn record_state(&self, identifier: &str, ticket: u64, state: AuthState) {
        self.inner.controller.with_core(|core, _| {
            if let Some(entry) = core.pending.get_mut(identifier) {
                if entry.relaunch.ticket == ticket {
                    entry.relaunch.state = state;
                }
            }
        });
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.inner
            .controller
            .with_core(|core, _| core.pending.contains_key(identifier))
    }

    pub fn len(&self) -> usize {
        self.inner.controller.with_core(|core, _| core.pending.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// エントリの写し
    pub fn get(&self, identifier: &str) -> Option<PendingRelaunch> {
        self.inner
            .controller
            .with_core(|core, _| core.pending.get(identifier).map(|e| e.relaunch.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{settle, Harness, StubAuth};
    use al_domain::model::BiometricResult;
    use al_domain::port::driving::ProtectionUseCase;

    #[tokio::test(start_paused = true)]
    async fn second_admit_is_rejected_while_pending() {
        let auth = StubAuth::biometric(BiometricResult::Success).held();
        let h = Harness::builder().protect("Notes.app").auth(auth.clone()).build();

        assert!(h.registry.admit("Notes.app", ProcessHandle::new(10)));
        assert!(!h.registry.admit("Notes.app", ProcessHandle::new(11)));
        settle().await;
        assert_eq!(auth.biometric_calls(), 1);
        let entry = h.registry.get("Notes.app").unwrap();
        assert_eq!(entry.original_process, ProcessHandle::new(10));
        assert_eq!(entry.state, AuthState::BiometricInProgress);

        auth.release();
        settle().await;
        assert!(h.registry.is_empty());
        assert!(h.registry.admit("Other.app", ProcessHandle::new(12)));
    }

    #[tokio::test(start_paused = true)]
    async fn admit_refused_during_suppression() {
        let h = Harness::builder().protect("Notes.app").build();
        h.controller
            .open_suppression("Notes.app", Duration::from_secs(2));
        assert!(!h.registry.admit("Notes.app", ProcessHandle::new(10)));
        assert!(h.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retire_is_idempotent() {
        let auth = StubAuth::biometric(BiometricResult::Success).held();
        let h = Harness::builder().protect("Notes.app").auth(auth.clone()).build();
        assert!(h.registry.admit("Notes.app", ProcessHandle::new(10)));
        assert!(h.registry.retire("Notes.app"));
        assert!(!h.registry.retire("Notes.app"));
        assert!(!h.registry.contains("Notes.app"));
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_reclaims_abandoned_prompt() {
        // プロンプトのタイムアウトより短いウォッチドッグ
        let auth = StubAuth::biometric(BiometricResult::Success).held();
        let h = Harness::builder()
            .protect("Notes.app")
            .auth(auth.clone())
            .watchdog(Duration::from_secs(30))
            .build();
        assert!(h.registry.admit("Notes.app", ProcessHandle::new(10)));

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert!(h.registry.is_empty());
        assert_eq!(h.process.launched().len(), 0);
        assert!(h.notifier.recorded().is_empty(), "cancelled flows stay silent");
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_never_retires_a_newer_entry() {
        let auth = StubAuth::biometric(BiometricResult::Success).held();
        let h = Harness::builder()
            .protect("Notes.app")
            .auth(auth.clone())
            .watchdog(Duration::from_secs(30))
            .build();
        assert!(h.registry.admit("Notes.app", ProcessHandle::new(10)));
        let first = h.registry.get("Notes.app").unwrap().ticket;

        tokio::time::sleep(Duration::from_secs(20)).await;
        h.registry.retire("Notes.app");
        assert!(h.registry.admit("Notes.app", ProcessHandle::new(11)));
        let second = h.registry.get("Notes.app").unwrap().ticket;
        assert_ne!(first, second);

        // 1件目のウォッチドッグが満了しても2件目は残る
        tokio::time::sleep(Duration::from_secs(15)).await;
        settle().await;
        assert_eq!(h.registry.get("Notes.app").map(|e| e.ticket), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn removing_identifier_cancels_flow_silently() {
        let auth = StubAuth::biometric(BiometricResult::Success).held();
        let h = Harness::builder().protect("Notes.app").auth(auth.clone()).build();
        assert!(h.registry.admit("Notes.app", ProcessHandle::new(10)));
        settle().await;

        h.controller.remove_identifier("Notes.app").unwrap();
        settle().await;
        assert!(h.registry.is_empty());
        assert!(h.process.launched().is_empty());
        assert!(h.notifier.recorded().is_empty());
    }
}
