//! 保護状態のコーディネータ。
//!
//! 保護リストの追加/削除、全体の有効化、抑止ウィンドウを管理する。
//! 変更のたびに設定ストアへ保存し、`watch` チャネルへスナップショットを流す。

use crate::monitor::LaunchDisposition;
use crate::state::ProtectionCore;
use al_domain::model::settings::{AUTO_START_KEY, LOCKED_APPS_KEY, LOCKING_ENABLED_KEY};
use al_domain::model::{normalize_identifier, ProtectedAppSet};
use al_domain::port::driven::{AutostartRegistrar, Clock, ProcessControl, SettingsStore};
use al_domain::port::driving::{ProtectionStatus, ProtectionUseCase};
use al_domain::DomainError;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct ControllerDeps {
    pub settings: Arc<dyn SettingsStore>,
    pub process: Arc<dyn ProcessControl>,
    pub autostart: Arc<dyn AutostartRegistrar>,
    pub clock: Arc<dyn Clock>,
    /// 自動起動に登録する実行ファイル（監視デーモン）
    pub exe_path: PathBuf,
}

pub struct ProtectionController {
    core: Mutex<ProtectionCore>,
    deps: ControllerDeps,
    status_tx: watch::Sender<ProtectionStatus>,
}

/// 設定ストアから読んだ状態
struct Persisted {
    apps: ProtectedAppSet,
    enabled: bool,
    autostart: bool,
}

fn load_persisted(settings: &dyn SettingsStore) -> Result<Persisted, DomainError> {
    let apps = ProtectedAppSet::from_persisted(settings.load_list(LOCKED_APPS_KEY)?.unwrap_or_default());
    let enabled = settings.load_flag(LOCKING_ENABLED_KEY)?.unwrap_or(true);
    // 初回起動時は自動起動を有効として書き戻す
    let autostart = match settings.load_flag(AUTO_START_KEY)? {
        Some(value) => value,
        None => {
            settings.save_flag(AUTO_START_KEY, true)?;
            true
        }
    };
    Ok(Persisted {
        apps,
        enabled,
        autostart,
    })
}

impl ProtectionController {
    /// 永続化済みのリストとフラグから構築する
    pub fn load(deps: ControllerDeps) -> Result<Self, DomainError> {
        let persisted = load_persisted(deps.settings.as_ref())?;
        let core = ProtectionCore::new(persisted.apps, persisted.enabled, persisted.autostart);
        let (status_tx, _) = watch::channel(core.status(deps.clock.now_ms()));
        info!(
            protected = core.apps.len(),
            enabled = core.enabled,
            autostart = core.autostart,
            "保護状態を読み込みました"
        );
        Ok(Self {
            core: Mutex::new(core),
            deps,
            status_tx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ProtectionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ロックを取って共有状態を操作し、変更を通知する
    pub(crate) fn with_core<R>(&self, f: impl FnOnce(&mut ProtectionCore, u64) -> R) -> R {
        let now = self.deps.clock.now_ms();
        let mut core = self.lock();
        let result = f(&mut core, now);
        self.status_tx.send_replace(core.status(now));
        result
    }

    pub fn now_ms(&self) -> u64 {
        self.deps.clock.now_ms()
    }

    /// 状態変更の購読
    pub fn subscribe(&self) -> watch::Receiver<ProtectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    pub fn is_protected(&self, identifier: &str) -> bool {
        self.lock().apps.contains(identifier)
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.lock().apps.to_vec()
    }

    /// 起動通知を受けてよいかを1回のロックで判定する（有効フラグ→抑止→所属）
    pub(crate) fn screen_launch(&self, identifier: &str) -> LaunchDisposition {
        let now = self.deps.clock.now_ms();
        let mut core = self.lock();
        if !core.enabled {
            LaunchDisposition::Disabled
        } else if core.suppressions.is_active(identifier, now) {
            LaunchDisposition::Suppressed
        } else if !core.apps.contains(identifier) {
            LaunchDisposition::Unprotected
        } else {
            LaunchDisposition::Intercepted
        }
    }

    /// 再起動直後の起動通知を `ttl` の間無視する
    pub fn open_suppression(&self, identifier: &str, ttl: Duration) {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.with_core(|core, now| core.suppressions.open(identifier, now, ttl_ms));
        debug!(identifier, ttl_ms, "抑止ウィンドウを開きました");
    }

    pub fn clear_suppression(&self, identifier: &str) -> bool {
        let cleared = self.with_core(|core, _| core.suppressions.clear(identifier));
        if cleared {
            debug!(identifier, "抑止ウィンドウを閉じました");
        }
        cleared
    }

    pub fn is_suppressed(&self, identifier: &str) -> bool {
        let now = self.deps.clock.now_ms();
        self.lock().suppressions.is_active(identifier, now)
    }

    /// 初回起動時など、フラグが有効なのに未登録なら登録する
    pub fn ensure_autostart(&self) -> Result<bool, DomainError> {
        if !self.lock().autostart {
            return Ok(false);
        }
        if self.deps.autostart.is_registered()? {
            return Ok(false);
        }
        self.deps.autostart.register(&self.deps.exe_path)?;
        info!(exe = %self.deps.exe_path.display(), "自動起動を登録しました");
        Ok(true)
    }

    /// 外部（CLI）での変更を取り込む。保護対象から外れた認証はキャンセルする。
    pub fn reload_from_store(&self) -> Result<bool, DomainError> {
        let persisted = load_persisted(self.deps.settings.as_ref())?;
        let (changed, cancelled) = self.with_core(|core, _| {
            let changed = core.apps != persisted.apps
                || core.enabled != persisted.enabled
                || core.autostart != persisted.autostart;
            core.apps = persisted.apps;
            core.enabled = persisted.enabled;
            core.autostart = persisted.autostart;
            (changed, core.cancel_unprotected())
        });
        if changed {
            info!(cancelled, "設定の変更を反映しました");
        }
        Ok(changed)
    }
}

impl ProtectionUseCase for ProtectionController {
    fn add_identifier(&self, identifier: &str) -> Result<bool, DomainError> {
        let identifier = normalize_identifier(identifier);
        let settings = self.deps.settings.clone();
        let added = self.with_core(|core, _| -> Result<bool, DomainError> {
            let mut next = core.apps.clone();
            if !next.insert(identifier.as_str())? {
                return Ok(false);
            }
            settings.save_list(LOCKED_APPS_KEY, &next.to_vec())?;
            core.apps = next;
            Ok(true)
        })?;
        if added {
            info!(identifier = %identifier, "保護対象に追加しました");
        }
        Ok(added)
    }

    fn remove_identifier(&self, identifier: &str) -> Result<bool, DomainError> {
        let identifier = normalize_identifier(identifier);
        let settings = self.deps.settings.clone();
        let removed = self.with_core(|core, _| -> Result<bool, DomainError> {
            let mut next = core.apps.clone();
            if !next.remove(&identifier) {
                return Ok(false);
            }
            settings.save_list(LOCKED_APPS_KEY, &next.to_vec())?;
            core.apps = next;
            if let Some(entry) = core.pending.get(&identifier) {
                entry.cancel.cancel();
            }
            Ok(true)
        })?;
        if removed {
            info!(identifier = %identifier, "保護対象から削除しました");
        }
        Ok(removed)
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), DomainError> {
        let settings = self.deps.settings.clone();
        self.with_core(|core, _| -> Result<(), DomainError> {
            settings.save_flag(LOCKING_ENABLED_KEY, enabled)?;
            core.enabled = enabled;
            Ok(())
        })?;
        info!(enabled, "保護を切り替えました");
        Ok(())
    }

    fn lock_all(&self) -> Result<usize, DomainError> {
        self.set_enabled(true)?;
        let mut terminated = 0;
        for identifier in self.identifiers() {
            for handle in self.deps.process.running(&identifier) {
                match self.deps.process.terminate(handle) {
                    Ok(()) => terminated += 1,
                    Err(err) => {
                        warn!(identifier = %identifier, pid = handle.pid(), error = %err, "実行中プロセスの終了に失敗")
                    }
                }
            }
        }
        info!(terminated, "全保護対象をロックしました");
        Ok(terminated)
    }

    fn unlock_all(&self) -> Result<(), DomainError> {
        self.set_enabled(false)
    }

    fn set_autostart(&self, enabled: bool) -> Result<(), DomainError> {
        if enabled {
            self.deps.autostart.register(&self.deps.exe_path)?;
        } else {
            self.deps.autostart.unregister()?;
        }
        let settings = self.deps.settings.clone();
        self.with_core(|core, _| -> Result<(), DomainError> {
            settings.save_flag(AUTO_START_KEY, enabled)?;
            core.autostart = enabled;
            Ok(())
        })?;
        info!(enabled, "自動起動を切り替えました");
        Ok(())
    }

    fn status(&self) -> ProtectionStatus {
        let now = self.deps.clock.now_ms();
        self.lock().status(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, MemorySettings, StubAutostart, StubProcess};
    use al_domain::model::ProcessHandle;

    #[test]
    fn add_is_idempotent_and_persisted() {
        let h = Harness::builder().build();
        assert!(h.controller.add_identifier("TestApp.app").unwrap());
        assert!(!h.controller.add_identifier("TestApp.app").unwrap());
        assert_eq!(h.controller.identifiers(), vec!["TestApp.app"]);
        assert_eq!(
            h.settings.list(LOCKED_APPS_KEY),
            Some(vec!["TestApp.app".to_string()])
        );
    }

    #[test]
    fn remove_reports_absence_without_error() {
        let h = Harness::builder().protect("TestApp.app").build();
        assert!(h.controller.remove_identifier("TestApp.app").unwrap());
        assert!(!h.controller.remove_identifier("TestApp.app").unwrap());
        assert!(!h.controller.is_protected("TestApp.app"));
        assert_eq!(h.settings.list(LOCKED_APPS_KEY), Some(vec![]));
    }

    #[test]
    fn invalid_identifier_is_rejected_and_not_persisted() {
        let h = Harness::builder().build();
        assert!(h.controller.add_identifier("a/b.app").is_err());
        assert_eq!(h.settings.list(LOCKED_APPS_KEY), None);
    }

    #[test]
    fn failed_save_leaves_set_unchanged() {
        let settings = Arc::new(MemorySettings::default());
        let h = Harness::builder().settings(settings.clone()).build();
        settings.fail_saves(true);
        assert!(h.controller.add_identifier("Notes.app").is_err());
        assert!(h.controller.identifiers().is_empty());
    }

    #[test]
    fn first_load_writes_autostart_default() {
        let h = Harness::builder().build();
        assert_eq!(h.settings.flag(AUTO_START_KEY), Some(true));
        let status = h.controller.status();
        assert!(status.enabled);
        assert!(status.autostart);
    }

    #[test]
    fn persisted_flags_are_respected() {
        let settings = Arc::new(MemorySettings::default());
        settings.save_flag(AUTO_START_KEY, false).unwrap();
        settings.save_flag(LOCKING_ENABLED_KEY, false).unwrap();
        let h = Harness::builder().settings(settings).build();
        assert!(!h.controller.is_enabled());
        assert!(!h.controller.status().autostart);
    }

    #[test]
    fn suppression_expires_lazily() {
        let h = Harness::builder().protect("Notes.app").build();
        h.controller
            .open_suppression("Notes.app", Duration::from_millis(2_000));
        assert!(h.controller.is_suppressed("Notes.app"));
        assert!(!h.controller.is_suppressed("Mail.app"));
        h.clock.advance(2_000);
        assert!(!h.controller.is_suppressed("Notes.app"));
    }

    #[test]
    fn screening_consults_open_suppression_then_drops_it() {
        let h = Harness::builder().protect("Notes.app").build();
        h.controller
            .open_suppression("Notes.app", Duration::from_millis(2_000));
        assert_eq!(h.controller.screen_launch("Notes.app"), LaunchDisposition::Suppressed);
        h.clock.advance(1_999);
        assert_eq!(h.controller.screen_launch("Notes.app"), LaunchDisposition::Suppressed);
        h.clock.advance(1);
        assert_eq!(h.controller.screen_launch("Notes.app"), LaunchDisposition::Intercepted);
        assert!(!h.controller.is_suppressed("Notes.app"));
    }

    #[test]
    fn lock_all_enables_and_terminates_running_instances() {
        let process = Arc::new(StubProcess::default());
        process.set_running("Notes.app", vec![ProcessHandle::new(41), ProcessHandle::new(42)]);
        let h = Harness::builder()
            .protect("Notes.app")
            .protect("Mail.app")
            .process(process.clone())
            .build();
        h.controller.unlock_all().unwrap();
        assert!(!h.controller.is_enabled());

        assert_eq!(h.controller.lock_all().unwrap(), 2);
        assert!(h.controller.is_enabled());
        assert_eq!(
            process.terminated(),
            vec![ProcessHandle::new(41), ProcessHandle::new(42)]
        );
        assert_eq!(h.settings.flag(LOCKING_ENABLED_KEY), Some(true));
    }

    #[test]
    fn set_autostart_registers_and_persists() {
        let autostart = Arc::new(StubAutostart::default());
        let h = Harness::builder().autostart(autostart.clone()).build();
        h.controller.set_autostart(false).unwrap();
        assert!(!autostart.is_registered().unwrap());
        assert_eq!(h.settings.flag(AUTO_START_KEY), Some(false));

        h.controller.set_autostart(true).unwrap();
        assert!(autostart.is_registered().unwrap());
        assert!(h.controller.status().autostart);
    }

    #[test]
    fn ensure_autostart_registers_once() {
        let autostart = Arc::new(StubAutostart::default());
        let h = Harness::builder().autostart(autostart.clone()).build();
        assert!(h.controller.ensure_autostart().unwrap());
        assert!(!h.controller.ensure_autostart().unwrap());
    }

    #[test]
    fn reload_picks_up_external_edits() {
        let h = Harness::builder().protect("Notes.app").build();
        h.settings
            .save_list(LOCKED_APPS_KEY, &["Mail.app".to_string()])
            .unwrap();
        assert!(h.controller.reload_from_store().unwrap());
        assert!(h.controller.is_protected("Mail.app"));
        assert!(!h.controller.is_protected("Notes.app"));
        assert!(!h.controller.reload_from_store().unwrap());
    }

    #[test]
    fn subscribers_see_mutations() {
        let h = Harness::builder().build();
        let rx = h.controller.subscribe();
        h.controller.add_identifier("Notes.app").unwrap();
        h.controller.set_enabled(false).unwrap();
        let status = rx.borrow().clone();
        assert_eq!(status.identifiers, vec!["Notes.app"]);
        assert!(!status.enabled);
    }
}
