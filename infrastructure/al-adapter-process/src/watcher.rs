//! プロセス一覧のポーリングによる起動監視

use crate::process_identifier;
use al_domain::model::{LaunchEvent, ProcessHandle};
use al_domain::port::driven::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 1回分のスナップショット（PID → 識別子）
type Snapshot = HashMap<u32, String>;

pub struct LaunchWatcher {
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl LaunchWatcher {
    pub fn new(poll_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            poll_interval,
            clock,
        }
    }

    /// 監視タスクを起動する。起動済みのプロセスはイベントにしない。
    pub fn spawn(self, tx: mpsc::Sender<LaunchEvent>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(tx, shutdown).await })
    }

    async fn run(self, tx: mpsc::Sender<LaunchEvent>, shutdown: CancellationToken) {
        let mut sys = System::new();
        let (returned, mut previous) = match take_snapshot(sys).await {
            Some(pair) => pair,
            None => return,
        };
        sys = returned;
        info!(processes = previous.len(), interval_ms = self.poll_interval.as_millis() as u64, "プロセス監視を開始しました");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let Some((returned, current)) = take_snapshot(sys).await else {
                break;
            };
            sys = returned;
            let now = self.clock.now_ms();
            for (pid, identifier) in new_launches(&previous, &current) {
                debug!(identifier = %identifier, pid, "新しいプロセスを検出");
                let event = LaunchEvent::new(identifier, ProcessHandle::new(pid), now);
                if tx.send(event).await.is_err() {
                    debug!("受信側が閉じたため監視を終了します");
                    return;
                }
            }
            previous = current;
        }
        info!("プロセス監視を終了しました");
    }
}

/// プロセス一覧の取得はブロッキングなので専用スレッドで行う
async fn take_snapshot(mut sys: System) -> Option<(System, Snapshot)> {
    let joined = tokio::task::spawn_blocking(move || {
        sys.refresh_processes();
        let snapshot: Snapshot = sys
            .processes()
            .iter()
            .filter_map(|(pid, process)| Some((pid.as_u32(), process_identifier(process)?)))
            .collect();
        (sys, snapshot)
    })
    .await;
    match joined {
        Ok(pair) => Some(pair),
        Err(e) => {
            warn!(error = %e, "プロセス一覧の取得に失敗しました");
            None
        }
    }
}

/// 前回に無かったPID、または exec で識別子が変わったPID（PID順）
fn new_launches(previous: &Snapshot, current: &Snapshot) -> Vec<(u32, String)> {
    let mut fresh: Vec<(u32, String)> = current
        .iter()
        .filter(|(pid, id)| previous.get(pid) != Some(*id))
        .map(|(pid, id)| (*pid, id.clone()))
        .collect();
    fresh.sort_by_key(|(pid, _)| *pid);
    fresh
}
