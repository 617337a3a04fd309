use super::{AuthState, ProcessHandle};

/// 認証中の識別子ごとに1件だけ存在するエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRelaunch {
    pub identifier: String,
    pub original_process: ProcessHandle,
    pub state: AuthState,
    /// 登録時刻（エポックからのミリ秒）
    pub enqueued_at_ms: u64,
    /// 同一識別子の再登録と区別するための世代番号
    pub ticket: u64,
}

impl PendingRelaunch {
    pub fn new(
        identifier: impl Into<String>,
        original_process: ProcessHandle,
        enqueued_at_ms: u64,
        ticket: u64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            original_process,
            state: AuthState::Idle,
            enqueued_at_ms,
            ticket,
        }
    }

    /// 登録からの経過時間（ミリ秒）
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.enqueued_at_ms)
    }
}
