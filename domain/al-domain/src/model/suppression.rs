use std::collections::HashMap;

/// 再起動直後の起動通知を無視するための時限ウィンドウ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressionWindow {
    /// 失効時刻（エポックからのミリ秒）
    pub expires_at_ms: u64,
}

impl SuppressionWindow {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// 識別子ごとの抑止ウィンドウ。
///
/// 失効はタイマーではなく参照時に遅延評価する。
#[derive(Debug, Clone, Default)]
pub struct SuppressionWindows {
    windows: HashMap<String, SuppressionWindow>,
}

impl SuppressionWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// ウィンドウを開く（既存があれば延長・上書き）
    pub fn open(&mut self, identifier: &str, now_ms: u64, ttl_ms: u64) {
        self.windows.insert(
            identifier.to_string(),
            SuppressionWindow {
                expires_at_ms: now_ms.saturating_add(ttl_ms),
            },
        );
    }

    /// 明示的に閉じる。存在した場合のみ `true`。
    pub fn clear(&mut self, identifier: &str) -> bool {
        self.windows.remove(identifier).is_some()
    }

    /// 有効なウィンドウがあるか。失効済みはここで取り除く。
    pub fn is_active(&mut self, identifier: &str, now_ms: u64) -> bool {
        match self.windows.get(identifier) {
            Some(window) if !window.is_expired(now_ms) => true,
            Some(_) => {
                self.windows.remove(identifier);
                false
            }
            None => false,
        }
    }

    /// 期限内の識別子（名前順）。期限切れは取り除かない。
    pub fn active_identifiers(&self, now_ms: u64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .windows
            .iter()
            .filter(|(_, w)| !w.is_expired(now_ms))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
