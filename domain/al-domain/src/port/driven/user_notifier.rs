//! ユーザー通知ポート

use crate::model::{LockNotification, NOTIFICATION_TITLE};

/// デスクトップ通知（送りっぱなし、失敗はアダプタがログに残す）
pub trait UserNotifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);

    /// 翻訳用メッセージ（既定は英語のフォールバックを表示）
    fn notify_message(&self, msg: &LockNotification) {
        self.notify(NOTIFICATION_TITLE, &msg.fallback_message());
    }
}
