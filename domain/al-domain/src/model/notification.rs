//! ユーザー通知メッセージ（表示側で整形するための構造）

/// 通知のタイトル
pub const NOTIFICATION_TITLE: &str = "AppLock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockNotification {
    /// 認証の最終段で拒否された
    AccessDenied { identifier: String },
    /// 全ての検索段階で見つからなかった
    AppNotFound { identifier: String },
    /// 解決済みパスの起動に失敗した
    LaunchFailed { identifier: String, detail: String },
}

impl LockNotification {
    pub fn identifier(&self) -> &str {
        match self {
            Self::AccessDenied { identifier }
            | Self::AppNotFound { identifier }
            | Self::LaunchFailed { identifier, .. } => identifier,
        }
    }

    /// ログ/集計用の種別名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "access_denied",
            Self::AppNotFound { .. } => "app_not_found",
            Self::LaunchFailed { .. } => "launch_failed",
        }
    }

    /// 再起動失敗（認証は成功済み）に分類されるか
    pub fn is_relaunch_failure(&self) -> bool {
        matches!(self, Self::AppNotFound { .. } | Self::LaunchFailed { .. })
    }

    pub fn fallback_message(&self) -> String {
        match self {
            Self::AccessDenied { identifier } => {
                format!("Access denied for {}. Authentication failed.", identifier)
            }
            Self::AppNotFound { identifier } => format!(
                "Could not find {} to relaunch. Please check if the app is installed.",
                identifier
            ),
            Self::LaunchFailed { identifier, detail } => {
                format!("Failed to launch {}. {}", identifier, detail)
            }
        }
    }
}
