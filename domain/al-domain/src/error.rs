//! ドメインエラー型

use thiserror::Error;

/// ドメイン層のエラー型
/// 各バリアントは特定の失敗シナリオを表現
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 最終段の認証に失敗（パスワード不一致・キャンセル・タイムアウト）
    #[error("Authentication denied: {0}")]
    AuthDenied(String),

    /// 全ての検索段階で対象アプリが見つからない
    #[error("Application not found: {0}")]
    AppNotFound(String),

    /// 解決済みパスの起動をOSが拒否
    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    /// プロセス終了要求の失敗（致命的ではない）
    #[error("Termination failed: {0}")]
    TerminationFailed(String),

    /// 認証プロバイダが利用不可（生体認証ハード無し、パスフレーズ未設定など）
    #[error("Authentication provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// 設定値が無効
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 設定ファイルの読み込み失敗
    #[error("Configuration load failed: {0}")]
    ConfigLoadFailed(String),

    /// ファイルI/Oエラー
    #[error("IO error: {0}")]
    IoError(String),

    /// 通知送信の失敗
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    /// タイムアウト
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl DomainError {
    /// ユーザーへ通知すべき終端エラーか（終了失敗はログのみ）
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::AuthDenied(_) | Self::AppNotFound(_) | Self::LaunchFailed(_)
        )
    }
}
