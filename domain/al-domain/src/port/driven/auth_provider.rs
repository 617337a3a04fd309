//! 認証プロバイダポート（生体認証／パスワード）

use crate::error::DomainError;
use crate::model::{BiometricResult, ChallengePrompt, ChallengeResult};
use async_trait::async_trait;

/// ユーザー本人確認のアダプタ
///
/// プロンプトは長時間ブロックし得るため非同期。
/// 呼び出し側がタイムアウトとキャンセルで囲む。
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// 生体認証が利用可能か（ハードウェア・登録状況）
    fn biometric_available(&self) -> bool;

    async fn try_biometric(&self, prompt: &ChallengePrompt) -> Result<BiometricResult, DomainError>;

    async fn try_password(&self, prompt: &ChallengePrompt) -> Result<ChallengeResult, DomainError>;
}
