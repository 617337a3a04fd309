//! 認証プロンプトの文脈と結果

/// プロンプトに渡す文脈（UI非依存）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengePrompt {
    pub identifier: String,
    /// ユーザーに表示する理由文
    pub reason: String,
}

impl ChallengePrompt {
    /// 生体認証用の文言
    pub fn biometric(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            reason: format!("{} is protected. Use biometrics to continue.", identifier),
        }
    }

    /// パスワード用の文言
    pub fn password(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            reason: format!(
                "{} is protected. Enter your password to continue.",
                identifier
            ),
        }
    }
}

/// 生体認証の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricResult {
    Success,
    /// 不一致またはユーザーによるキャンセル
    Failure,
    Unavailable,
}

/// パスワード認証の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeResult {
    Success,
    Failure,
}
