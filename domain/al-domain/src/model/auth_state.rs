//! 認証ゲートの状態機械
//!
//! ```text
//! Idle → BiometricInProgress ─┬─ 成功 ──────────────→ Authenticated
//!                             ├─ 失敗/取消 → BiometricFailed → PasswordInProgress
//!                             └─ 利用不可 ─────────────────→ PasswordInProgress
//! PasswordInProgress ─┬─ 成功 → Authenticated
//!                     └─ 失敗 → Denied
//! ```
//! 非終端状態からはキャンセル/タイムアウトで Denied に遷移できる。

use crate::DomainError;
use std::fmt;

/// ゲートの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    Idle,
    BiometricInProgress,
    BiometricFailed,
    PasswordInProgress,
    Authenticated,
    Denied,
}

/// 状態遷移を引き起こす事象
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// 生体認証段に入る
    Begin,
    /// 生体認証が利用できない
    BiometricUnavailable,
    BiometricSucceeded,
    /// 失敗・キャンセル・プロバイダエラーを含む
    BiometricFailed,
    /// パスワード段に入る
    PasswordRequested,
    PasswordSucceeded,
    PasswordFailed,
    /// 外部キャンセルまたはプロンプトのタイムアウト
    Aborted,
}

impl AuthState {
    /// 終端状態か
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Denied)
    }

    /// 遷移を適用する。許可されない組み合わせはエラー。
    pub fn apply(self, event: AuthEvent) -> Result<AuthState, DomainError> {
        use AuthEvent as E;
        use AuthState as S;
        let next = match (self, event) {
            (S::Idle, E::Begin) => S::BiometricInProgress,
            (S::BiometricInProgress, E::BiometricUnavailable) => S::PasswordInProgress,
            (S::BiometricInProgress, E::BiometricSucceeded) => S::Authenticated,
            (S::BiometricInProgress, E::BiometricFailed) => S::BiometricFailed,
            (S::BiometricFailed, E::PasswordRequested) => S::PasswordInProgress,
            (S::PasswordInProgress, E::PasswordSucceeded) => S::Authenticated,
            (S::PasswordInProgress, E::PasswordFailed) => S::Denied,
            (state, E::Aborted) if !state.is_terminal() => S::Denied,
            (state, event) => {
                return Err(DomainError::ValidationError(format!(
                    "invalid auth transition: {} on {:?}",
                    state, event
                )))
            }
        };
        Ok(next)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BiometricInProgress => "biometric_in_progress",
            Self::BiometricFailed => "biometric_failed",
            Self::PasswordInProgress => "password_in_progress",
            Self::Authenticated => "authenticated",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拒否理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// パスワード段で失敗した
    ChallengeFailed,
    /// 両段とも利用できない、またはプロバイダエラー
    ProviderUnavailable,
    /// プロンプトが時間内に応答しなかった
    TimedOut,
    /// 保護解除などで外部からキャンセルされた
    Cancelled,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChallengeFailed => "challenge_failed",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }

    /// ユーザーへアクセス拒否を通知すべきか（キャンセルは利用者自身の操作なので通知しない）
    pub fn should_notify(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// ゲート実行の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Denied(DenyReason),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}
