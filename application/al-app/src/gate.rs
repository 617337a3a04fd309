//! 認証ゲート（生体認証→パスワードの二段チャレンジ）
//!
//! 1回の `run` が1つの終端結果を返す。同じ識別子の重複実行はレジストリ側で防ぐ。
//! 各プロンプトはタイムアウトとキャンセルトークンで囲まれ、どちらも拒否として扱う。

use crate::controller::ProtectionController;
use crate::resolver::AppResolver;
use al_domain::model::{
    AuthEvent, AuthOutcome, AuthState, BiometricResult, ChallengePrompt, ChallengeResult,
    DenyReason, LockConfig, LockNotification,
};
use al_domain::port::driven::{AuthProvider, UserNotifier};
use al_domain::DomainError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct GateDeps {
    pub auth: Arc<dyn AuthProvider>,
    pub resolver: Arc<AppResolver>,
    pub controller: Arc<ProtectionController>,
    pub notifier: Arc<dyn UserNotifier>,
}

#[derive(Debug, Clone, Copy)]
pub struct GateTimings {
    /// 各プロンプトの応答待ち上限
    pub prompt_timeout: Duration,
    /// 再起動後に起動通知を無視する猶予
    pub suppression_grace: Duration,
}

impl GateTimings {
    pub fn from_config(config: &LockConfig) -> Self {
        Self {
            prompt_timeout: config.prompt_timeout(),
            suppression_grace: config.suppression_grace(),
        }
    }
}

impl Default for GateTimings {
    fn default() -> Self {
        Self::from_config(&LockConfig::default())
    }
}

pub struct AuthenticationGate {
    deps: GateDeps,
    timings: GateTimings,
}

/// 状態遷移を進めて報告する
struct Progress<'a> {
    identifier: &'a str,
    state: AuthState,
    report: &'a (dyn Fn(AuthState) + Send + Sync),
}

impl Progress<'_> {
    fn advance(&mut self, event: AuthEvent) {
        match self.state.apply(event) {
            Ok(next) => {
                debug!(identifier = self.identifier, from = %self.state, to = %next, "認証状態遷移");
                self.state = next;
                (self.report)(next);
            }
            Err(err) => warn!(identifier = self.identifier, error = %err, "不正な認証状態遷移を無視"),
        }
    }
}

impl AuthenticationGate {
    pub fn new(deps: GateDeps, timings: GateTimings) -> Self {
        Self { deps, timings }
    }

    /// チャレンジを実行し、成功なら再起動、拒否なら通知する。
    ///
    /// 状態遷移は `report` へ逐次渡す。
    pub async fn run(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
        report: &(dyn Fn(AuthState) + Send + Sync),
    ) -> AuthOutcome {
        let outcome = self.authenticate(identifier, cancel, report).await;
        match outcome {
            AuthOutcome::Authenticated => {
                info!(identifier, "認証に成功しました。再起動します");
                self.relaunch(identifier).await;
            }
            AuthOutcome::Denied(reason) => {
                info!(identifier, reason = reason.as_str(), "アクセスを拒否しました");
                if reason.should_notify() {
                    self.deps
                        .notifier
                        .notify_message(&LockNotification::AccessDenied {
                            identifier: identifier.to_string(),
                        });
                }
            }
        }
        outcome
    }

    /// 解決してから起動する。抑止ウィンドウは起動要求の直前に開き、完了後に張り直す。
    /// 猶予は解決にかかった時間を含まず、起動時点から数える。
    async fn relaunch(&self, identifier: &str) {
        let controller = &self.deps.controller;
        let grace = self.timings.suppression_grace;
        let launched = self
            .deps
            .resolver
            .resolve_and_launch(identifier, |_| controller.open_suppression(identifier, grace))
            .await;
        match launched {
            Ok(resolved) => {
                controller.open_suppression(identifier, grace);
                info!(identifier, path = %resolved.path.display(), tier = %resolved.tier, "再起動しました");
            }
            Err(err) => {
                // 抑止すべき起動がないので即座に閉じる（認証結果は維持）
                controller.clear_suppression(identifier);
                warn!(identifier, error = %err, "再起動に失敗しました");
            }
        }
    }

    /// 状態機械だけを進める（再起動・通知なし）
    pub async fn authenticate(
        &self,
        identifier: &str,
        cancel: &CancellationToken,
        report: &(dyn Fn(AuthState) + Send + Sync),
    ) -> AuthOutcome {
        let mut progress = Progress {
            identifier,
            state: AuthState::Idle,
            report,
        };
        progress.advance(AuthEvent::Begin);

        let auth = self.deps.auth.as_ref();
        if !auth.biometric_available() {
            debug!(identifier, "生体認証は利用できません");
            progress.advance(AuthEvent::BiometricUnavailable);
        } else {
            let prompt = ChallengePrompt::biometric(identifier);
            match self.bounded(cancel, auth.try_biometric(&prompt)).await {
                Ok(Ok(BiometricResult::Success)) => {
                    progress.advance(AuthEvent::BiometricSucceeded);
                    return AuthOutcome::Authenticated;
                }
                Ok(Ok(BiometricResult::Unavailable)) => {
                    progress.advance(AuthEvent::BiometricUnavailable);
                }
                Ok(Ok(BiometricResult::Failure)) => {
                    progress.advance(AuthEvent::BiometricFailed);
                    progress.advance(AuthEvent::PasswordRequested);
                }
                Ok(Err(err)) => {
                    warn!(identifier, error = %err, "生体認証プロバイダのエラー。パスワードに切り替えます");
                    progress.advance(AuthEvent::BiometricFailed);
                    progress.advance(AuthEvent::PasswordRequested);
                }
                Err(reason) => {
                    progress.advance(AuthEvent::Aborted);
                    return AuthOutcome::Denied(reason);
                }
            }
        }

        let prompt = ChallengePrompt::password(identifier);
        match self.bounded(cancel, auth.try_password(&prompt)).await {
            Ok(Ok(ChallengeResult::Success)) => {
                progress.advance(AuthEvent::PasswordSucceeded);
                AuthOutcome::Authenticated
            }
            Ok(Ok(ChallengeResult::Failure)) => {
                progress.advance(AuthEvent::PasswordFailed);
                AuthOutcome::Denied(DenyReason::ChallengeFailed)
            }
            Ok(Err(err)) => {
                warn!(identifier, error = %err, "パスワードプロバイダのエラー");
                progress.advance(AuthEvent::PasswordFailed);
                match err {
                    DomainError::ProviderUnavailable(_) => {
                        AuthOutcome::Denied(DenyReason::ProviderUnavailable)
                    }
                    _ => AuthOutcome::Denied(DenyReason::ChallengeFailed),
                }
            }
            Err(reason) => {
                progress.advance(AuthEvent::Aborted);
                AuthOutcome::Denied(reason)
            }
        }
    }

    /// プロンプトをタイムアウトとキャンセルで囲む
    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        prompt: impl Future<Output = T>,
    ) -> Result<T, DenyReason> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DenyReason::Cancelled),
            result = tokio::time::timeout(self.timings.prompt_timeout, prompt) => {
                result.map_err(|_| DenyReason::TimedOut)
            }
        }
    }
}
