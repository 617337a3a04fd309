//! al-adapter-auth: パスフレーズによる本人確認アダプタ。
//!
//! 設定に保存された SHA-256 ダイジェストと入力を照合する。
//! ダイジェストは試行のたびに設定から読み直す（常駐中の `set-passphrase` をそのまま反映）。
//! 生体認証のバインディングは持たないため、生体認証段は常に「利用不可」を返し
//! ゲートはそのままパスワード段へ進む。

use al_domain::error::DomainError;
use al_domain::model::{BiometricResult, ChallengePrompt, ChallengeResult, NOTIFICATION_TITLE};
use al_domain::port::driven::{AuthProvider, ConfigRepository};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// パスフレーズの SHA-256 を小文字16進で返す
pub fn hash_passphrase(passphrase: &str) -> String {
    let digest = Sha256::digest(passphrase.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 長さが同じなら内容に依らず全バイトを比較する
fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// パスフレーズの入力元。`None` はユーザーによるキャンセル。
///
/// 呼び出し側がタイムアウトやキャンセルで future を破棄したら、入力も打ち切られる。
#[async_trait]
pub trait SecretReader: Send + Sync {
    async fn read_secret(&self, prompt: &ChallengePrompt) -> Result<Option<String>, DomainError>;
}

/// macOS のダイアログ（osascript）で入力を受け取る
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogReader;

fn dialog_command(prompt: &ChallengePrompt) -> Command {
    let script = format!(
        "display dialog \"{}\" default answer \"\" with hidden answer with title \"{}\"",
        applescript_escape(&prompt.reason),
        NOTIFICATION_TITLE
    );
    let mut command = Command::new("osascript");
    command.arg("-e").arg(script);
    command
}

/// ダイアログを出すコマンドを実行して入力値を返す。
/// future が破棄されると子プロセス（表示中のダイアログ）も終了する。
async fn run_dialog(mut command: Command) -> Result<Option<String>, DomainError> {
    let output = command
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DomainError::ProviderUnavailable(format!("osascript: {e}")))?;
    if !output.status.success() {
        // キャンセルボタンは終了コード1
        return Ok(None);
    }
    Ok(parse_dialog_answer(&String::from_utf8_lossy(&output.stdout)))
}

#[async_trait]
impl SecretReader for DialogReader {
    async fn read_secret(&self, prompt: &ChallengePrompt) -> Result<Option<String>, DomainError> {
        let answer = run_dialog(dialog_command(prompt)).await?;
        if answer.is_none() {
            debug!(identifier = %prompt.identifier, "パスワードダイアログが閉じられました");
        }
        Ok(answer)
    }
}

/// 制御端末から1行読む（端末が無ければ標準入力）
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReader;

impl TerminalReader {
    fn read_line_blocking(reason: &str) -> Result<Option<String>, DomainError> {
        eprintln!("{}", reason);
        eprint!("Password: ");
        let mut line = String::new();
        let read = match std::fs::File::open("/dev/tty") {
            Ok(tty) => BufReader::new(tty).read_line(&mut line),
            Err(_) => std::io::stdin().lock().read_line(&mut line),
        }
        .map_err(|e| DomainError::ProviderUnavailable(format!("read passphrase: {e}")))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[async_trait]
impl SecretReader for TerminalReader {
    async fn read_secret(&self, prompt: &ChallengePrompt) -> Result<Option<String>, DomainError> {
        let reason = prompt.reason.clone();
        tokio::task::spawn_blocking(move || Self::read_line_blocking(&reason))
            .await
            .map_err(|e| DomainError::ProviderUnavailable(format!("prompt task: {e}")))?
    }
}

fn applescript_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `button returned:OK, text returned:secret` から入力値を取り出す
fn parse_dialog_answer(stdout: &str) -> Option<String> {
    let line = stdout.trim_end_matches(['\r', '\n']);
    line.split_once("text returned:")
        .map(|(_, text)| text.to_string())
}

/// OSに合う既定の入力元
pub fn default_reader() -> Arc<dyn SecretReader> {
    if cfg!(target_os = "macos") {
        Arc::new(DialogReader)
    } else {
        Arc::new(TerminalReader)
    }
}

pub struct PassphraseAuthProvider {
    config: Arc<dyn ConfigRepository>,
    reader: Arc<dyn SecretReader>,
}

impl PassphraseAuthProvider {
    /// ダイジェストは `config` の `passphrase_sha256` から試行ごとに読む
    pub fn new(config: Arc<dyn ConfigRepository>, reader: Arc<dyn SecretReader>) -> Self {
        Self { config, reader }
    }

    /// 現在保存されているダイジェスト（小文字化済み）
    fn current_digest(&self) -> Result<Option<String>, DomainError> {
        Ok(self
            .config
            .load()?
            .passphrase_sha256
            .map(|d| d.to_ascii_lowercase()))
    }
}

#[async_trait]
impl AuthProvider for PassphraseAuthProvider {
    fn biometric_available(&self) -> bool {
        false
    }

    async fn try_biometric(&self, _prompt: &ChallengePrompt) -> Result<BiometricResult, DomainError> {
        Ok(BiometricResult::Unavailable)
    }

    async fn try_password(&self, prompt: &ChallengePrompt) -> Result<ChallengeResult, DomainError> {
        let Some(expected) = self.current_digest()? else {
            warn!(identifier = %prompt.identifier, "パスフレーズが設定されていません");
            return Err(DomainError::ProviderUnavailable(
                "no passphrase configured; run `applock set-passphrase`".into(),
            ));
        };
        let Some(entered) = self.reader.read_secret(prompt).await? else {
            return Ok(ChallengeResult::Failure);
        };
        if digests_match(&hash_passphrase(&entered), &expected) {
            info!(identifier = %prompt.identifier, "パスフレーズを確認しました");
            Ok(ChallengeResult::Success)
        } else {
            info!(identifier = %prompt.identifier, "パスフレーズが一致しません");
            Ok(ChallengeResult::Failure)
        }
    }
}
