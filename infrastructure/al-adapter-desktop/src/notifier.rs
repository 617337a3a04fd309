use al_domain::port::driven::UserNotifier;
use std::process::Command;
use tracing::{debug, warn};

/// 送りっぱなしのデスクトップ通知
///
/// 通知コマンドは別スレッドで待つので呼び出し側をブロックしない。
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn notification_command(title: &str, body: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("osascript");
        cmd.arg("-e").arg(format!(
            "display notification \"{}\" with title \"{}\"",
            escape(body),
            escape(title)
        ));
        cmd
    } else {
        let mut cmd = Command::new("notify-send");
        cmd.arg("--app-name").arg(title).arg(title).arg(body);
        cmd
    }
}

impl UserNotifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let mut cmd = notification_command(title, body);
        let body = body.to_string();
        let spawned = std::thread::Builder::new()
            .name("al-notify".into())
            .spawn(move || match cmd.output() {
                Ok(out) if out.status.success() => debug!(body = %body, "通知を表示しました"),
                Ok(out) => warn!(
                    status = %out.status,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "通知コマンドが失敗しました"
                ),
                Err(err) => warn!(error = %err, "通知コマンドを実行できません"),
            });
        if let Err(err) = spawned {
            warn!(error = %err, "通知スレッドを起動できません");
        }
    }
}
