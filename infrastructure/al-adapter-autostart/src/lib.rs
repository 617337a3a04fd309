//! al-adapter-autostart: ログイン時に監視デーモンを起動する登録のアダプタ。
//!
//! - macOS: `~/Library/LaunchAgents` の plist を生成し `launchctl load/unload`
//! - Windows: スタートアップフォルダに起動用 `.cmd` を置く
//! - その他: XDG autostart の `.desktop` を置く

use al_domain::error::DomainError;
use al_domain::port::driven::AutostartRegistrar;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// launchd のラベル
pub const LAUNCH_AGENT_LABEL: &str = "com.applock.monitor";

/// 登録ファイルの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutostartKind {
    /// launchd の LaunchAgent（サービスマネージャへの load/unload を伴う）
    LaunchAgent,
    /// XDG autostart エントリ
    DesktopEntry,
    /// Windows スタートアップフォルダのスクリプト
    StartupScript,
}

impl AutostartKind {
    /// 実行中のOSに合う形式
    pub fn native() -> Self {
        if cfg!(target_os = "macos") {
            Self::LaunchAgent
        } else if cfg!(windows) {
            Self::StartupScript
        } else {
            Self::DesktopEntry
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutostartAdapter {
    kind: AutostartKind,
    file_path: PathBuf,
}

impl AutostartAdapter {
    pub fn new(kind: AutostartKind, file_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            file_path: file_path.into(),
        }
    }

    /// 現在のユーザー向けの既定配置
    pub fn for_current_user() -> Result<Self, DomainError> {
        let kind = AutostartKind::native();
        let file_path = match kind {
            AutostartKind::LaunchAgent => al_adapter_paths::home_dir()
                .map(|h| h.join("Library").join("LaunchAgents"))
                .map(|d| d.join(format!("{LAUNCH_AGENT_LABEL}.plist"))),
            AutostartKind::StartupScript => std::env::var_os("APPDATA").map(|appdata| {
                PathBuf::from(appdata)
                    .join("Microsoft")
                    .join("Windows")
                    .join("Start Menu")
                    .join("Programs")
                    .join("Startup")
                    .join("applock-monitor.cmd")
            }),
            AutostartKind::DesktopEntry => std::env::var_os("XDG_CONFIG_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| al_adapter_paths::home_dir().map(|h| h.join(".config")))
                .map(|d| d.join("autostart").join("applock-monitor.desktop")),
        }
        .ok_or_else(|| DomainError::IoError("cannot determine autostart location".into()))?;
        Ok(Self::new(kind, file_path))
    }

    pub fn kind(&self) -> AutostartKind {
        self.kind
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn render(&self, exe_path: &Path) -> String {
        match self.kind {
            AutostartKind::LaunchAgent => render_launch_agent_plist(LAUNCH_AGENT_LABEL, exe_path),
            AutostartKind::DesktopEntry => render_desktop_entry(exe_path),
            AutostartKind::StartupScript => render_startup_script(exe_path),
        }
    }
}

impl AutostartRegistrar for AutostartAdapter {
    fn register(&self, exe_path: &Path) -> Result<(), DomainError> {
        if let Some(dir) = self.file_path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| DomainError::IoError(format!("create_dir_all: {e}")))?;
        }
        fs::write(&self.file_path, self.render(exe_path))
            .map_err(|e| DomainError::IoError(format!("write {}: {e}", self.file_path.display())))?;
        if self.kind == AutostartKind::LaunchAgent {
            // 既に読み込み済みだと load は失敗するので先に外す
            let _ = launchctl("unload", &self.file_path);
            launchctl("load", &self.file_path)?;
        }
        info!(path = %self.file_path.display(), "自動起動を登録しました");
        Ok(())
    }

    fn unregister(&self) -> Result<(), DomainError> {
        if !self.file_path.exists() {
            return Ok(());
        }
        if self.kind == AutostartKind::LaunchAgent {
            if let Err(err) = launchctl("unload", &self.file_path) {
                warn!(error = %err, "launchctl unload に失敗しました");
            }
        }
        fs::remove_file(&self.file_path)
            .map_err(|e| DomainError::IoError(format!("remove {}: {e}", self.file_path.display())))?;
        info!(path = %self.file_path.display(), "自動起動を解除しました");
        Ok(())
    }

    fn is_registered(&self) -> Result<bool, DomainError> {
        Ok(self.file_path.exists())
    }
}

fn launchctl(verb: &str, plist: &Path) -> Result<(), DomainError> {
    let output = Command::new("launchctl")
        .arg(verb)
        .arg(plist)
        .output()
        .map_err(|e| DomainError::IoError(format!("launchctl {verb}: {e}")))?;
    if output.status.success() {
        debug!(verb, "launchctl が成功しました");
        Ok(())
    } else {
        Err(DomainError::IoError(format!(
            "launchctl {verb} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_launch_agent_plist(label: &str, exe_path: &Path) -> String {
    let exe = xml_escape(&exe_path.to_string_lossy());
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{exe}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <false/>
</dict>
</plist>
"#,
        label = xml_escape(label),
        exe = exe
    )
}

pub fn render_desktop_entry(exe_path: &Path) -> String {
    // Exec はスペースを含むパスを引用符で囲む
    let exe = exe_path.to_string_lossy().replace('"', "\\\"");
    format!(
        "[Desktop Entry]\nType=Application\nName=AppLock Monitor\nExec=\"{exe}\"\nX-GNOME-Autostart-enabled=true\nNoDisplay=true\n"
    )
}

pub fn render_startup_script(exe_path: &Path) -> String {
    format!("@echo off\r\nstart \"\" \"{}\"\r\n", exe_path.display())
}
