//! プロセス制御アダプター（終了・起動・実行中列挙）と起動監視
//!
//! - 終了: Unix は SIGTERM、Windows は TerminateProcess
//! - 起動: macOS は `open`、その他は実行ファイルを直接起動
//! - 監視: プロセス一覧を定期取得し、新しく現れたプロセスを起動イベントにする

mod watcher;

pub use watcher::LaunchWatcher;

use al_domain::error::DomainError;
use al_domain::model::{identifier_from_executable_path, ProcessHandle};
use al_domain::port::driven::ProcessControl;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ProcessAdapter;

impl ProcessAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// プロセスの識別子（実行ファイルのパス、取れなければプロセス名から）
pub(crate) fn process_identifier(process: &sysinfo::Process) -> Option<String> {
    let path = process
        .exe()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(process.name()));
    identifier_from_executable_path(&path)
}

#[async_trait]
impl ProcessControl for ProcessAdapter {
    fn terminate(&self, handle: ProcessHandle) -> Result<(), DomainError> {
        terminate_pid(handle.pid())
    }

    fn running(&self, identifier: &str) -> Vec<ProcessHandle> {
        let mut sys = System::new();
        sys.refresh_processes();
        let mut handles: Vec<ProcessHandle> = sys
            .processes()
            .iter()
            .filter(|(_, process)| process_identifier(process).as_deref() == Some(identifier))
            .map(|(pid, _)| ProcessHandle::new(pid.as_u32()))
            .collect();
        handles.sort();
        handles
    }

    async fn launch(&self, path: &Path) -> Result<(), DomainError> {
        debug!(path = %path.display(), "起動を要求します");
        launch_path(path).await
    }
}

#[cfg(unix)]
fn terminate_pid(pid: u32) -> Result<(), DomainError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid)
        .map_err(|_| DomainError::TerminationFailed(format!("pid out of range: {pid}")))?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // 既に終了している
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(DomainError::TerminationFailed(format!("kill {pid}: {e}"))),
    }
}

#[cfg(windows)]
fn terminate_pid(pid: u32) -> Result<(), DomainError> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    unsafe {
        let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
            Ok(handle) => handle,
            // 既に終了している（ハンドルを開けない）
            Err(_) => return Ok(()),
        };
        let result = TerminateProcess(handle, 1);
        let _ = CloseHandle(handle);
        result.map_err(|e| {
            DomainError::TerminationFailed(format!("TerminateProcess {pid}: {}", e.message()))
        })
    }
}

#[cfg(not(any(unix, windows)))]
fn terminate_pid(pid: u32) -> Result<(), DomainError> {
    Err(DomainError::TerminationFailed(format!(
        "process termination is not supported on this platform (pid {pid})"
    )))
}

#[cfg(target_os = "macos")]
async fn launch_path(path: &Path) -> Result<(), DomainError> {
    let output = tokio::process::Command::new("/usr/bin/open")
        .arg(path)
        .output()
        .await
        .map_err(|e| DomainError::LaunchFailed(format!("open: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(DomainError::LaunchFailed(if stderr.is_empty() {
            format!("open exited with {}", output.status)
        } else {
            stderr
        }))
    }
}

#[cfg(not(target_os = "macos"))]
async fn launch_path(path: &Path) -> Result<(), DomainError> {
    use std::process::Stdio;

    if path.is_dir() {
        return Err(DomainError::LaunchFailed(format!(
            "{} is a directory, not an executable",
            path.display()
        )));
    }
    let child = tokio::process::Command::new(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| DomainError::LaunchFailed(e.to_string()))?;
    // 子プロセスは待たない（Child を drop しても終了はしない）
    drop(child);
    Ok(())
}
