use std::fmt;

/// OS 上のプロセスを指す不透明なハンドル（PID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessHandle(u32);

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self(pid)
    }

    pub fn pid(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// 起動通知（OS 側で生成され、即座に消費される）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEvent {
    pub identifier: String,
    pub process: ProcessHandle,
    /// 観測時刻（エポックからのミリ秒）
    pub observed_at_ms: u64,
}

impl LaunchEvent {
    pub fn new(identifier: impl Into<String>, process: ProcessHandle, observed_at_ms: u64) -> Self {
        Self {
            identifier: identifier.into(),
            process,
            observed_at_ms,
        }
    }
}
