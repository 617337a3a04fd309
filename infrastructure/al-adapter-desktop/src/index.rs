use al_domain::error::DomainError;
use al_domain::model::app_stem;
use al_domain::port::driven::ContentIndex;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// 名前に `query` を含むアプリバンドルを探す Spotlight クエリ
pub fn build_spotlight_query(query: &str) -> String {
    let escaped = app_stem(query)
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('*', "\\*");
    format!(
        "kMDItemContentType == 'com.apple.application-bundle' && kMDItemFSName == '*{}*'cd",
        escaped
    )
}

fn parse_paths(stdout: &str) -> Vec<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Spotlight インデックス（macOS以外では常に空）
#[derive(Debug, Clone)]
pub struct SpotlightIndex {
    program: String,
}

impl Default for SpotlightIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotlightIndex {
    pub fn new() -> Self {
        Self {
            program: "mdfind".into(),
        }
    }

    fn supported(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

#[async_trait]
impl ContentIndex for SpotlightIndex {
    async fn search(&self, query: &str, timeout: Duration) -> Result<Vec<PathBuf>, DomainError> {
        if !self.supported() {
            return Ok(Vec::new());
        }
        let mut cmd = Command::new(&self.program);
        cmd.arg(build_spotlight_query(query)).kill_on_drop(true);
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| DomainError::Timeout(format!("mdfind exceeded {:?}", timeout)))?
            .map_err(|e| DomainError::IoError(format!("mdfind: {e}")))?;
        if !output.status.success() {
            return Err(DomainError::IoError(format!(
                "mdfind exited with {}",
                output.status
            )));
        }
        let paths = parse_paths(&String::from_utf8_lossy(&output.stdout));
        debug!(query, hits = paths.len(), "Spotlight検索が完了しました");
        Ok(paths)
    }
}
