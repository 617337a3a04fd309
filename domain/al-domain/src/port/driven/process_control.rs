//! プロセス制御ポート（終了・起動・実行中列挙）

use crate::error::DomainError;
use crate::model::ProcessHandle;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// 終了を要求する。既に終了していたプロセスはエラーにしない。
    fn terminate(&self, handle: ProcessHandle) -> Result<(), DomainError>;

    /// 識別子に一致する実行中プロセス
    fn running(&self, identifier: &str) -> Vec<ProcessHandle>;

    /// 解決済みパスを起動する
    async fn launch(&self, path: &Path) -> Result<(), DomainError>;
}
