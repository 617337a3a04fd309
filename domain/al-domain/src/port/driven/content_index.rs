//! コンテンツインデックス検索ポート（リゾルバの第3段）

use crate::error::DomainError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// 名前に `query` を含むアプリバンドルを検索する。
    ///
    /// `timeout` はアダプタ側の上限（外部コマンドの待ち時間など）。
    /// 呼び出し側も同じ値で全体を打ち切る。
    async fn search(&self, query: &str, timeout: Duration) -> Result<Vec<PathBuf>, DomainError>;
}
