//! インストールディレクトリ参照ポート（リゾルバの第1段・第2段）

use crate::error::DomainError;
use std::path::{Path, PathBuf};

/// ディレクトリ一覧の1要素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// ファイル名（大文字小文字は保持）
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir,
        }
    }
}

/// ファイルシステム上のアプリ配置を参照する
pub trait AppCatalog: Send + Sync {
    /// パスが存在するか
    fn exists(&self, path: &Path) -> bool;

    /// ディレクトリ直下の要素を列挙する（順序はアダプタが決める）
    fn list_entries(&self, dir: &Path) -> Result<Vec<CatalogEntry>, DomainError>;
}
