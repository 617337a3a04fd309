//! 設定リポジトリポート

use crate::error::DomainError;
use crate::model::LockConfig;

/// 設定ストレージポート
pub trait ConfigRepository: Send + Sync {
    /// 設定を読込（ファイルが無ければ既定値）
    fn load(&self) -> Result<LockConfig, DomainError>;

    /// 設定を保存
    fn save(&self, config: &LockConfig) -> Result<(), DomainError>;

    /// 設定ファイルの存在確認
    fn exists(&self) -> bool;
}
