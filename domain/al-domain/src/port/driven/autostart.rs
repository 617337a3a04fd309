//! ログイン時自動起動の登録ポート

use crate::error::DomainError;
use std::path::Path;

pub trait AutostartRegistrar: Send + Sync {
    /// 登録（冪等）
    fn register(&self, exe_path: &Path) -> Result<(), DomainError>;

    /// 登録解除（未登録でも成功）
    fn unregister(&self) -> Result<(), DomainError>;

    /// 登録済みか
    fn is_registered(&self) -> Result<bool, DomainError>;
}
