//! 保護管理ユースケースポート

use crate::error::DomainError;

/// 現在の保護状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionStatus {
    /// 保護対象（挿入順）
    pub identifiers: Vec<String>,
    pub enabled: bool,
    pub autostart: bool,
    /// 認証待ちの識別子
    pub pending: Vec<String>,
    /// 抑止ウィンドウが有効な識別子
    pub suppressed: Vec<String>,
}

/// 保護管理（CLI・デーモンから呼ばれる）
pub trait ProtectionUseCase {
    /// 追加（既に登録済みなら false）
    fn add_identifier(&self, identifier: &str) -> Result<bool, DomainError>;

    /// 削除（未登録なら false）。認証中のフローはキャンセルされる。
    fn remove_identifier(&self, identifier: &str) -> Result<bool, DomainError>;

    fn set_enabled(&self, enabled: bool) -> Result<(), DomainError>;

    /// 保護を有効化し、実行中の保護対象を終了する。終了したプロセス数を返す。
    fn lock_all(&self) -> Result<usize, DomainError>;

    /// 保護を無効化する
    fn unlock_all(&self) -> Result<(), DomainError>;

    fn set_autostart(&self, enabled: bool) -> Result<(), DomainError>;

    fn status(&self) -> ProtectionStatus;
}
