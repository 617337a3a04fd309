//! キー・バリュー設定ストアポート

use crate::error::DomainError;

/// 保護リストとフラグの永続化
pub trait SettingsStore: Send + Sync {
    /// 文字列リストを読込（キーが無ければ None）
    fn load_list(&self, key: &str) -> Result<Option<Vec<String>>, DomainError>;

    fn save_list(&self, key: &str, items: &[String]) -> Result<(), DomainError>;

    /// フラグを読込（キーが無ければ None）
    fn load_flag(&self, key: &str) -> Result<Option<bool>, DomainError>;

    fn save_flag(&self, key: &str, value: bool) -> Result<(), DomainError>;
}
