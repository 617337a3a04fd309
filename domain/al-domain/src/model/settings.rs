//! 設定ストアのキー

/// 保護対象アプリ一覧
pub const LOCKED_APPS_KEY: &str = "LockedApps";
/// 保護の有効/無効
pub const LOCKING_ENABLED_KEY: &str = "LockingEnabled";
/// ログイン時の自動起動
pub const AUTO_START_KEY: &str = "AutoStartEnabled";
