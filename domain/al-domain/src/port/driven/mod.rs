//! 駆動ポート（出力インターフェース）。
//!
//! ドメインが外部に求める機能を定義する。
//! インフラ層のアダプタが実装する。
//! 非同期タスクから共有されるため、すべて `Send + Sync` を要求する。

mod app_catalog;
mod auth_provider;
mod autostart;
mod clock;
mod config_repository;
mod content_index;
mod process_control;
mod settings_store;
mod user_notifier;

pub use app_catalog::*;
pub use auth_provider::*;
pub use autostart::*;
pub use clock::*;
pub use config_repository::*;
pub use content_index::*;
pub use process_control::*;
pub use settings_store::*;
pub use user_notifier::*;
