//! ドメインモデル
//!
//! 値オブジェクト、エンティティ、設定型を定義

mod auth_state; // 認証ゲートの状態機械
mod config; // 監視設定（猶予時間・タイムアウト・検索パス）
mod identifier; // アプリ識別子の正規化
mod launch; // 起動イベントとプロセスハンドル
mod notification; // ユーザー通知メッセージ
mod pending; // 認証待ちエントリ
mod prompt; // 認証プロンプトの文脈と結果
mod protected_apps; // 保護対象アプリの集合
mod resolved; // 実行パス解決結果
pub mod settings; // 永続化キー
mod suppression; // 再起動直後の抑止ウィンドウ

pub use auth_state::*;
pub use config::*;
pub use identifier::*;
pub use launch::*;
pub use notification::*;
pub use pending::*;
pub use prompt::*;
pub use protected_apps::*;
pub use resolved::*;
pub use suppression::*;
