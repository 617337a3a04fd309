//! AppLock ドメイン層
//!
//! 起動インターセプトと再認証のビジネスロジックの中核。
//! ヘキサゴナルアーキテクチャの最内層で、OS やランタイムには依存しない。
//! （非同期ポートの宣言に async-trait、エラー定義に thiserror のみ使用）

pub mod error; // ドメインエラー定義
pub mod model; // ドメインモデル（値オブジェクト、エンティティ）
pub mod port; // ポート（driving/driven）

pub use error::DomainError; // エラー型を再エクスポート
