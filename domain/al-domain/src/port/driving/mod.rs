//! 駆動する側のポート（入力インターフェース）。

mod protection_use_case;

pub use protection_use_case::*;
