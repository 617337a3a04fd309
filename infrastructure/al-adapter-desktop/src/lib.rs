//! al-adapter-desktop: デスクトップ連携アダプタ
//!
//! - 通知: macOS は osascript、その他は notify-send
//! - コンテンツインデックス: macOS の Spotlight（mdfind）

mod index;
mod notifier;

pub use index::{SpotlightIndex, build_spotlight_query};
pub use notifier::DesktopNotifier;
