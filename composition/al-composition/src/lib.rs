//! al-composition: 各実行ファイル向けのランタイムを組み立てるコンポジションルート。
//! ドメイン／アプリケーション／各種アダプタをここで配線し、apps/* はこのクレートだけに依存する。

pub mod cli;
pub mod monitor;

// apps/* が内側レイヤーの型に触れる必要がある場合は、ここから辿れるようにする。
pub use al_app as app;
pub use al_domain as domain;

pub use al_adapter_paths as paths;
pub use al_log_utils as log;

pub use al_domain::model::LockConfig;
pub use al_domain::port::driving::{ProtectionStatus, ProtectionUseCase};
