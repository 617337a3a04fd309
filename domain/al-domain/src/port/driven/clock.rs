//! 時刻ポート

pub trait Clock: Send + Sync {
    /// エポックからのミリ秒を取得
    fn now_ms(&self) -> u64;

    /// ISO 8601形式のタイムスタンプを取得
    fn now_iso8601(&self) -> String;
}
