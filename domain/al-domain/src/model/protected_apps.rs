use super::{normalize_identifier, validate_identifier};
use crate::DomainError;

/// 保護対象アプリの集合。
///
/// 挿入順を保持する（表示用）。照合はメンバーシップのみで順序は関係しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedAppSet {
    identifiers: Vec<String>,
}

impl ProtectedAppSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 永続化済みの一覧から構築する。無効な要素と重複は読み飛ばす。
    pub fn from_persisted<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for item in items {
            let _ = set.insert(item);
        }
        set
    }

    /// 未登録なら追加する。追加された場合のみ `true`。
    pub fn insert<S: Into<String>>(&mut self, identifier: S) -> Result<bool, DomainError> {
        let identifier = normalize_identifier(identifier);
        validate_identifier(&identifier)?;
        if self.contains(&identifier) {
            return Ok(false);
        }
        self.identifiers.push(identifier);
        Ok(true)
    }

    /// 登録されていれば削除する。削除された場合のみ `true`。
    pub fn remove(&mut self, identifier: &str) -> bool {
        let identifier = normalize_identifier(identifier);
        let before = self.identifiers.len();
        self.identifiers.retain(|id| id != &identifier);
        before != self.identifiers.len()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|id| id == identifier)
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.identifiers.iter().map(|s| s.as_str())
    }

    /// 永続化用のスナップショット
    pub fn to_vec(&self) -> Vec<String> {
        self.identifiers.clone()
    }
}
