use std::fmt;
use std::path::PathBuf;

/// どの検索段階で見つかったか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveTier {
    ExactMatch,
    FuzzyMatch,
    IndexedSearch,
}

impl ResolveTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "exact",
            Self::FuzzyMatch => "fuzzy",
            Self::IndexedSearch => "indexed",
        }
    }
}

impl fmt::Display for ResolveTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 再起動対象として解決された実行パス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub tier: ResolveTier,
}

impl ResolvedPath {
    pub fn new(path: impl Into<PathBuf>, tier: ResolveTier) -> Self {
        Self {
            path: path.into(),
            tier,
        }
    }
}
