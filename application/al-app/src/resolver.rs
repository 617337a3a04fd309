//! 実行パスの段階的解決。
//!
//! 1. 完全一致: 各インストールディレクトリ直下に `identifier` があるか
//! 2. あいまい一致: 一覧のうち、語幹（小文字・拡張子なし）が互いに部分文字列になるもの
//! 3. インデックス検索: タイムアウト付きでコンテンツインデックスを照会
//!
//! ディレクトリ順が優先順位。見つかった段で打ち切る。

use al_domain::model::{
    app_stem, has_app_suffix, LockNotification, ResolveTier, ResolvedPath,
};
use al_domain::port::driven::{AppCatalog, ContentIndex, ProcessControl, UserNotifier};
use al_domain::DomainError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ResolverDeps {
    pub catalog: Arc<dyn AppCatalog>,
    pub index: Arc<dyn ContentIndex>,
    pub process: Arc<dyn ProcessControl>,
    pub notifier: Arc<dyn UserNotifier>,
}

pub struct AppResolver {
    deps: ResolverDeps,
    search_dirs: Vec<PathBuf>,
    index_timeout: Duration,
}

impl AppResolver {
    pub fn new(deps: ResolverDeps, search_dirs: Vec<PathBuf>, index_timeout: Duration) -> Self {
        Self {
            deps,
            search_dirs,
            index_timeout,
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn find_exact(&self, identifier: &str) -> Option<ResolvedPath> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(identifier))
            .find(|candidate| self.deps.catalog.exists(candidate))
            .map(|path| ResolvedPath::new(path, ResolveTier::ExactMatch))
    }

    pub fn find_fuzzy(&self, identifier: &str) -> Option<ResolvedPath> {
        let needle = app_stem(identifier);
        if needle.is_empty() {
            return None;
        }
        for dir in &self.search_dirs {
            let entries = match self.deps.catalog.list_entries(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    // 権限のないディレクトリは珍しくない
                    debug!(dir = %dir.display(), error = %err, "ディレクトリを読めないためスキップ");
                    continue;
                }
            };
            let hit = entries.into_iter().find(|entry| {
                if !(entry.is_dir || has_app_suffix(&entry.name)) {
                    return false;
                }
                let stem = app_stem(&entry.name);
                !stem.is_empty() && (stem.contains(&needle) || needle.contains(&stem))
            });
            if let Some(entry) = hit {
                return Some(ResolvedPath::new(entry.path, ResolveTier::FuzzyMatch));
            }
        }
        None
    }

    pub async fn find_indexed(&self, identifier: &str) -> Option<ResolvedPath> {
        let query = app_stem(identifier);
        if query.is_empty() {
            return None;
        }
        let search = self.deps.index.search(&query, self.index_timeout);
        match tokio::time::timeout(self.index_timeout, search).await {
            Ok(Ok(paths)) => paths
                .into_iter()
                .next()
                .map(|path| ResolvedPath::new(path, ResolveTier::IndexedSearch)),
            Ok(Err(err)) => {
                warn!(identifier, error = %err, "インデックス検索に失敗しました");
                None
            }
            Err(_) => {
                warn!(identifier, timeout_ms = self.index_timeout.as_millis() as u64, "インデックス検索がタイムアウトしました");
                None
            }
        }
    }

    pub async fn resolve(&self, identifier: &str) -> Option<ResolvedPath> {
        let resolved = match self.find_exact(identifier) {
            Some(hit) => Some(hit),
            None => match self.find_fuzzy(identifier) {
                Some(hit) => Some(hit),
                None => self.find_indexed(identifier).await,
            },
        };
        match &resolved {
            Some(hit) => debug!(identifier, path = %hit.path.display(), tier = %hit.tier, "実行パスを解決しました"),
            None => debug!(identifier, "実行パスが見つかりません"),
        }
        resolved
    }

    /// 解決できなければ `AppNotFound` を通知してエラーで返す
    async fn resolve_or_notify(&self, identifier: &str) -> Result<ResolvedPath, DomainError> {
        match self.resolve(identifier).await {
            Some(resolved) => Ok(resolved),
            None => {
                self.deps
                    .notifier
                    .notify_message(&LockNotification::AppNotFound {
                        identifier: identifier.to_string(),
                    });
                Err(DomainError::AppNotFound(identifier.to_string()))
            }
        }
    }

    /// 解決済みのパスを起動する。失敗は `LaunchFailed` を通知してから返す。
    async fn launch_resolved(
        &self,
        identifier: &str,
        resolved: &ResolvedPath,
    ) -> Result<(), DomainError> {
        if let Err(err) = self.deps.process.launch(&resolved.path).await {
            let detail = match err {
                DomainError::LaunchFailed(detail) => detail,
                other => other.to_string(),
            };
            self.deps
                .notifier
                .notify_message(&LockNotification::LaunchFailed {
                    identifier: identifier.to_string(),
                    detail: detail.clone(),
                });
            return Err(DomainError::LaunchFailed(detail));
        }
        info!(identifier, path = %resolved.path.display(), tier = %resolved.tier, "起動を要求しました");
        Ok(())
    }

    /// 解決して起動する。`before_launch` は解決後、起動要求の直前に呼ばれる。
    pub async fn resolve_and_launch<F>(
        &self,
        identifier: &str,
        before_launch: F,
    ) -> Result<ResolvedPath, DomainError>
    where
        F: FnOnce(&ResolvedPath) + Send,
    {
        let resolved = self.resolve_or_notify(identifier).await?;
        before_launch(&resolved);
        self.launch_resolved(identifier, &resolved).await?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, StubCatalog, StubIndex};
    use std::path::Path;

    #[tokio::test(start_paused = true)]
    async fn exact_match_short_circuits_later_tiers() {
        let catalog = StubCatalog::default()
            .with_existing("/Applications/Notes.app")
            .with_listing("/Applications", &[("Notes Beta.app", true)]);
        let index = StubIndex::returning(&["/elsewhere/Notes.app"]);
        let h = Harness::builder()
            .catalog(catalog.clone())
            .index(index.clone())
            .build();

        let hit = h.resolver.resolve("Notes.app").await.unwrap();
        assert_eq!(hit.tier, ResolveTier::ExactMatch);
        assert_eq!(hit.path, Path::new("/Applications/Notes.app"));
        assert_eq!(catalog.exists_calls(), 1, "first directory hits");
        assert_eq!(catalog.list_calls(), 0);
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exact_match_follows_directory_order() {
        let catalog = StubCatalog::default()
            .with_existing("/System/Applications/Notes.app")
            .with_existing("/usr/local/Applications/Notes.app");
        let h = Harness::builder().catalog(catalog.clone()).build();
        let hit = h.resolver.find_exact("Notes.app").unwrap();
        assert_eq!(hit.path, Path::new("/System/Applications/Notes.app"));
        assert_eq!(catalog.exists_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fuzzy_match_finds_variant_bundle() {
        let catalog = StubCatalog::default().with_listing(
            "/Applications",
            &[("Mail.app", true), ("Notes Beta.app", true), ("Notes.app.zip", false)],
        );
        let index = StubIndex::returning(&["/elsewhere/Notes.app"]);
        let h = Harness::builder()
            .catalog(catalog.clone())
            .index(index.clone())
            .build();

        let hit = h.resolver.resolve("Notes.app").await.unwrap();
        assert_eq!(hit.tier, ResolveTier::FuzzyMatch);
        assert_eq!(hit.path, Path::new("/Applications/Notes Beta.app"));
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fuzzy_match_works_in_both_directions() {
        // 一覧側の語幹が識別子に含まれる
        let catalog = StubCatalog::default().with_listing("/Applications", &[("Visual Studio Code.app", true)]);
        let h = Harness::builder().catalog(catalog).build();
        let hit = h.resolver.find_fuzzy("visual studio code insiders").unwrap();
        assert_eq!(hit.path, Path::new("/Applications/Visual Studio Code.app"));
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_directory_is_skipped() {
        let catalog = StubCatalog::default()
            .with_unreadable("/Applications")
            .with_listing("/Applications/Utilities", &[("Terminal.app", true)]);
        let h = Harness::builder().catalog(catalog).build();
        let hit = h.resolver.find_fuzzy("terminal").unwrap();
        assert_eq!(hit.path, Path::new("/Applications/Utilities/Terminal.app"));
    }

    #[tokio::test(start_paused = true)]
    async fn indexed_search_is_last_resort() {
        let index = StubIndex::returning(&["/Volumes/Ext/Notes.app", "/tmp/Notes.app"]);
        let h = Harness::builder().index(index.clone()).build();
        let hit = h.resolver.resolve("Notes.app").await.unwrap();
        assert_eq!(hit.tier, ResolveTier::IndexedSearch);
        assert_eq!(hit.path, Path::new("/Volumes/Ext/Notes.app"));
        assert_eq!(index.queries(), vec!["notes".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_index_times_out_as_not_found() {
        let index = StubIndex::returning(&["/Volumes/Ext/Notes.app"]).delayed(Duration::from_secs(5));
        let h = Harness::builder().index(index.clone()).build();
        assert!(h.resolver.resolve("Notes.app").await.is_none());
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn total_miss_notifies_app_not_found() {
        let h = Harness::builder().index(StubIndex::returning(&[])).build();
        let err = h.resolver.resolve_and_launch("Notes.app", |_| {}).await.unwrap_err();
        assert_eq!(err, DomainError::AppNotFound("Notes.app".into()));
        assert!(h.process.launched().is_empty());
        assert_eq!(
            h.notifier.recorded(),
            vec![LockNotification::AppNotFound {
                identifier: "Notes.app".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn launch_hook_runs_after_slow_resolution_and_before_launch() {
        let index = StubIndex::returning(&["/elsewhere/Notes.app"])
            .delayed(Duration::from_millis(1_500));
        let h = Harness::builder().index(index).build();
        let started = tokio::time::Instant::now();
        let seen = std::sync::Mutex::new(None);

        let resolved = h
            .resolver
            .resolve_and_launch("Notes.app", |hit| {
                *seen.lock().unwrap() =
                    Some((started.elapsed(), h.process.launched().len(), hit.tier));
            })
            .await
            .unwrap();

        let (elapsed, launched_before, tier) = seen.into_inner().unwrap().unwrap();
        assert!(elapsed >= Duration::from_millis(1_500));
        assert_eq!(launched_before, 0);
        assert_eq!(tier, ResolveTier::IndexedSearch);
        assert_eq!(h.process.launched(), vec![resolved.path]);
    }
}
