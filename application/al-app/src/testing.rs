//! テスト用のスタブポートとパイプラインのハーネス

use crate::{AppResolver, AuthenticationGate, LaunchMonitor, Pipeline, PipelineDeps, PendingRelaunchRegistry, ProtectionController};
use al_domain::model::settings::LOCKED_APPS_KEY;
use al_domain::model::{
    BiometricResult, ChallengePrompt, ChallengeResult, LockConfig, LockNotification,
    ProcessHandle, DEFAULT_INSTALL_DIRS,
};
use al_domain::port::driven::{
    AppCatalog, AuthProvider, AutostartRegistrar, CatalogEntry, Clock, ContentIndex,
    ProcessControl, SettingsStore, UserNotifier,
};
use al_domain::DomainError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// 停止中の時計上で、起動済みタスクを走らせる
pub async fn settle() {
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// 手動で進める時計。`following_tokio` で作るとtokioの（停止中の）時間にも追従する
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
    origin: Option<tokio::time::Instant>,
}

impl ManualClock {
    pub fn following_tokio() -> Self {
        Self {
            now: AtomicU64::new(0),
            origin: Some(tokio::time::Instant::now()),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        let elapsed = self
            .origin
            .map(|origin| origin.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.now.load(Ordering::SeqCst) + elapsed
    }
    fn now_iso8601(&self) -> String {
        format!("{}ms", self.now_ms())
    }
}

#[derive(Default)]
pub struct MemorySettings {
    lists: Mutex<HashMap<String, Vec<String>>>,
    flags: Mutex<HashMap<String, bool>>,
    fail: AtomicBool,
}

impl MemorySettings {
    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.lists.lock().unwrap().get(key).cloned()
    }
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.flags.lock().unwrap().get(key).copied()
    }
    fn check(&self) -> Result<(), DomainError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::IoError("disk full".into()));
        }
        Ok(())
    }
}

impl SettingsStore for MemorySettings {
    fn load_list(&self, key: &str) -> Result<Option<Vec<String>>, DomainError> {
        Ok(self.list(key))
    }
    fn save_list(&self, key: &str, items: &[String]) -> Result<(), DomainError> {
        self.check()?;
        self.lists.lock().unwrap().insert(key.to_string(), items.to_vec());
        Ok(())
    }
    fn load_flag(&self, key: &str) -> Result<Option<bool>, DomainError> {
        Ok(self.flag(key))
    }
    fn save_flag(&self, key: &str, value: bool) -> Result<(), DomainError> {
        self.check()?;
        self.flags.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Default)]
pub struct StubProcess {
    terminated: Mutex<Vec<ProcessHandle>>,
    launched: Mutex<Vec<PathBuf>>,
    running: Mutex<HashMap<String, Vec<ProcessHandle>>>,
    launch_error: Mutex<Option<String>>,
    fail_terminate: AtomicBool,
}

impl StubProcess {
    pub fn terminated(&self) -> Vec<ProcessHandle> {
        self.terminated.lock().unwrap().clone()
    }
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().unwrap().clone()
    }
    pub fn set_running(&self, identifier: &str, handles: Vec<ProcessHandle>) {
        self.running
            .lock()
            .unwrap()
            .insert(identifier.to_string(), handles);
    }
}

#[async_trait]
impl ProcessControl for StubProcess {
    fn terminate(&self, handle: ProcessHandle) -> Result<(), DomainError> {
        self.terminated.lock().unwrap().push(handle);
        if self.fail_terminate.load(Ordering::SeqCst) {
            return Err(DomainError::TerminationFailed("not permitted".into()));
        }
        Ok(())
    }
    fn running(&self, identifier: &str) -> Vec<ProcessHandle> {
        self.running
            .lock()
            .unwrap()
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }
    async fn launch(&self, path: &Path) -> Result<(), DomainError> {
        if let Some(detail) = self.launch_error.lock().unwrap().clone() {
            return Err(DomainError::LaunchFailed(detail));
        }
        self.launched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
pub struct StubAutostart {
    registered: AtomicBool,
}

impl AutostartRegistrar for StubAutostart {
    fn register(&self, _exe_path: &Path) -> Result<(), DomainError> {
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }
    fn unregister(&self) -> Result<(), DomainError> {
        self.registered.store(false, Ordering::SeqCst);
        Ok(())
    }
    fn is_registered(&self) -> Result<bool, DomainError> {
        Ok(self.registered.load(Ordering::SeqCst))
    }
}

/// 台本どおりに答える認証プロバイダ
pub struct StubAuth {
    biometric_available: bool,
    biometric: Mutex<Result<BiometricResult, DomainError>>,
    password: Mutex<Result<ChallengeResult, DomainError>>,
    hold: AtomicBool,
    released: Notify,
    biometric_calls: AtomicUsize,
    password_calls: AtomicUsize,
}

impl StubAuth {
    fn build(
        biometric_available: bool,
        biometric: Result<BiometricResult, DomainError>,
        password: Result<ChallengeResult, DomainError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            biometric_available,
            biometric: Mutex::new(biometric),
            password: Mutex::new(password),
            hold: AtomicBool::new(false),
            released: Notify::new(),
            biometric_calls: AtomicUsize::new(0),
            password_calls: AtomicUsize::new(0),
        })
    }

    pub fn biometric(result: BiometricResult) -> Arc<Self> {
        Self::build(true, Ok(result), Ok(ChallengeResult::Success))
    }

    pub fn no_biometric(password: ChallengeResult) -> Arc<Self> {
        Self::build(false, Ok(BiometricResult::Unavailable), Ok(password))
    }

    pub fn biometric_error() -> Arc<Self> {
        Self::build(
            true,
            Err(DomainError::ProviderUnavailable("sensor offline".into())),
            Ok(ChallengeResult::Success),
        )
    }

    pub fn password(self: Arc<Self>, result: ChallengeResult) -> Arc<Self> {
        *self.password.lock().unwrap() = Ok(result);
        self
    }

    pub fn password_error(self: Arc<Self>) -> Arc<Self> {
        *self.password.lock().unwrap() =
            Err(DomainError::ProviderUnavailable("no passphrase configured".into()));
        self
    }

    /// `release` まで各プロンプトを保留する
    pub fn held(self: Arc<Self>) -> Arc<Self> {
        self.hold.store(true, Ordering::SeqCst);
        self
    }

    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.released.notify_one();
    }

    pub fn biometric_calls(&self) -> usize {
        self.biometric_calls.load(Ordering::SeqCst)
    }

    pub fn password_calls(&self) -> usize {
        self.password_calls.load(Ordering::SeqCst)
    }

    async fn wait_if_held(&self) {
        if self.hold.load(Ordering::SeqCst) {
            self.released.notified().await;
        }
    }
}

#[async_trait]
impl AuthProvider for StubAuth {
    fn biometric_available(&self) -> bool {
        self.biometric_available
    }
    async fn try_biometric(&self, _prompt: &ChallengePrompt) -> Result<BiometricResult, DomainError> {
        self.biometric_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_held().await;
        self.biometric.lock().unwrap().clone()
    }
    async fn try_password(&self, _prompt: &ChallengePrompt) -> Result<ChallengeResult, DomainError> {
        self.password_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_if_held().await;
        self.password.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct CatalogInner {
    existing: Mutex<HashSet<PathBuf>>,
    listings: Mutex<HashMap<PathBuf, Vec<CatalogEntry>>>,
    unreadable: Mutex<HashSet<PathBuf>>,
    exists_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

/// メモリ上のインストールディレクトリ
#[derive(Clone, Default)]
pub struct StubCatalog {
    inner: Arc<CatalogInner>,
}

impl StubCatalog {
    pub fn with_existing(self, path: &str) -> Self {
        self.inner.existing.lock().unwrap().insert(PathBuf::from(path));
        self
    }

    pub fn with_listing(self, dir: &str, entries: &[(&str, bool)]) -> Self {
        let dir = PathBuf::from(dir);
        let entries = entries
            .iter()
            .map(|(name, is_dir)| CatalogEntry::new(*name, dir.join(name), *is_dir))
            .collect();
        self.inner.listings.lock().unwrap().insert(dir, entries);
        self
    }

    pub fn with_unreadable(self, dir: &str) -> Self {
        self.inner.unreadable.lock().unwrap().insert(PathBuf::from(dir));
        self
    }

    pub fn exists_calls(&self) -> usize {
        self.inner.exists_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }
}

impl AppCatalog for StubCatalog {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.existing.lock().unwrap().contains(path)
    }
    fn list_entries(&self, dir: &Path) -> Result<Vec<CatalogEntry>, DomainError> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.unreadable.lock().unwrap().contains(dir) {
            return Err(DomainError::IoError("permission denied".into()));
        }
        Ok(self
            .inner
            .listings
            .lock()
            .unwrap()
            .get(dir)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct IndexInner {
    results: Vec<PathBuf>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
pub struct StubIndex {
    inner: Arc<IndexInner>,
}

impl StubIndex {
    pub fn returning(paths: &[&str]) -> Self {
        Self {
            inner: Arc::new(IndexInner {
                results: paths.iter().map(PathBuf::from).collect(),
                ..IndexInner::default()
            }),
        }
    }

    /// 応答を遅らせる（構築直後、共有前に呼ぶ）
    pub fn delayed(self, delay: Duration) -> Self {
        let results = self.inner.results.clone();
        Self {
            inner: Arc::new(IndexInner {
                results,
                delay: Some(delay),
                ..IndexInner::default()
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.inner.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentIndex for StubIndex {
    async fn search(&self, query: &str, _timeout: Duration) -> Result<Vec<PathBuf>, DomainError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.inner.results.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    recorded: Mutex<Vec<LockNotification>>,
    bodies: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn recorded(&self) -> Vec<LockNotification> {
        self.recorded.lock().unwrap().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn notify(&self, _title: &str, body: &str) {
        self.bodies.lock().unwrap().push(body.to_string());
    }
    fn notify_message(&self, msg: &LockNotification) {
        self.recorded.lock().unwrap().push(msg.clone());
        self.notify("AppLock", &msg.fallback_message());
    }
}

pub struct Harness {
    pub controller: Arc<ProtectionController>,
    pub resolver: Arc<AppResolver>,
    pub gate: Arc<AuthenticationGate>,
    pub registry: PendingRelaunchRegistry,
    pub monitor: Arc<LaunchMonitor>,
    pub clock: Arc<ManualClock>,
    pub settings: Arc<MemorySettings>,
    pub process: Arc<StubProcess>,
    pub notifier: Arc<RecordingNotifier>,
}

#[derive(Default)]
pub struct HarnessBuilder {
    protect: Vec<String>,
    settings: Option<Arc<MemorySettings>>,
    process: Option<Arc<StubProcess>>,
    autostart: Option<Arc<StubAutostart>>,
    auth: Option<Arc<StubAuth>>,
    catalog: StubCatalog,
    index: StubIndex,
    watchdog: Option<Duration>,
    launch_error: Option<String>,
    fail_terminate: bool,
    tokio_time: bool,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }
}

impl HarnessBuilder {
    pub fn protect(mut self, identifier: &str) -> Self {
        self.protect.push(identifier.to_string());
        self
    }
    pub fn settings(mut self, settings: Arc<MemorySettings>) -> Self {
        self.settings = Some(settings);
        self
    }
    pub fn process(mut self, process: Arc<StubProcess>) -> Self {
        self.process = Some(process);
        self
    }
    pub fn autostart(mut self, autostart: Arc<StubAutostart>) -> Self {
        self.autostart = Some(autostart);
        self
    }
    pub fn auth(mut self, auth: Arc<StubAuth>) -> Self {
        self.auth = Some(auth);
        self
    }
    pub fn catalog(mut self, catalog: StubCatalog) -> Self {
        self.catalog = catalog;
        self
    }
    pub fn index(mut self, index: StubIndex) -> Self {
        self.index = index;
        self
    }
    pub fn watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = Some(watchdog);
        self
    }
    pub fn failing_launch(mut self, detail: &str) -> Self {
        self.launch_error = Some(detail.to_string());
        self
    }
    pub fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }
    /// 時計をtokioの時間に追従させる
    pub fn tokio_time(mut self) -> Self {
        self.tokio_time = true;
        self
    }

    pub fn build(self) -> Harness {
        let settings = self.settings.unwrap_or_default();
        if !self.protect.is_empty() {
            settings.save_list(LOCKED_APPS_KEY, &self.protect).unwrap();
        }
        let process = self.process.unwrap_or_default();
        if let Some(detail) = self.launch_error {
            *process.launch_error.lock().unwrap() = Some(detail);
        }
        process
            .fail_terminate
            .store(self.fail_terminate, Ordering::SeqCst);
        let clock = Arc::new(if self.tokio_time {
            ManualClock::following_tokio()
        } else {
            ManualClock::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let mut config = LockConfig::default();
        if let Some(watchdog) = self.watchdog {
            config.watchdog_secs = watchdog.as_secs();
        }

        let pipeline = Pipeline::assemble(
            PipelineDeps {
                settings: settings.clone(),
                process: process.clone(),
                autostart: self.autostart.unwrap_or_default(),
                clock: clock.clone(),
                auth: self
                    .auth
                    .unwrap_or_else(|| StubAuth::biometric(BiometricResult::Success)),
                catalog: Arc::new(self.catalog),
                index: Arc::new(self.index),
                notifier: notifier.clone(),
                exe_path: PathBuf::from("/usr/local/bin/al-monitor"),
                search_dirs: DEFAULT_INSTALL_DIRS.iter().map(PathBuf::from).collect(),
            },
            &config,
        )
        .unwrap();

        Harness {
            controller: pipeline.controller,
            resolver: pipeline.resolver,
            gate: pipeline.gate,
            registry: pipeline.registry,
            monitor: pipeline.monitor,
            clock,
            settings,
            process,
            notifier,
        }
    }
}
