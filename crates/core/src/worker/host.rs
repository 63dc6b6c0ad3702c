//! Hosting runtime for a single worker.
//!
//! Owns the worker and its capabilities, turns host requests into events, and
//! tracks the lifecycle state that decides whether fetches are intercepted.
//!
//! The state is a `watch` value so fetches read it without waiting; installs
//! are serialized by a separate lock. An installation, once active, stays
//! active: a rejected re-install only discards the new attempt.

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use super::{CacheStorage, FetchEvent, InstallEvent, Network, OfflineCacheWorker};
use crate::Error;
use crate::http::{Request, Response};

/// Lifecycle state of the hosted worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Registered, never installed.
    Parsed,
    /// Install signal dispatched, deferred work still running.
    Installing,
    /// Install settled successfully; fetches are intercepted.
    Installed,
    /// Install rejected with no earlier installation; fetches go straight to the network.
    Redundant,
}

/// Dispatches lifecycle signals to an [`OfflineCacheWorker`].
pub struct WorkerHost<S, N> {
    worker: OfflineCacheWorker,
    storage: S,
    network: N,
    state: watch::Sender<WorkerState>,
    install_lock: Mutex<()>,
}

impl<S, N> WorkerHost<S, N>
where
    S: CacheStorage,
    N: Network,
{
    pub fn new(worker: OfflineCacheWorker, storage: S, network: N) -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self { worker, storage, network, state, install_lock: Mutex::new(()) }
    }

    pub fn worker(&self) -> &OfflineCacheWorker {
        &self.worker
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Pick up an installation persisted by an earlier host on the same storage.
    ///
    /// A `Parsed` host whose storage already holds every pre-cache request
    /// becomes `Installed` without touching the network.
    pub async fn restore(&self) -> Result<WorkerState, Error> {
        let _install = self.install_lock.lock().await;
        self.restore_locked().await
    }

    async fn restore_locked(&self) -> Result<WorkerState, Error> {
        if self.state() == WorkerState::Parsed && self.worker.is_precached(&self.storage).await? {
            self.state.send_replace(WorkerState::Installed);
            tracing::info!(scope = %self.worker.scope(), "restored installed worker from cache storage");
        }
        Ok(self.state())
    }

    /// Dispatch an install signal and wait for it to settle.
    ///
    /// Install cycles never overlap; concurrent callers queue on the install
    /// lock while fetches keep reading the current state. A rejected install
    /// leaves a fresh worker `Redundant` but keeps an active one `Installed`.
    /// Calling this again retries.
    pub async fn dispatch_install(&self) -> Result<(), Error> {
        let _install = self.install_lock.lock().await;
        let active = self.restore_locked().await? == WorkerState::Installed;
        if !active {
            self.state.send_replace(WorkerState::Installing);
        }

        let mut event = InstallEvent::new();
        self.worker.on_install(&mut event, &self.storage, &self.network);

        match event.settle().await {
            Ok(()) => {
                self.state.send_replace(WorkerState::Installed);
                tracing::info!(scope = %self.worker.scope(), "worker installed");
                Ok(())
            }
            Err(e) if active => {
                tracing::warn!(scope = %self.worker.scope(), error = %e, "re-install rejected, keeping active worker");
                Err(e)
            }
            Err(e) => {
                self.state.send_replace(WorkerState::Redundant);
                tracing::warn!(scope = %self.worker.scope(), error = %e, "worker install rejected");
                Err(e)
            }
        }
    }

    /// Dispatch a fetch signal and resolve its response.
    ///
    /// Until the worker is installed the host answers from the network itself.
    pub async fn dispatch_fetch(&self, request: Request) -> Result<Response, Error> {
        let state = self.state();
        if state != WorkerState::Installed {
            tracing::debug!(url = %request.url, ?state, "worker not installed, fetching directly");
            return self.network.fetch(&request).await;
        }

        let mut event = FetchEvent::new(request);
        self.worker.on_fetch(&mut event, &self.storage, &self.network)?;
        event.into_response(&self.network).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheDb;
    use crate::http::{ResponseSource, Url};
    use crate::worker::CACHE_NAME;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves every URL when online; counts every call.
    #[derive(Default)]
    struct ToggleNetwork {
        offline: AtomicBool,
        calls: AtomicUsize,
    }

    impl ToggleNetwork {
        fn offline() -> Self {
            Self { offline: AtomicBool::new(true), ..Default::default() }
        }
    }

    #[async_trait]
    impl Network for ToggleNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Network("offline".into()));
            }
            Ok(Response::new(request.url.as_str(), 200).with_body(format!("live {}", request.url.path())))
        }
    }

    /// Takes `delay` to answer `/`; everything else answers at once.
    struct SlowRootNetwork {
        delay: Duration,
    }

    #[async_trait]
    impl Network for SlowRootNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            if request.url.path() == "/" {
                tokio::time::sleep(self.delay).await;
            }
            Ok(Response::new(request.url.as_str(), 200).with_body(format!("live {}", request.url.path())))
        }
    }

    fn worker() -> OfflineCacheWorker {
        OfflineCacheWorker::new(Url::parse("http://127.0.0.1:5000/").unwrap())
    }

    async fn host() -> WorkerHost<CacheDb, ToggleNetwork> {
        WorkerHost::new(worker(), CacheDb::open_in_memory().await.unwrap(), ToggleNetwork::default())
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn root() -> Request {
        get("http://127.0.0.1:5000/")
    }

    #[tokio::test]
    async fn test_initial_state() {
        let host = host().await;
        assert_eq!(host.state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_install_transitions_to_installed() {
        let host = host().await;
        let mut states = host.subscribe();
        host.dispatch_install().await.unwrap();

        assert_eq!(host.state(), WorkerState::Installed);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), WorkerState::Installed);
        assert!(host.storage().has_cache(CACHE_NAME).await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_before_install_goes_to_network() {
        let host = host().await;
        host.storage()
            .open_cache(CACHE_NAME)
            .await
            .unwrap()
            .put_all(vec![(root(), Response::new("http://127.0.0.1:5000/", 200).with_body("stale"))])
            .await
            .unwrap();

        let response = host.dispatch_fetch(root()).await.unwrap();

        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(host.network.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_installed_host_serves_cache_offline() {
        let host = host().await;
        host.dispatch_install().await.unwrap();
        host.network.offline.store(true, Ordering::SeqCst);

        let response = host.dispatch_fetch(root()).await.unwrap();

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body.as_ref(), b"live /");
    }

    #[tokio::test]
    async fn test_failed_install_is_redundant_then_retry() {
        let host = host().await;
        host.network.offline.store(true, Ordering::SeqCst);

        assert!(matches!(host.dispatch_install().await, Err(Error::Network(_))));
        assert_eq!(host.state(), WorkerState::Redundant);
        assert_eq!(host.storage().entry_count().await.unwrap(), 0);

        host.network.offline.store(false, Ordering::SeqCst);
        host.dispatch_install().await.unwrap();
        assert_eq!(host.state(), WorkerState::Installed);
        assert_eq!(host.storage().entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_reinstall_keeps_active_worker() {
        let host = host().await;
        host.dispatch_install().await.unwrap();
        host.network.offline.store(true, Ordering::SeqCst);

        assert!(matches!(host.dispatch_install().await, Err(Error::Network(_))));
        assert_eq!(host.state(), WorkerState::Installed);

        let response = host.dispatch_fetch(root()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body.as_ref(), b"live /");
    }

    #[tokio::test]
    async fn test_restarted_host_serves_persisted_cache_offline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swcache.sqlite");

        let first = WorkerHost::new(worker(), CacheDb::open(&path).await.unwrap(), ToggleNetwork::default());
        first.dispatch_install().await.unwrap();
        drop(first);

        let host = WorkerHost::new(worker(), CacheDb::open(&path).await.unwrap(), ToggleNetwork::offline());
        assert!(matches!(host.dispatch_install().await, Err(Error::Network(_))));
        assert_eq!(host.state(), WorkerState::Installed);

        let response = host.dispatch_fetch(root()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body.as_ref(), b"live /");
    }

    #[tokio::test]
    async fn test_restore_picks_up_persisted_install() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swcache.sqlite");

        let first = WorkerHost::new(worker(), CacheDb::open(&path).await.unwrap(), ToggleNetwork::default());
        first.dispatch_install().await.unwrap();
        drop(first);

        let host = WorkerHost::new(worker(), CacheDb::open(&path).await.unwrap(), ToggleNetwork::offline());
        assert_eq!(host.restore().await.unwrap(), WorkerState::Installed);

        let response = host.dispatch_fetch(root()).await.unwrap();
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(host.network.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restore_without_cache_stays_parsed() {
        let host = host().await;

        assert_eq!(host.restore().await.unwrap(), WorkerState::Parsed);
        assert!(host.storage().cache_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_during_install_is_not_blocked() {
        let network = SlowRootNetwork { delay: Duration::from_millis(800) };
        let host = WorkerHost::new(worker(), CacheDb::open_in_memory().await.unwrap(), network);

        let (installed, fetched) = tokio::join!(host.dispatch_install(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let state = host.state();
            let start = tokio::time::Instant::now();
            let response = host.dispatch_fetch(get("http://127.0.0.1:5000/other.png")).await;
            (state, start.elapsed(), response)
        });

        installed.unwrap();
        let (state, elapsed, response) = fetched;
        assert_eq!(state, WorkerState::Installing);
        assert!(elapsed < Duration::from_millis(400), "fetch waited {elapsed:?}");
        assert_eq!(response.unwrap().source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_concurrent_installs_keep_one_store() {
        let host = host().await;

        let (a, b) = tokio::join!(host.dispatch_install(), host.dispatch_install());

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(host.storage().cache_names().await.unwrap(), vec![CACHE_NAME.to_string()]);
        assert_eq!(host.storage().entry_count().await.unwrap(), 1);
    }
}
