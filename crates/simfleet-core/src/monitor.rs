// ── Fleet monitor ──
//
// Lifecycle and refresh pipeline for the simulator fleet: periodic
// polling, debounced poll requests, the time-based fetch cache, change
// detection and publication through the FleetStore.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use simfleet_api::DeviceControl;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::error_channel::{ErrorChannel, ErrorNotice};
use crate::metadata::MetadataLookup;
use crate::model::{Device, DeviceId};
use crate::snapshot::{DeviceGroup, FleetSnapshot, enrich_devices, has_meaningful_change};
use crate::store::{FleetStore, FleetView};
use crate::stream::FleetStream;
use crate::timing::OperationTimer;

const TOAST_CHANNEL_SIZE: usize = 16;

// ── Phase ────────────────────────────────────────────────────────

/// Coarse reconciler state, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MonitorPhase {
    /// No load has completed yet.
    Initializing,
    /// A fetch is in flight.
    Polling,
    Idle,
    /// At least one user operation is in flight.
    Operating,
}

/// How a `refresh()` call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Inside the cache window; the tool was not called.
    Cached,
    /// Fetched, nothing meaningful changed, nothing republished.
    Unchanged,
    /// Fetched and a new snapshot was published.
    Published,
}

// ── Refresh cache ────────────────────────────────────────────────

#[derive(Default)]
struct RefreshCache {
    snapshot: Option<Arc<FleetSnapshot>>,
    fetched_at: Option<Instant>,
    runtimes: BTreeSet<String>,
}

impl RefreshCache {
    fn is_fresh(&self, window: Duration) -> bool {
        self.snapshot.is_some() && self.fetched_at.is_some_and(|t| t.elapsed() < window)
    }

    fn invalidate(&mut self) {
        self.snapshot = None;
        self.fetched_at = None;
    }
}

/// Debounced poll tasks. Only the newest may still be waiting;
/// older ones are kept here while their refresh runs.
#[derive(Default)]
struct ScheduledPolls {
    pending: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
}

// ── FleetMonitor ─────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Call [`start()`](Self::start)
/// to begin polling; reads work before that and return the empty view.
#[derive(Clone)]
pub struct FleetMonitor {
    pub(crate) inner: Arc<MonitorInner>,
}

pub(crate) struct MonitorInner {
    pub(crate) config: MonitorConfig,
    pub(crate) control: Arc<dyn DeviceControl>,
    pub(crate) metadata: Arc<MetadataLookup>,
    pub(crate) store: FleetStore,
    pub(crate) errors: ErrorChannel,
    toasts: broadcast::Sender<String>,
    /// Held for the whole of a refresh; serializes fetches.
    cache: Mutex<RefreshCache>,
    operating: AtomicUsize,
    polling: AtomicBool,
    scheduled: std::sync::Mutex<ScheduledPolls>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FleetMonitor {
    /// Build a monitor. Does NOT start polling.
    pub fn new(
        config: MonitorConfig,
        control: Arc<dyn DeviceControl>,
        metadata: Arc<MetadataLookup>,
    ) -> Self {
        let (toasts, _) = broadcast::channel(TOAST_CHANNEL_SIZE);
        Self {
            inner: Arc::new(MonitorInner {
                errors: ErrorChannel::new(config.error_expiry),
                config,
                control,
                metadata,
                store: FleetStore::new(),
                toasts,
                cache: Mutex::new(RefreshCache::default()),
                operating: AtomicUsize::new(0),
                polling: AtomicBool::new(false),
                scheduled: std::sync::Mutex::new(ScheduledPolls::default()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &FleetStore {
        &self.inner.store
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.inner.errors
    }

    pub fn metadata(&self) -> &Arc<MetadataLookup> {
        &self.inner.metadata
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the bootstrap task: prune, first refresh, periodic timer,
    /// then metadata probing.
    pub async fn start(&self) {
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let cancel = monitor.inner.cancel.clone();
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = monitor.bootstrap() => {}
            }
        });
        self.inner.task_handles.lock().await.push(handle);
        debug!("monitor started");
    }

    /// Cancel and join every background task.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        // Handles can be pushed by the bootstrap task while we drain.
        loop {
            let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
        let scheduled = std::mem::take(
            &mut self
                .inner
                .scheduled
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .handles,
        );
        for handle in scheduled {
            let _ = handle.await;
        }
        debug!("monitor stopped");
    }

    /// One-shot: refresh once, run the closure, stop.
    pub async fn oneshot<F, Fut, T>(
        config: MonitorConfig,
        control: Arc<dyn DeviceControl>,
        metadata: Arc<MetadataLookup>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(FleetMonitor) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let monitor = FleetMonitor::new(cfg, control, metadata);
        if monitor.inner.config.probe_device_types {
            if let Err(e) = monitor.inner.metadata.refresh(&*monitor.inner.control).await {
                warn!(error = %e, "device metadata probe failed");
            }
        }
        monitor.refresh().await?;
        let result = f(monitor.clone()).await;
        monitor.stop().await;
        result
    }

    async fn bootstrap(&self) {
        let config = &self.inner.config;
        if config.prune_on_start {
            if let Err(e) = self.inner.control.prune_unavailable().await {
                warn!(error = %e, "pruning unavailable devices failed");
            }
        }

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "initial refresh failed");
        }

        if !config.poll_interval.is_zero() {
            let handle = tokio::spawn(poll_task(
                self.clone(),
                config.poll_interval,
                self.inner.cancel.clone(),
            ));
            self.inner.task_handles.lock().await.push(handle);
        }

        if config.probe_device_types {
            match self.inner.metadata.refresh(&*self.inner.control).await {
                // Re-enrich with probed geometry.
                Ok(n) if n > 0 => {
                    if let Err(e) = self.force_refresh().await {
                        debug!(error = %e, "refresh after metadata probe failed");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "device metadata probe failed"),
            }
        }
    }

    // ── Polling ──────────────────────────────────────────────────

    /// One timer tick. Returns `false` if skipped because an operation
    /// is in flight.
    pub(crate) fn on_tick(&self) -> bool {
        if self.is_operating() {
            debug!("poll tick skipped: operation in flight");
            return false;
        }
        trace!("poll tick");
        self.request_poll();
        true
    }

    /// Schedule a refresh after the debounce delay, superseding any
    /// refresh scheduled earlier that has not fired yet.
    pub fn request_poll(&self) {
        let token = self.inner.cancel.child_token();
        let monitor = self.clone();
        let delay = self.inner.config.debounce;
        let waiting = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = waiting.cancelled() => {
                    trace!("scheduled poll superseded");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            if monitor.is_operating() {
                debug!("scheduled poll skipped: operation in flight");
                return;
            }
            let stopped = monitor.inner.cancel.clone();
            tokio::select! {
                biased;
                () = stopped.cancelled() => debug!("scheduled poll cancelled by stop"),
                result = monitor.refresh() => {
                    if let Err(e) = result {
                        debug!(error = %e, "scheduled poll failed");
                    }
                }
            }
        });

        let mut scheduled = self
            .inner
            .scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = scheduled.pending.replace(token) {
            previous.cancel();
        }
        scheduled.handles.retain(|h| !h.is_finished());
        scheduled.handles.push(handle);
    }

    // ── Refresh pipeline ─────────────────────────────────────────

    /// Fetch and publish unless the cache window still covers the last fetch.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        self.refresh_inner(false).await
    }

    /// Drop the cache, then refresh.
    pub async fn force_refresh(&self) -> Result<RefreshOutcome, CoreError> {
        self.refresh_inner(true).await
    }

    /// User-requested refresh: loading shows immediately and is cleared
    /// by the watchdog even if the fetch stalls.
    pub async fn manual_refresh(&self) -> Result<RefreshOutcome, CoreError> {
        self.inner.store.set_loading(true);

        let watchdog = {
            let monitor = self.clone();
            let limit = self.inner.config.manual_refresh_watchdog;
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                if monitor.inner.store.is_loading() {
                    warn!("manual refresh exceeded watchdog, clearing loading");
                    monitor.inner.store.set_loading(false);
                }
            })
        };

        tokio::time::sleep(self.inner.config.manual_refresh_delay).await;
        let result = self.force_refresh().await;
        watchdog.abort();
        result
    }

    async fn refresh_inner(&self, force: bool) -> Result<RefreshOutcome, CoreError> {
        let mut cache = self.inner.cache.lock().await;
        if force {
            cache.invalidate();
        } else if cache.is_fresh(self.inner.config.cache_window) {
            debug!("refresh served from cache");
            self.inner.store.finish_load();
            return Ok(RefreshOutcome::Cached);
        }

        let polling = PollingFlag::raise(&self.inner.polling);
        let result = self.fetch_and_publish(&mut cache).await;
        drop(polling);
        drop(cache);

        if let Err(ref e) = result {
            self.inner.errors.report(e);
        }
        self.inner.store.finish_load();
        result
    }

    async fn fetch_and_publish(
        &self,
        cache: &mut RefreshCache,
    ) -> Result<RefreshOutcome, CoreError> {
        let _timer = OperationTimer::start("refresh", self.inner.config.slow_operation_threshold);
        let control = &self.inner.control;
        let show_all = self.inner.config.show_all_runtimes;

        let (devices, runtimes) = tokio::join!(control.list_devices(), async {
            if show_all {
                control.list_runtimes().await.map(Some)
            } else {
                Ok(None)
            }
        });
        let raw = devices?;
        let installed: BTreeSet<String> = runtimes?
            .unwrap_or_default()
            .into_iter()
            .filter(|rt| rt.is_available)
            .map(|rt| rt.identifier)
            .collect();

        let candidates = enrich_devices(raw, &self.inner.metadata);
        let devices_changed = cache
            .snapshot
            .as_ref()
            .is_none_or(|old| has_meaningful_change(&old.devices, &candidates));
        let runtimes_changed = installed != cache.runtimes;

        // Every successful fetch restarts the cache window.
        cache.fetched_at = Some(Instant::now());
        if !devices_changed && !runtimes_changed {
            trace!("no meaningful change");
            self.inner.store.reconcile();
            return Ok(RefreshOutcome::Unchanged);
        }

        let snapshot = Arc::new(FleetSnapshot::build(candidates, &installed));
        info!(
            devices = snapshot.devices.len(),
            groups = snapshot.groups.len(),
            "fleet snapshot published"
        );
        self.inner.store.confirm(Arc::clone(&snapshot));
        cache.snapshot = Some(snapshot);
        cache.runtimes = installed;
        Ok(RefreshOutcome::Published)
    }

    // ── Published surface ────────────────────────────────────────

    pub fn view(&self) -> FleetView {
        self.inner.store.view()
    }

    pub fn subscribe(&self) -> FleetStream {
        FleetStream::new(self.inner.store.subscribe())
    }

    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.inner.store.snapshot()
    }

    pub fn device_groups(&self) -> Vec<DeviceGroup> {
        self.snapshot().groups.clone()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.snapshot().devices.clone()
    }

    pub fn device(&self, id: &DeviceId) -> Option<Device> {
        self.snapshot().device(id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.store.is_loading()
    }

    pub fn has_initial_load_completed(&self) -> bool {
        self.inner.store.view().initial_load_completed
    }

    pub fn last_error(&self) -> Option<ErrorNotice> {
        self.inner.errors.current()
    }

    pub fn has_error(&self) -> bool {
        self.inner.errors.has_error()
    }

    pub fn is_operating(&self) -> bool {
        self.inner.operating.load(Ordering::SeqCst) > 0
    }

    pub fn phase(&self) -> MonitorPhase {
        if self.is_operating() {
            MonitorPhase::Operating
        } else if self.inner.polling.load(Ordering::SeqCst) {
            MonitorPhase::Polling
        } else if !self.has_initial_load_completed() {
            MonitorPhase::Initializing
        } else {
            MonitorPhase::Idle
        }
    }

    // ── Device info ──────────────────────────────────────────────

    /// Info text for a device; also announces it on the toast channel.
    pub fn describe_device(&self, id: &DeviceId) -> Result<String, CoreError> {
        let device = self.device(id).ok_or_else(|| CoreError::DeviceNotFound {
            identifier: id.to_string(),
        })?;
        let _ = self
            .inner
            .toasts
            .send(format!("Copied info for {}", device.name));
        Ok(device.info_text())
    }

    /// Subscribe to one-shot toast messages.
    pub fn toasts(&self) -> broadcast::Receiver<String> {
        self.inner.toasts.subscribe()
    }

    pub(crate) fn operating_guard(&self) -> OperatingGuard {
        OperatingGuard::new(Arc::clone(&self.inner))
    }

    pub(crate) fn timer(&self, name: &'static str) -> OperationTimer {
        OperationTimer::start(name, self.inner.config.slow_operation_threshold)
    }
}

// ── Operating guard ──────────────────────────────────────────────

/// Holds the monitor in `Operating` for as long as it lives.
pub(crate) struct OperatingGuard {
    inner: Arc<MonitorInner>,
}

impl OperatingGuard {
    fn new(inner: Arc<MonitorInner>) -> Self {
        inner.operating.fetch_add(1, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for OperatingGuard {
    fn drop(&mut self) {
        self.inner.operating.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Marks a fetch in flight. Lowered on drop, so a cancelled refresh
/// does not leave the phase at `Polling`.
struct PollingFlag<'a>(&'a AtomicBool);

impl<'a> PollingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for PollingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn poll_task(monitor: FleetMonitor, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                monitor.on_tick();
            }
        }
    }
}
