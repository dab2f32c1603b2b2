// ── Local configuration store ──
//
// Lock-free snapshots of the reconciled thresholds and schedule list,
// with push-based change notification via a `watch` version counter.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use crate::model::{Schedule, Thresholds};

/// Shared, cheaply cloneable holder of local configuration.
///
/// Readers take `Arc` snapshots without locking; every write bumps the
/// version so the protection monitor and UIs can react.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    thresholds: ArcSwap<Thresholds>,
    schedules: ArcSwap<Vec<Schedule>>,
    version: watch::Sender<u64>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl ConfigStore {
    pub fn new(thresholds: Thresholds) -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(StoreInner {
                thresholds: ArcSwap::from_pointee(thresholds),
                schedules: ArcSwap::from_pointee(Vec::new()),
                version,
            }),
        }
    }

    pub fn thresholds(&self) -> Arc<Thresholds> {
        self.inner.thresholds.load_full()
    }

    pub fn schedules(&self) -> Arc<Vec<Schedule>> {
        self.inner.schedules.load_full()
    }

    pub fn set_thresholds(&self, thresholds: Thresholds) {
        self.inner.thresholds.store(Arc::new(thresholds));
        self.bump_version();
    }

    /// Replace the whole schedule list. Entries are never merged.
    pub fn replace_schedules(&self, schedules: Vec<Schedule>) {
        self.inner.schedules.store(Arc::new(schedules));
        self.bump_version();
    }

    pub fn version(&self) -> u64 {
        *self.inner.version.borrow()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    fn bump_version(&self) {
        self.inner.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}
