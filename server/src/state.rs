use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::config::{client_dist, data_dir};
use crate::scan::ShotIndex;

#[derive(Clone)]
pub struct AppState {
    /// Latest successful scan; replaced wholesale by the scanner.
    pub index: Arc<RwLock<ShotIndex>>,
    pub data_dir: PathBuf,
    pub client_dist: PathBuf,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    scans_total: AtomicU64,
    scan_failures_total: AtomicU64,
    listing_requests_total: AtomicU64,
    latest_requests_total: AtomicU64,
    latest_misses_total: AtomicU64,
    data_rejected_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub scans_total: u64,
    pub scan_failures_total: u64,
    pub listing_requests_total: u64,
    pub latest_requests_total: u64,
    pub latest_misses_total: u64,
    pub data_rejected_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            scans_total: self.scans_total.load(Ordering::Relaxed),
            scan_failures_total: self.scan_failures_total.load(Ordering::Relaxed),
            listing_requests_total: self.listing_requests_total.load(Ordering::Relaxed),
            latest_requests_total: self.latest_requests_total.load(Ordering::Relaxed),
            latest_misses_total: self.latest_misses_total.load(Ordering::Relaxed),
            data_rejected_total: self.data_rejected_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_scan(&self) {
        self.scans_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan_failure(&self) {
        self.scan_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_listing_request(&self) {
        self.listing_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latest_request(&self) {
        self.latest_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latest_miss(&self) {
        self.latest_misses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_data_rejected(&self) {
        self.data_rejected_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_dirs(data_dir(), client_dist())
    }

    pub fn with_dirs(data_dir: PathBuf, client_dist: PathBuf) -> Self {
        Self {
            index: Arc::new(RwLock::new(ShotIndex::default())),
            data_dir,
            client_dist,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }
}
