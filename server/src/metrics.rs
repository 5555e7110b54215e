use casino_lobby_types::OmissionReason;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Clone, Debug, Serialize)]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

#[derive(Default)]
struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);

        match LATENCY_BUCKETS_MS.iter().position(|bucket| ms <= *bucket) {
            Some(idx) => self.buckets[idx].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };
        let counts = self
            .buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .collect::<Vec<_>>();

        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts,
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HttpMetricsSnapshot {
    pub lobby: LatencySnapshot,
    pub catalog: LatencySnapshot,
    pub reviews: LatencySnapshot,
    pub feedback: LatencySnapshot,
    pub sections_resolved: u64,
    pub sections_empty: u64,
    pub sections_unavailable: u64,
    pub sections_invalid: u64,
    pub layout_cache_hits: u64,
    pub reject_origin: u64,
    pub reject_rate_limit: u64,
    pub reject_body_limit: u64,
}

#[derive(Default)]
pub struct HttpMetrics {
    lobby: LatencyMetrics,
    catalog: LatencyMetrics,
    reviews: LatencyMetrics,
    feedback: LatencyMetrics,
    sections_resolved: AtomicU64,
    sections_empty: AtomicU64,
    sections_unavailable: AtomicU64,
    sections_invalid: AtomicU64,
    layout_cache_hits: AtomicU64,
    reject_origin: AtomicU64,
    reject_rate_limit: AtomicU64,
    reject_body_limit: AtomicU64,
}

impl HttpMetrics {
    pub fn record_lobby(&self, duration: Duration) {
        self.lobby.record(duration);
    }

    pub fn record_catalog(&self, duration: Duration) {
        self.catalog.record(duration);
    }

    pub fn record_reviews(&self, duration: Duration) {
        self.reviews.record(duration);
    }

    pub fn record_feedback(&self, duration: Duration) {
        self.feedback.record(duration);
    }

    pub fn record_sections(
        &self,
        resolved: usize,
        omitted: impl IntoIterator<Item = OmissionReason>,
    ) {
        self.sections_resolved
            .fetch_add(resolved as u64, Ordering::Relaxed);
        for reason in omitted {
            let counter = match reason {
                OmissionReason::Empty => &self.sections_empty,
                OmissionReason::SourceUnavailable => &self.sections_unavailable,
                OmissionReason::InvalidConfig => &self.sections_invalid,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_layout_cache_hit(&self) {
        self.layout_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_origin(&self) {
        self.reject_origin.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_rate_limit(&self) {
        self.reject_rate_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_body_limit(&self) {
        self.reject_body_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            lobby: self.lobby.snapshot(),
            catalog: self.catalog.snapshot(),
            reviews: self.reviews.snapshot(),
            feedback: self.feedback.snapshot(),
            sections_resolved: self.sections_resolved.load(Ordering::Relaxed),
            sections_empty: self.sections_empty.load(Ordering::Relaxed),
            sections_unavailable: self.sections_unavailable.load(Ordering::Relaxed),
            sections_invalid: self.sections_invalid.load(Ordering::Relaxed),
            layout_cache_hits: self.layout_cache_hits.load(Ordering::Relaxed),
            reject_origin: self.reject_origin.load(Ordering::Relaxed),
            reject_rate_limit: self.reject_rate_limit.load(Ordering::Relaxed),
            reject_body_limit: self.reject_body_limit.load(Ordering::Relaxed),
        }
    }
}
