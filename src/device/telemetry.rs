//! Latest sensor readings pushed by the device.

use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use log::{trace, warn};

use crate::protocol::SensorReport;

/// A decoded sensor report and when it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub report: SensorReport,
    pub updated_at: Instant,
}

impl TelemetrySnapshot {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.updated_at)
    }
}

/// Holds the most recent sensor report.
///
/// Updates replace the whole snapshot; readers never see a mix of two
/// reports. Independent of the control-report lock.
pub struct TelemetryCache {
    current: RwLock<Option<TelemetrySnapshot>>,
    stale_after: Duration,
}

impl TelemetryCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    /// * `stale_after` - Age beyond which a snapshot is treated as absent
    pub fn new(stale_after: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            stale_after,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Decode a raw input report and store it.
    ///
    /// Reports other than the sensor report are ignored. Malformed sensor
    /// reports are logged and dropped.
    pub fn update(&self, raw: &[u8]) {
        self.update_at(raw, Instant::now());
    }

    pub fn update_at(&self, raw: &[u8], now: Instant) {
        match SensorReport::parse(raw) {
            Ok(Some(report)) => {
                let snapshot = TelemetrySnapshot {
                    report,
                    updated_at: now,
                };
                *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
            }
            Ok(None) => trace!(
                "Ignoring input report {:#04x}",
                raw.first().copied().unwrap_or_default()
            ),
            Err(e) => warn!("Dropping sensor report: {}", e),
        }
    }

    /// The current snapshot, or `None` if there is none or it is stale.
    pub fn read(&self) -> Option<TelemetrySnapshot> {
        self.read_at(Instant::now())
    }

    pub fn read_at(&self, now: Instant) -> Option<TelemetrySnapshot> {
        self.latest()
            .filter(|snapshot| snapshot.age(now) <= self.stale_after)
    }

    /// The last decoded snapshot regardless of age.
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::status::tests::sample_sensor_report;

    const STALE: Duration = Duration::from_secs(2);

    #[test]
    fn test_empty_cache_reads_none() {
        let cache = TelemetryCache::new(STALE);
        assert!(cache.read().is_none());
        assert!(cache.latest().is_none());
    }

    #[test]
    fn test_fresh_snapshot_readable() {
        let cache = TelemetryCache::new(STALE);
        let t0 = Instant::now();
        cache.update_at(&sample_sensor_report(), t0);

        let snapshot = cache.read_at(t0 + Duration::from_millis(1500)).unwrap();
        assert_eq!(snapshot.report.coolant_temp, 2560);
        assert_eq!(snapshot.updated_at, t0);
    }

    #[test]
    fn test_stale_snapshot_reads_none() {
        let cache = TelemetryCache::new(STALE);
        let t0 = Instant::now();
        cache.update_at(&sample_sensor_report(), t0);

        assert!(cache.read_at(t0 + STALE + Duration::from_millis(1)).is_none());
        // Values are still held for diagnostics.
        assert_eq!(cache.latest().unwrap().report.coolant_temp, 2560);
    }

    #[test]
    fn test_other_reports_do_not_refresh() {
        let cache = TelemetryCache::new(STALE);
        let t0 = Instant::now();
        cache.update_at(&sample_sensor_report(), t0);

        let mut other = sample_sensor_report();
        other[0] = 0x02;
        cache.update_at(&other, t0 + Duration::from_secs(5));
        assert_eq!(cache.latest().unwrap().updated_at, t0);
    }

    #[test]
    fn test_malformed_report_dropped() {
        let cache = TelemetryCache::new(STALE);
        let report = sample_sensor_report();
        cache.update(&report[..10]);
        assert!(cache.latest().is_none());
    }

    #[test]
    fn test_update_replaces_whole_snapshot() {
        let cache = TelemetryCache::new(STALE);
        let t0 = Instant::now();
        cache.update_at(&sample_sensor_report(), t0);

        let mut next = sample_sensor_report();
        next[0x57] = 0x0B;
        next[0x58] = 0xB8;
        cache.update_at(&next, t0 + Duration::from_secs(1));

        let snapshot = cache.read_at(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(snapshot.report.coolant_temp, 30_000);
        assert_eq!(snapshot.updated_at, t0 + Duration::from_secs(1));
    }
}
