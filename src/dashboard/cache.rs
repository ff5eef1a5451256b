//! Memoization layer for dashboard snapshots.
//!
//! The cache holds no authoritative data. Every entry can be rebuilt from the
//! ledger at any time, so a broken cache degrades to recomputation, never to
//! an error the user sees.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{Error, database_id::UserId};

use super::aggregation::DashboardSummary;

/// How long a cached snapshot stays valid without a write, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// A per-user store of dashboard snapshots.
///
/// Entries are keyed by `(user_id, bucket_label)` and expire after a TTL or
/// when [DashboardCache::invalidate] is called for the user, whichever comes
/// first.
pub trait DashboardCache: Send + Sync {
    /// Retrieve the snapshot stored under `(user_id, bucket_label)`, if it is
    /// present and has not expired.
    fn get(&self, user_id: UserId, bucket_label: &str) -> Option<DashboardSummary>;

    /// Store `value` under `(user_id, bucket_label)`.
    fn put(&self, user_id: UserId, bucket_label: &str, value: DashboardSummary);

    /// Remove every entry for `user_id`, regardless of bucket label or
    /// remaining TTL.
    fn invalidate(&self, user_id: UserId);
}

/// Return the cached snapshot for `(user_id, bucket_label)`, computing and
/// storing it on a miss.
///
/// Cache trouble (a poisoned lock, for example) is not fatal: the
/// implementation reports a miss, `compute` runs and the caller gets a fresh
/// value either way.
///
/// # Errors
/// Propagates the error from `compute`; the cache itself never fails.
pub fn fetch_or_compute<F>(
    cache: &dyn DashboardCache,
    user_id: UserId,
    bucket_label: &str,
    compute: F,
) -> Result<DashboardSummary, Error>
where
    F: FnOnce() -> Result<DashboardSummary, Error>,
{
    if let Some(snapshot) = cache.get(user_id, bucket_label) {
        tracing::debug!("dashboard cache hit for user {user_id} ({bucket_label})");
        return Ok(snapshot);
    }

    tracing::debug!("dashboard cache miss for user {user_id} ({bucket_label})");
    let snapshot = compute()?;
    cache.put(user_id, bucket_label, snapshot.clone());

    Ok(snapshot)
}

struct CacheEntry {
    value: DashboardSummary,
    expires_at: Instant,
}

/// An in-process [DashboardCache] with per-entry TTL.
pub struct InMemoryDashboardCache {
    entries: Mutex<HashMap<(UserId, String), CacheEntry>>,
    ttl: Duration,
}

impl InMemoryDashboardCache {
    /// Create a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for InMemoryDashboardCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }
}

impl DashboardCache for InMemoryDashboardCache {
    fn get(&self, user_id: UserId, bucket_label: &str) -> Option<DashboardSummary> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::error!("dashboard cache lock poisoned, treating as miss: {error}");
                return None;
            }
        };

        let key = (user_id, bucket_label.to_owned());
        match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    fn put(&self, user_id: UserId, bucket_label: &str, value: DashboardSummary) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::error!("dashboard cache lock poisoned, dropping write: {error}");
                return;
            }
        };

        entries.insert(
            (user_id, bucket_label.to_owned()),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn invalidate(&self, user_id: UserId) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(error) => {
                tracing::error!("dashboard cache lock poisoned during invalidation: {error}");
                return;
            }
        };

        entries.retain(|(entry_user_id, _), _| *entry_user_id != user_id);
    }
}

#[cfg(test)]
mod dashboard_cache_tests {
    use std::time::Duration;

    use rust_decimal::dec;

    use crate::{
        dashboard::aggregation::{BreakdownEntry, DashboardSummary, PeriodSeries},
        transaction::Totals,
    };

    use super::{DashboardCache, InMemoryDashboardCache, fetch_or_compute};

    fn get_test_snapshot(total_income: rust_decimal::Decimal) -> DashboardSummary {
        DashboardSummary {
            totals: Totals {
                total_income,
                total_expense: dec!(0.00),
            },
            month_totals: Totals {
                total_income: dec!(0.00),
                total_expense: dec!(0.00),
            },
            monthly: PeriodSeries {
                labels: vec![],
                income: vec![],
                expense: vec![],
                net_flow: vec![],
                running_balance: vec![],
            },
            breakdown: vec![BreakdownEntry {
                label: "No data yet".to_owned(),
                value: dec!(1),
                color: "#e3e6f0".to_owned(),
            }],
        }
    }

    #[test]
    fn hit_within_ttl_skips_compute() {
        let cache = InMemoryDashboardCache::new(Duration::from_secs(300));
        cache.put(1, "dashboard_20240615", get_test_snapshot(dec!(100.00)));

        let result = fetch_or_compute(&cache, 1, "dashboard_20240615", || {
            panic!("compute should not run on a cache hit")
        })
        .unwrap();

        assert_eq!(result.totals.total_income, dec!(100.00));
    }

    #[test]
    fn miss_computes_and_stores() {
        let cache = InMemoryDashboardCache::new(Duration::from_secs(300));

        let result = fetch_or_compute(&cache, 1, "dashboard_20240615", || {
            Ok(get_test_snapshot(dec!(42.00)))
        })
        .unwrap();

        assert_eq!(result.totals.total_income, dec!(42.00));
        assert!(cache.get(1, "dashboard_20240615").is_some());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = InMemoryDashboardCache::new(Duration::ZERO);
        cache.put(1, "dashboard_20240615", get_test_snapshot(dec!(100.00)));

        assert!(cache.get(1, "dashboard_20240615").is_none());
    }

    #[test]
    fn invalidate_removes_all_entries_for_the_user() {
        let cache = InMemoryDashboardCache::new(Duration::from_secs(300));
        cache.put(1, "dashboard_20240614", get_test_snapshot(dec!(1.00)));
        cache.put(1, "dashboard_20240615", get_test_snapshot(dec!(2.00)));
        cache.put(2, "dashboard_20240615", get_test_snapshot(dec!(3.00)));

        cache.invalidate(1);

        assert!(cache.get(1, "dashboard_20240614").is_none());
        assert!(cache.get(1, "dashboard_20240615").is_none());
        assert_eq!(
            cache
                .get(2, "dashboard_20240615")
                .map(|snapshot| snapshot.totals.total_income),
            Some(dec!(3.00))
        );
    }

    #[test]
    fn entries_are_isolated_per_user() {
        let cache = InMemoryDashboardCache::new(Duration::from_secs(300));
        cache.put(1, "dashboard_20240615", get_test_snapshot(dec!(1.00)));

        assert!(cache.get(2, "dashboard_20240615").is_none());
    }
}
