//! Connects ledger writes to the dashboard cache.
//!
//! The write path calls [invalidate_on_mutation] after its SQL statement
//! succeeds and before the response is built, so a successful write response
//! always implies the cache no longer holds pre-write aggregates.

use crate::database_id::UserId;

use super::cache::DashboardCache;

/// A mutation of a user's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A transaction was created.
    Created {
        /// The owner of the mutated ledger.
        user_id: UserId,
    },
    /// A transaction was updated.
    Updated {
        /// The owner of the mutated ledger.
        user_id: UserId,
    },
    /// A transaction was deleted.
    Deleted {
        /// The owner of the mutated ledger.
        user_id: UserId,
    },
}

impl LedgerEvent {
    /// The owner of the mutated ledger.
    pub fn user_id(&self) -> UserId {
        match self {
            LedgerEvent::Created { user_id }
            | LedgerEvent::Updated { user_id }
            | LedgerEvent::Deleted { user_id } => *user_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::Created { .. } => "create",
            LedgerEvent::Updated { .. } => "update",
            LedgerEvent::Deleted { .. } => "delete",
        }
    }
}

/// Evict every cached dashboard snapshot belonging to the user whose ledger
/// changed.
///
/// Eviction is deliberately coarse: one call removes all of the user's
/// entries, so no bucket label can hold stale aggregates after a write.
pub fn invalidate_on_mutation(event: &LedgerEvent, cache: &dyn DashboardCache) {
    let user_id = event.user_id();
    tracing::debug!(
        "evicting dashboard cache for user {user_id} after {}",
        event.kind()
    );
    cache.invalidate(user_id);
}

#[cfg(test)]
mod invalidation_tests {
    use std::time::Duration;

    use rust_decimal::dec;

    use crate::{
        dashboard::{
            aggregation::{DashboardSummary, PeriodSeries},
            cache::{DashboardCache, InMemoryDashboardCache},
        },
        transaction::Totals,
    };

    use super::{LedgerEvent, invalidate_on_mutation};

    fn get_test_snapshot() -> DashboardSummary {
        DashboardSummary {
            totals: Totals {
                total_income: dec!(100.00),
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
            breakdown: vec![],
        }
    }

    #[test]
    fn mutation_evicts_the_owners_entries_only() {
        let cache = InMemoryDashboardCache::new(Duration::from_secs(300));
        cache.put(1, "dashboard_20240615", get_test_snapshot());
        cache.put(2, "dashboard_20240615", get_test_snapshot());

        for event in [
            LedgerEvent::Created { user_id: 1 },
            LedgerEvent::Updated { user_id: 1 },
            LedgerEvent::Deleted { user_id: 1 },
        ] {
            cache.put(1, "dashboard_20240615", get_test_snapshot());
            invalidate_on_mutation(&event, &cache);

            assert!(cache.get(1, "dashboard_20240615").is_none());
            assert!(cache.get(2, "dashboard_20240615").is_some());
        }
    }
}
