//! Dashboard module
//!
//! Turns the raw transaction ledger into time-bucketed financial summaries
//! served through a per-user TTL cache that the write path invalidates.

pub mod aggregation;
pub mod cache;
mod charts;
mod handlers;
mod invalidation;
pub mod period;

pub use cache::{DEFAULT_CACHE_TTL_SECS, DashboardCache, InMemoryDashboardCache, fetch_or_compute};
pub use handlers::{CashflowParams, DashboardState, get_cashflow_data, get_dashboard_page};
pub use invalidation::{LedgerEvent, invalidate_on_mutation};
pub use period::ChartPeriod;
