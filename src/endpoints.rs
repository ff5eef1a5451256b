//! The API endpoint URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The dashboard overview page.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route static files are served from.
pub const STATIC: &str = "/static";

/// The route for the machine-readable cashflow chart data.
pub const CASHFLOW_DATA: &str = "/api/cashflow-data";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
