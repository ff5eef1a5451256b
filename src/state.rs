//! Implements a struct that holds the state of the server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{
    Error,
    dashboard::{DashboardCache, InMemoryDashboardCache},
    db::initialize,
};

/// The state of the server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The cache that memoizes dashboard snapshots per user.
    pub dashboard_cache: Arc<dyn DashboardCache>,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models. `local_timezone` should be a valid, canonical
    /// timezone name, e.g. "Pacific/Auckland". `cache_ttl` bounds how stale
    /// the dashboard may be in the absence of writes.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        cache_ttl: Duration,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            dashboard_cache: Arc::new(InMemoryDashboardCache::new(cache_ttl)),
            local_timezone: local_timezone.to_owned(),
        })
    }
}
