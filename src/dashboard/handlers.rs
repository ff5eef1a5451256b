//! Route handlers for the dashboard page and the cashflow chart data
//! endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::AuthenticatedUser,
    html::{HeadElement, base, format_currency},
    timezone::get_local_offset,
};

use super::{
    aggregation::{CashflowData, DashboardSummary, cashflow_data, dashboard_summary},
    cache::{DashboardCache, fetch_or_compute},
    charts::{
        DashboardChart, category_doughnut, charts_script, charts_view,
        monthly_cashflow_chart,
    },
    period::ChartPeriod,
};

/// The state needed for the dashboard page and the chart data endpoint.
#[derive(Clone)]
pub struct DashboardState {
    /// The database connection for reading the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The cache that memoizes dashboard snapshots per user.
    pub dashboard_cache: Arc<dyn DashboardCache>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            dashboard_cache: state.dashboard_cache.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The cache bucket label for a dashboard snapshot as of `today`.
///
/// Snapshots are keyed by calendar day so a cached dashboard never leaks
/// yesterday's "current month" totals past midnight.
fn daily_bucket_label(today: Date) -> String {
    format!(
        "dashboard_{:04}{:02}{:02}",
        today.year(),
        today.month() as u8,
        today.day()
    )
}

/// "Today" in the configured local timezone.
fn local_today(state: &DashboardState) -> Result<Date, Error> {
    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("invalid timezone {}", state.local_timezone);
        Error::InvalidTimezone(state.local_timezone.clone())
    })?;

    Ok(OffsetDateTime::now_utc().to_offset(local_timezone).date())
}

/// Display a page with an overview of the user's cash flow.
///
/// The snapshot behind the page is served through the dashboard cache and
/// recomputed from the ledger on a miss.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, Error> {
    let today = local_today(&state)?;
    let bucket_label = daily_bucket_label(today);

    // Only a cache miss needs the database.
    let summary = fetch_or_compute(state.dashboard_cache.as_ref(), user_id, &bucket_label, || {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        dashboard_summary(user_id, today, &connection)
            .inspect_err(|error| tracing::error!("could not build dashboard snapshot: {error}"))
    })?;

    Ok(dashboard_view(&summary).into_response())
}

/// A labelled currency figure on the dashboard.
fn stat_card(label: &str, amount: Decimal) -> Markup {
    html!(
        div class="bg-white dark:bg-gray-800 rounded-lg shadow p-4"
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class="text-2xl font-bold" { (format_currency(amount)) }
        }
    )
}

/// Renders the dashboard page from a snapshot.
fn dashboard_view(summary: &DashboardSummary) -> Markup {
    let charts = [
        DashboardChart {
            id: "monthly-cashflow-chart",
            options: monthly_cashflow_chart(&summary.monthly).to_string(),
        },
        DashboardChart {
            id: "category-breakdown-chart",
            options: category_doughnut(&summary.breakdown).to_string(),
        },
    ];

    let content = html!(
        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            section
                id="totals"
                class="w-full mx-auto mb-4 grid grid-cols-1 md:grid-cols-3
                    lg:grid-cols-5 gap-4"
            {
                (stat_card("Total income", summary.totals.total_income))
                (stat_card("Total expenses", summary.totals.total_expense))
                (stat_card("Net balance", summary.totals.net_balance()))
                (stat_card("Income this month", summary.month_totals.total_income))
                (stat_card("Expenses this month", summary.month_totals.total_expense))
            }

            (charts_view(&charts))
        }
    );

    let scripts = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        charts_script(&charts),
    ];

    base("Dashboard", &scripts, &content)
}

/// The query parameters of the cashflow data endpoint.
///
/// Both parameters arrive as raw strings because bad input falls back to a
/// default instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct CashflowParams {
    /// One of "year", "6months", "3months", "month" or "week".
    pub period: Option<String>,
    /// The year for the yearly period.
    pub year: Option<String>,
}

/// A route handler returning the cashflow chart data as JSON.
///
/// Unparsable `period` or `year` values fall back to the yearly view of the
/// current year. The data is recomputed from the ledger on every call.
pub async fn get_cashflow_data(
    State(state): State<DashboardState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<CashflowParams>,
) -> Result<Json<CashflowData>, Error> {
    let today = local_today(&state)?;

    let period = ChartPeriod::parse_or_default(params.period.as_deref());
    let year = params
        .year
        .as_deref()
        .and_then(|text| text.trim().parse::<i32>().ok())
        .filter(|year| (1..=9999).contains(year))
        .unwrap_or_else(|| today.year());

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let data = cashflow_data(user_id, period, year, today, &connection)
        .inspect_err(|error| tracing::error!("could not compute cashflow data: {error}"))?;

    Ok(Json(data))
}

#[cfg(test)]
mod dashboard_handler_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{extract::{Query, State}, http::StatusCode};
    use rusqlite::Connection;
    use rust_decimal::dec;
    use time::OffsetDateTime;

    use crate::{
        auth::AuthenticatedUser,
        dashboard::{
            aggregation::{DashboardSummary, PeriodSeries},
            cache::{DashboardCache, InMemoryDashboardCache},
        },
        db::initialize,
        category::{CategoryName, NewCategory, create_category},
        transaction::{Totals, Transaction, TransactionType, create_transaction},
        user::create_user,
    };

    use super::{
        CashflowParams, DashboardState, daily_bucket_label, get_cashflow_data,
        get_dashboard_page,
    };

    fn get_test_state() -> (DashboardState, Arc<InMemoryDashboardCache>, i64) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("alice", &conn).unwrap();

        let income = create_category(
            user.id,
            NewCategory::new(
                CategoryName::new_unchecked("Wages"),
                TransactionType::Income,
            ),
            &conn,
        )
        .unwrap();
        create_transaction(
            user.id,
            Transaction::build(
                TransactionType::Income,
                dec!(1000.00),
                OffsetDateTime::now_utc().date(),
                income.id,
            ),
            &conn,
        )
        .unwrap();

        let cache = Arc::new(InMemoryDashboardCache::new(Duration::from_secs(300)));
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            dashboard_cache: cache.clone(),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, cache, user.id)
    }

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

    #[tokio::test]
    async fn dashboard_page_loads_and_fills_the_cache() {
        let (state, cache, user_id) = get_test_state();
        let today = OffsetDateTime::now_utc().date();

        let response = get_dashboard_page(State(state), AuthenticatedUser(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(cache.get(user_id, &daily_bucket_label(today)).is_some());
    }

    #[tokio::test]
    async fn cache_hit_does_not_take_the_database_lock() {
        let (state, cache, user_id) = get_test_state();
        let today = OffsetDateTime::now_utc().date();
        cache.put(user_id, &daily_bucket_label(today), get_test_snapshot());

        // Poison the connection lock so any attempt to take it fails.
        let db_connection = state.db_connection.clone();
        std::thread::spawn(move || {
            let _guard = db_connection.lock().unwrap();
            panic!("poison the lock");
        })
        .join()
        .unwrap_err();

        let response = get_dashboard_page(State(state), AuthenticatedUser(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dashboard_page_loads_with_no_data() {
        let (state, _, _) = get_test_state();
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("bob", &conn).unwrap();
        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(conn)),
            ..state
        };

        let response = get_dashboard_page(State(state), AuthenticatedUser(user.id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_year_falls_back_to_current_year() {
        let (state, _, user_id) = get_test_state();

        let data = get_cashflow_data(
            State(state),
            AuthenticatedUser(user_id),
            Query(CashflowParams {
                period: Some("year".to_owned()),
                year: Some("abc".to_owned()),
            }),
        )
        .await
        .unwrap()
        .0;

        // The fallback year contains today's transaction.
        assert_eq!(data.summary.data_points, 12);
        assert_eq!(data.summary.total_income, dec!(1000.00));
    }

    #[tokio::test]
    async fn invalid_period_falls_back_to_yearly() {
        let (state, _, user_id) = get_test_state();

        let data = get_cashflow_data(
            State(state),
            AuthenticatedUser(user_id),
            Query(CashflowParams {
                period: Some("fortnight".to_owned()),
                year: None,
            }),
        )
        .await
        .unwrap()
        .0;

        assert_eq!(data.summary.period, "year");
        assert_eq!(data.labels.len(), 12);
    }

    #[tokio::test]
    async fn labels_and_datasets_have_equal_length() {
        let (state, _, user_id) = get_test_state();

        for period in ["year", "6months", "3months", "month", "week"] {
            let data = get_cashflow_data(
                State(state.clone()),
                AuthenticatedUser(user_id),
                Query(CashflowParams {
                    period: Some(period.to_owned()),
                    year: None,
                }),
            )
            .await
            .unwrap()
            .0;

            let buckets = data.labels.len();
            assert_eq!(data.datasets.income.len(), buckets);
            assert_eq!(data.datasets.expenses.len(), buckets);
            assert_eq!(data.datasets.net_flow.len(), buckets);
            assert_eq!(data.datasets.running_balance.len(), buckets);
            assert_eq!(data.summary.data_points, buckets);
        }
    }
}
