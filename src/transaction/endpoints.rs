//! Defines the JSON endpoints for listing and mutating transactions.
//!
//! Every mutation evicts the owning user's dashboard cache entries after the
//! database write succeeds and before the response is built, so a successful
//! response means the next dashboard read reflects the write.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of rejecting the request like axum::Form.
use axum_extra::extract::Form;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::AuthenticatedUser,
    dashboard::{DashboardCache, LedgerEvent, invalidate_on_mutation},
    database_id::{CategoryId, TransactionId},
    timezone::get_local_offset,
};

use super::{
    db::{create_transaction, delete_transaction, update_transaction},
    models::{Transaction, TransactionBuilder, TransactionType},
    query::{Totals, TransactionFilter, get_totals, get_transactions},
};

/// The state needed to list and mutate transactions.
#[derive(Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The cache to evict when the ledger changes.
    pub dashboard_cache: Arc<dyn DashboardCache>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            dashboard_cache: state.dashboard_cache.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating or replacing a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// "income" or "expense".
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money as a decimal string, e.g. "19.99".
    pub amount: String,
    /// The business date of the transaction.
    pub date: Date,
    /// The ID of the category to file the transaction under.
    pub category: CategoryId,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl TransactionForm {
    /// Turn the form into a builder, parsing the amount.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if the amount is not a decimal number.
    /// Range and precision are checked later, when the builder is persisted.
    fn into_builder(self) -> Result<TransactionBuilder, Error> {
        let amount = Decimal::from_str(self.amount.trim())
            .map_err(|_| Error::InvalidAmount(format!("{:?} is not a number", self.amount)))?;

        let mut builder =
            Transaction::build(self.transaction_type, amount, self.date, self.category);

        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        if let Some(notes) = &self.notes {
            builder = builder.notes(notes);
        }

        Ok(builder)
    }
}

/// A route handler for creating a new transaction, returns the created
/// transaction as JSON on success.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Form(form): Form<TransactionForm>,
) -> Result<Response, Error> {
    let builder = form.into_builder()?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = create_transaction(user_id, builder, &connection)?;
    invalidate_on_mutation(
        &LedgerEvent::Created { user_id },
        state.dashboard_cache.as_ref(),
    );

    Ok((StatusCode::CREATED, Json(transaction)).into_response())
}

/// A route handler for replacing an existing transaction, returns the updated
/// transaction as JSON on success.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(transaction_id): Path<TransactionId>,
    Form(form): Form<TransactionForm>,
) -> Result<Response, Error> {
    let builder = form.into_builder()?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = update_transaction(transaction_id, user_id, builder, &connection)?;
    invalidate_on_mutation(
        &LedgerEvent::Updated { user_id },
        state.dashboard_cache.as_ref(),
    );

    Ok(Json(transaction).into_response())
}

/// A route handler for deleting a transaction, returns 204 on success.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(transaction_id, user_id, &connection)?;
    invalidate_on_mutation(
        &LedgerEvent::Deleted { user_id },
        state.dashboard_cache.as_ref(),
    );

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// The query parameters for the transaction list endpoint.
///
/// All filters are optional and compose. `period` is a date-range preset that
/// takes precedence over `from`/`to`; unrecognized `type` or `period` values
/// are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    /// Restrict the list to "income" or "expense" transactions.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Restrict the list to one category.
    pub category: Option<CategoryId>,
    /// The first date to include.
    pub from: Option<Date>,
    /// The last date to include.
    pub to: Option<Date>,
    /// Free-text search over descriptions and notes.
    pub search: Option<String>,
    /// A date-range preset: "today", "week", "month" or "year".
    pub period: Option<String>,
}

fn preset_date_range(preset: &str, today: Date) -> Option<std::ops::RangeInclusive<Date>> {
    match preset {
        "today" => Some(today..=today),
        "week" => Some(today - Duration::days(6)..=today),
        "month" => {
            // Day 1 and the month length are valid days for any representable
            // year.
            let first = today.replace_day(1).unwrap();
            let last = today
                .replace_day(today.month().length(today.year()))
                .unwrap();
            Some(first..=last)
        }
        "year" => {
            let first = Date::from_calendar_date(today.year(), time::Month::January, 1).unwrap();
            let last = Date::from_calendar_date(today.year(), time::Month::December, 31).unwrap();
            Some(first..=last)
        }
        _ => None,
    }
}

fn build_filter(params: TransactionListParams, today: Date) -> TransactionFilter {
    let mut filter = TransactionFilter::new();

    if let Some(transaction_type) = params
        .transaction_type
        .as_deref()
        .and_then(TransactionType::parse)
    {
        filter = filter.transaction_type(transaction_type);
    }

    if let Some(category_id) = params.category {
        filter = filter.category(category_id);
    }

    if let Some(search) = params.search.as_deref().filter(|text| !text.is_empty()) {
        filter = filter.search(search);
    }

    let preset_range = params
        .period
        .as_deref()
        .and_then(|preset| preset_date_range(preset, today));

    if let Some(range) = preset_range {
        filter = filter.date_range(range);
    } else if params.from.is_some() || params.to.is_some() {
        let from = params.from.unwrap_or(Date::MIN);
        let to = params.to.unwrap_or(Date::MAX);
        filter = filter.date_range(from..=to);
    }

    filter
}

/// The totals of a filtered transaction listing.
#[derive(Debug, Serialize)]
pub struct TotalsSummary {
    /// The sum of the matching income amounts.
    pub total_income: Decimal,
    /// The sum of the matching expense amounts.
    pub total_expense: Decimal,
    /// Income minus expenses.
    pub net_balance: Decimal,
}

impl From<Totals> for TotalsSummary {
    fn from(totals: Totals) -> Self {
        Self {
            total_income: totals.total_income,
            total_expense: totals.total_expense,
            net_balance: totals.net_balance(),
        }
    }
}

/// The response body for the transaction list endpoint.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// The matching transactions, newest first.
    pub transactions: Vec<Transaction>,
    /// Totals over exactly the same set of transactions.
    pub totals_summary: TotalsSummary,
}

/// A route handler for listing the user's transactions as JSON, together
/// with income/expense totals over the same filtered view.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<TransactionListParams>,
) -> Result<Response, Error> {
    let local_timezone = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!("invalid timezone {}", state.local_timezone);
        Error::InvalidTimezone(state.local_timezone.clone())
    })?;
    let today = OffsetDateTime::now_utc().to_offset(local_timezone).date();

    let filter = build_filter(params, today);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_transactions(user_id, &filter, &connection)?;
    let totals = get_totals(user_id, &filter, &connection)?;

    Ok(Json(TransactionListResponse {
        transactions,
        totals_summary: totals.into(),
    })
    .into_response())
}

#[cfg(test)]
mod transaction_endpoint_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::extract::{Path, Query, State};
    use axum_extra::extract::Form;
    use rusqlite::Connection;
    use rust_decimal::dec;
    use time::macros::date;

    use crate::{
        Error,
        auth::AuthenticatedUser,
        category::{CategoryName, NewCategory, create_category},
        dashboard::{
            DashboardCache, InMemoryDashboardCache,
            aggregation::{DashboardSummary, PeriodSeries},
        },
        db::initialize,
        transaction::{Totals, Transaction, TransactionType, create_transaction},
        user::create_user,
    };

    use super::{
        TransactionForm, TransactionListParams, TransactionState, build_filter,
        create_transaction_endpoint, delete_transaction_endpoint,
        get_transactions_endpoint, update_transaction_endpoint,
    };

    fn get_test_snapshot() -> DashboardSummary {
        DashboardSummary {
            totals: Totals {
                total_income: dec!(0.00),
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

    fn get_test_state() -> (TransactionState, Arc<InMemoryDashboardCache>, i64, i64, i64) {
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
        let expense = create_category(
            user.id,
            NewCategory::new(
                CategoryName::new_unchecked("Food"),
                TransactionType::Expense,
            ),
            &conn,
        )
        .unwrap();

        let cache = Arc::new(InMemoryDashboardCache::new(Duration::from_secs(300)));
        let state = TransactionState {
            db_connection: Arc::new(Mutex::new(conn)),
            dashboard_cache: cache.clone(),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, cache, user.id, income.id, expense.id)
    }

    fn get_test_form(category: i64) -> TransactionForm {
        TransactionForm {
            transaction_type: TransactionType::Income,
            amount: "1000.00".to_owned(),
            date: date!(2024 - 01 - 15),
            category,
            description: Some("January salary".to_owned()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_returns_created_and_evicts_cache() {
        let (state, cache, user_id, income_id, _) = get_test_state();
        cache.put(user_id, "dashboard_20240115", get_test_snapshot());

        let response = create_transaction_endpoint(
            State(state),
            AuthenticatedUser(user_id),
            Form(get_test_form(income_id)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        assert!(cache.get(user_id, "dashboard_20240115").is_none());
    }

    #[tokio::test]
    async fn create_rejects_unparsable_amount() {
        let (state, cache, user_id, income_id, _) = get_test_state();
        cache.put(user_id, "dashboard_20240115", get_test_snapshot());

        let form = TransactionForm {
            amount: "ten dollars".to_owned(),
            ..get_test_form(income_id)
        };

        let result =
            create_transaction_endpoint(State(state), AuthenticatedUser(user_id), Form(form))
                .await;

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        // A rejected write must not evict the cache.
        assert!(cache.get(user_id, "dashboard_20240115").is_some());
    }

    #[tokio::test]
    async fn update_evicts_cache() {
        let (state, cache, user_id, income_id, _) = get_test_state();

        let transaction = {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                user_id,
                Transaction::build(
                    TransactionType::Income,
                    dec!(100.00),
                    date!(2024 - 01 - 15),
                    income_id,
                ),
                &connection,
            )
            .unwrap()
        };
        cache.put(user_id, "dashboard_20240115", get_test_snapshot());

        let response = update_transaction_endpoint(
            State(state),
            AuthenticatedUser(user_id),
            Path(transaction.id),
            Form(get_test_form(income_id)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert!(cache.get(user_id, "dashboard_20240115").is_none());
    }

    #[tokio::test]
    async fn delete_missing_transaction_is_not_found() {
        let (state, cache, user_id, _, _) = get_test_state();
        cache.put(user_id, "dashboard_20240115", get_test_snapshot());

        let result =
            delete_transaction_endpoint(State(state), AuthenticatedUser(user_id), Path(999))
                .await;

        assert!(matches!(result, Err(Error::DeleteMissingTransaction)));
        assert!(cache.get(user_id, "dashboard_20240115").is_some());
    }

    #[tokio::test]
    async fn list_returns_transactions_and_matching_totals() {
        let (state, _, user_id, income_id, expense_id) = get_test_state();

        {
            let connection = state.db_connection.lock().unwrap();
            create_transaction(
                user_id,
                Transaction::build(
                    TransactionType::Income,
                    dec!(1000.00),
                    date!(2024 - 01 - 15),
                    income_id,
                ),
                &connection,
            )
            .unwrap();
            create_transaction(
                user_id,
                Transaction::build(
                    TransactionType::Expense,
                    dec!(300.00),
                    date!(2024 - 01 - 20),
                    expense_id,
                ),
                &connection,
            )
            .unwrap();
        }

        let response = get_transactions_endpoint(
            State(state),
            AuthenticatedUser(user_id),
            Query(TransactionListParams::default()),
        )
        .await
        .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["transactions"].as_array().unwrap().len(), 2);
        assert_eq!(json["totals_summary"]["total_income"], 1000.0);
        assert_eq!(json["totals_summary"]["total_expense"], 300.0);
        assert_eq!(json["totals_summary"]["net_balance"], 700.0);
    }

    #[test]
    fn explicit_date_range_is_applied_when_no_preset_given() {
        let today = date!(2024 - 06 - 15);

        let filter = build_filter(
            TransactionListParams {
                from: Some(date!(2024 - 01 - 01)),
                to: Some(date!(2024 - 01 - 31)),
                ..Default::default()
            },
            today,
        );

        assert_eq!(
            filter,
            crate::transaction::TransactionFilter::new()
                .date_range(date!(2024 - 01 - 01)..=date!(2024 - 01 - 31))
        );
    }

    #[test]
    fn month_preset_covers_the_whole_calendar_month() {
        let today = date!(2024 - 02 - 10);

        let filter = build_filter(
            TransactionListParams {
                period: Some("month".to_owned()),
                ..Default::default()
            },
            today,
        );

        assert_eq!(
            filter,
            crate::transaction::TransactionFilter::new()
                .date_range(date!(2024 - 02 - 01)..=date!(2024 - 02 - 29))
        );
    }

    #[test]
    fn week_preset_covers_the_trailing_seven_days() {
        let today = date!(2024 - 06 - 15);

        let filter = build_filter(
            TransactionListParams {
                period: Some("week".to_owned()),
                ..Default::default()
            },
            today,
        );

        // Bounded above: future-dated transactions stay out of "this week".
        assert_eq!(
            filter,
            crate::transaction::TransactionFilter::new()
                .date_range(date!(2024 - 06 - 09)..=date!(2024 - 06 - 15))
        );
    }

    #[test]
    fn unknown_preset_is_ignored() {
        let filter = build_filter(
            TransactionListParams {
                period: Some("quarter".to_owned()),
                ..Default::default()
            },
            date!(2024 - 06 - 15),
        );

        assert_eq!(filter, crate::transaction::TransactionFilter::new());
    }
}
