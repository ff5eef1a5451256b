//! Reduces a user's ledger into the derived shapes the dashboard and the
//! cashflow chart display.
//!
//! Everything here is a pure function of the ledger: the same ledger always
//! produces the same output, which is what makes the results safe to cache
//! and cheap to recompute after invalidation. All arithmetic is done in
//! [Decimal], never binary floating point.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    database_id::UserId,
    transaction::{
        Totals, TransactionFilter, get_expense_totals_by_category, get_totals,
    },
};

use super::period::{Bucket, ChartPeriod, period_buckets};

/// How many categories the expense breakdown shows.
pub const CATEGORY_BREAKDOWN_LIMIT: u32 = 10;

/// The label of the placeholder slice shown when there are no expenses.
pub const NO_DATA_LABEL: &str = "No data yet";

/// The color of the placeholder slice shown when there are no expenses.
pub const NO_DATA_COLOR: &str = "#e3e6f0";

/// One slice of the expense category doughnut.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    /// The category display name (icon + name), or the no-data placeholder.
    pub label: String,
    /// The total spent, or a nominal 1 for the placeholder slice.
    pub value: Decimal,
    /// The slice color.
    pub color: String,
}

/// Parallel per-bucket series over a sequence of chart buckets.
///
/// All five vectors have the same length. `running_balance` is the prefix sum
/// of `net_flow` in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSeries {
    /// The bucket labels, chronological.
    pub labels: Vec<String>,
    /// Income per bucket.
    pub income: Vec<Decimal>,
    /// Expenses per bucket.
    pub expense: Vec<Decimal>,
    /// Income minus expenses per bucket.
    pub net_flow: Vec<Decimal>,
    /// Cumulative net flow up to and including each bucket.
    pub running_balance: Vec<Decimal>,
}

impl PeriodSeries {
    /// The number of buckets in the series.
    pub fn data_points(&self) -> usize {
        self.labels.len()
    }

    /// Total income across all buckets.
    pub fn total_income(&self) -> Decimal {
        self.income.iter().sum()
    }

    /// Total expenses across all buckets.
    pub fn total_expense(&self) -> Decimal {
        self.expense.iter().sum()
    }

    /// The last running balance, or zero when the series has no buckets.
    pub fn final_balance(&self) -> Decimal {
        self.running_balance.last().copied().unwrap_or(Decimal::ZERO)
    }
}

/// Everything the dashboard page needs, computed in one pass.
///
/// This is the value the dashboard cache stores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Totals over the user's full transaction history.
    pub totals: Totals,
    /// Totals restricted to the current calendar month.
    pub month_totals: Totals,
    /// Income and expenses per month for the current year.
    pub monthly: PeriodSeries,
    /// Top expense categories, or the no-data placeholder.
    pub breakdown: Vec<BreakdownEntry>,
}

/// Compute per-bucket totals for each of `buckets`.
///
/// Buckets with no transactions report exact zero, never a missing entry, so
/// the series always lines up with its labels.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn period_series(
    user_id: UserId,
    buckets: &[Bucket],
    connection: &Connection,
) -> Result<PeriodSeries, Error> {
    let mut series = PeriodSeries {
        labels: Vec::with_capacity(buckets.len()),
        income: Vec::with_capacity(buckets.len()),
        expense: Vec::with_capacity(buckets.len()),
        net_flow: Vec::with_capacity(buckets.len()),
        running_balance: Vec::with_capacity(buckets.len()),
    };
    let mut balance = Decimal::ZERO;

    for bucket in buckets {
        let totals = get_totals(
            user_id,
            &TransactionFilter::new().date_range(bucket.range.clone()),
            connection,
        )?;
        let net_flow = totals.net_balance();
        balance += net_flow;

        series.labels.push(bucket.label.clone());
        series.income.push(totals.total_income);
        series.expense.push(totals.total_expense);
        series.net_flow.push(net_flow);
        series.running_balance.push(balance);
    }

    Ok(series)
}

/// Compute the top expense categories for the doughnut chart.
///
/// Never returns an empty list: a user with no expenses gets a single
/// placeholder slice so chart renderers always have a series to draw.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn category_breakdown(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<BreakdownEntry>, Error> {
    let entries: Vec<BreakdownEntry> =
        get_expense_totals_by_category(user_id, CATEGORY_BREAKDOWN_LIMIT, connection)?
            .into_iter()
            .map(|category_total| BreakdownEntry {
                label: category_total.name,
                value: category_total.total,
                color: category_total.color,
            })
            .collect();

    if entries.is_empty() {
        return Ok(vec![BreakdownEntry {
            label: NO_DATA_LABEL.to_owned(),
            value: Decimal::ONE,
            color: NO_DATA_COLOR.to_owned(),
        }]);
    }

    Ok(entries)
}

/// The first through last day of the month containing `today`.
fn current_month_range(today: Date) -> std::ops::RangeInclusive<Date> {
    // Day 1 and the month length are valid days for any representable year.
    let first = today.replace_day(1).unwrap();
    let last = today
        .replace_day(today.month().length(today.year()))
        .unwrap();

    first..=last
}

/// Compute the full dashboard snapshot for `user_id` as of `today`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn dashboard_summary(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<DashboardSummary, Error> {
    let totals = get_totals(user_id, &TransactionFilter::new(), connection)?;
    let month_totals = get_totals(
        user_id,
        &TransactionFilter::new().date_range(current_month_range(today)),
        connection,
    )?;
    let monthly = period_series(
        user_id,
        &period_buckets(ChartPeriod::Year, today.year(), today),
        connection,
    )?;
    let breakdown = category_breakdown(user_id, connection)?;

    Ok(DashboardSummary {
        totals,
        month_totals,
        monthly,
        breakdown,
    })
}

/// The machine-readable cashflow chart payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowData {
    /// The bucket labels, chronological.
    pub labels: Vec<String>,
    /// The per-bucket data series.
    pub datasets: CashflowDatasets,
    /// Scalar totals over the requested period.
    pub summary: CashflowSummary,
}

/// The per-bucket data series of the cashflow chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowDatasets {
    /// Income per bucket.
    pub income: Vec<Decimal>,
    /// Expenses per bucket.
    pub expenses: Vec<Decimal>,
    /// Income minus expenses per bucket.
    pub net_flow: Vec<Decimal>,
    /// Cumulative net flow per bucket.
    pub running_balance: Vec<Decimal>,
}

/// Scalar totals over the requested chart period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowSummary {
    /// Total income across the period.
    pub total_income: Decimal,
    /// Total expenses across the period.
    pub total_expenses: Decimal,
    /// Income minus expenses across the period.
    pub net_flow: Decimal,
    /// The last running balance, or zero for an empty series.
    pub final_balance: Decimal,
    /// The period the data was computed for.
    pub period: &'static str,
    /// The number of buckets.
    pub data_points: usize,
}

/// Compute the cashflow chart payload for `period`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn cashflow_data(
    user_id: UserId,
    period: ChartPeriod,
    year: i32,
    today: Date,
    connection: &Connection,
) -> Result<CashflowData, Error> {
    let buckets = period_buckets(period, year, today);
    let series = period_series(user_id, &buckets, connection)?;

    let summary = CashflowSummary {
        total_income: series.total_income(),
        total_expenses: series.total_expense(),
        net_flow: series.total_income() - series.total_expense(),
        final_balance: series.final_balance(),
        period: period.as_str(),
        data_points: series.data_points(),
    };

    Ok(CashflowData {
        labels: series.labels,
        datasets: CashflowDatasets {
            income: series.income,
            expenses: series.expense,
            net_flow: series.net_flow,
            running_balance: series.running_balance,
        },
        summary,
    })
}
