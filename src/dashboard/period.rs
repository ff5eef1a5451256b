//! Time-bucket computation for the cashflow chart.
//!
//! A chart request is answered bucket by bucket, so the boundaries computed
//! here are contractual: buckets are chronological, never overlap and never
//! extend past `today`.

use std::ops::RangeInclusive;

use time::{Date, Duration, Month};

/// The granularity of the cashflow chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartPeriod {
    /// Twelve calendar months of a given year.
    Year,
    /// The last six calendar months, ending with the current month.
    SixMonths,
    /// The last three calendar months, ending with the current month.
    ThreeMonths,
    /// The current month in 7-day windows starting from the 1st.
    Month,
    /// The last seven days, one bucket per day.
    Week,
}

impl ChartPeriod {
    /// Parse the period query parameter.
    ///
    /// Unknown or missing values fall back to [ChartPeriod::Year]. The chart
    /// endpoint degrades gracefully instead of rejecting bad input.
    pub fn parse_or_default(text: Option<&str>) -> Self {
        match text {
            Some("6months") => ChartPeriod::SixMonths,
            Some("3months") => ChartPeriod::ThreeMonths,
            Some("month") => ChartPeriod::Month,
            Some("week") => ChartPeriod::Week,
            _ => ChartPeriod::Year,
        }
    }

    /// The query parameter representation of the period.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartPeriod::Year => "year",
            ChartPeriod::SixMonths => "6months",
            ChartPeriod::ThreeMonths => "3months",
            ChartPeriod::Month => "month",
            ChartPeriod::Week => "week",
        }
    }
}

/// A labelled time window that amounts are aggregated over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// The chart label for the window, e.g. "Jan" or "Week 2".
    pub label: String,
    /// The dates the window covers (inclusive).
    pub range: RangeInclusive<Date>,
}

/// The three-letter abbreviation of a month.
pub(super) fn month_abbreviation(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn month_range(year: i32, month: Month) -> RangeInclusive<Date> {
    // Day 1 and the month length are valid days for any representable year.
    let first = Date::from_calendar_date(year, month, 1).unwrap();
    let last = Date::from_calendar_date(year, month, month.length(year)).unwrap();

    first..=last
}

fn previous_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::January => (year - 1, Month::December),
        month => (year, month.previous()),
    }
}

/// The last `count` calendar months ending with the month of `today`, in
/// chronological order.
fn trailing_months(count: usize, today: Date) -> Vec<Bucket> {
    let mut months = Vec::with_capacity(count);
    let (mut year, mut month) = (today.year(), today.month());

    for _ in 0..count {
        months.push(Bucket {
            label: format!("{} {year}", month_abbreviation(month)),
            range: month_range(year, month),
        });
        (year, month) = previous_month(year, month);
    }

    months.reverse();
    months
}

/// The current month of `today` in 7-day windows starting from the 1st.
///
/// The final window is clipped to `today` and to the end of the month, and
/// windows that would start in the future are omitted entirely.
fn current_month_weeks(today: Date) -> Vec<Bucket> {
    let year = today.year();
    let month = today.month();
    let month_length = month.length(year);

    let mut buckets = Vec::new();
    let mut start_day = 1u8;
    let mut week_number = 1;

    while start_day <= today.day() {
        let end_day = (start_day + 6).min(month_length).min(today.day());

        buckets.push(Bucket {
            label: format!("Week {week_number}"),
            range: Date::from_calendar_date(year, month, start_day).unwrap()
                ..=Date::from_calendar_date(year, month, end_day).unwrap(),
        });

        start_day += 7;
        week_number += 1;
    }

    buckets
}

/// The last seven days ending with `today`, one bucket per day.
fn last_seven_days(today: Date) -> Vec<Bucket> {
    (0..7)
        .rev()
        .map(|days_ago| {
            let day = today - Duration::days(days_ago);
            Bucket {
                label: format!("{} {}", month_abbreviation(day.month()), day.day()),
                range: day..=day,
            }
        })
        .collect()
}

/// Compute the chart buckets for `period`.
///
/// `year` only applies to [ChartPeriod::Year]; the other periods are anchored
/// to `today`.
pub fn period_buckets(period: ChartPeriod, year: i32, today: Date) -> Vec<Bucket> {
    match period {
        ChartPeriod::Year => (1..=12)
            .map(|ordinal| {
                let month = Month::try_from(ordinal).unwrap();
                Bucket {
                    label: month_abbreviation(month).to_owned(),
                    range: month_range(year, month),
                }
            })
            .collect(),
        ChartPeriod::SixMonths => trailing_months(6, today),
        ChartPeriod::ThreeMonths => trailing_months(3, today),
        ChartPeriod::Month => current_month_weeks(today),
        ChartPeriod::Week => last_seven_days(today),
    }
}

#[cfg(test)]
mod chart_period_tests {
    use super::ChartPeriod;

    #[test]
    fn parse_round_trips() {
        for period in [
            ChartPeriod::Year,
            ChartPeriod::SixMonths,
            ChartPeriod::ThreeMonths,
            ChartPeriod::Month,
            ChartPeriod::Week,
        ] {
            assert_eq!(
                ChartPeriod::parse_or_default(Some(period.as_str())),
                period
            );
        }
    }

    #[test]
    fn parse_falls_back_to_year() {
        assert_eq!(ChartPeriod::parse_or_default(None), ChartPeriod::Year);
        assert_eq!(
            ChartPeriod::parse_or_default(Some("fortnight")),
            ChartPeriod::Year
        );
        assert_eq!(ChartPeriod::parse_or_default(Some("")), ChartPeriod::Year);
    }
}
