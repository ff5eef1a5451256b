//! Chart generation for the dashboard page.
//!
//! Builds ECharts configurations for the monthly income/expense bar chart and
//! the expense category doughnut, plus the HTML containers and the
//! initialization JavaScript that wires them up in the browser.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    datatype::DataPointItem,
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, ItemStyle, JsFunction,
        Tooltip, Trigger,
    },
    series::{Pie, bar::Bar},
};
use maud::{Markup, PreEscaped, html};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::html::HeadElement;

use super::aggregation::{BreakdownEntry, PeriodSeries};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates JavaScript initialization code for dashboard charts.
///
/// Creates scripts that initialize ECharts instances with responsive
/// resizing.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// ECharts only understands plain numbers; exactness ends at the chart
/// boundary.
fn chart_values(values: &[Decimal]) -> Vec<f64> {
    values
        .iter()
        .map(|value| value.to_f64().unwrap_or(0.0))
        .collect()
}

pub(super) fn monthly_cashflow_chart(series: &PeriodSeries) -> Chart {
    Chart::new()
        .title(
            Title::new()
                .text("Income and expenses")
                .subtext("By month, this year"),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().top("bottom"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("10%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(series.labels.clone()),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name("Income")
                .item_style(ItemStyle::new().color("#1cc88a"))
                .data(chart_values(&series.income)),
        )
        .series(
            Bar::new()
                .name("Expenses")
                .item_style(ItemStyle::new().color("#e74a3b"))
                .data(chart_values(&series.expense)),
        )
}

pub(super) fn category_doughnut(breakdown: &[BreakdownEntry]) -> Chart {
    let data: Vec<DataPointItem> = breakdown
        .iter()
        .map(|entry| {
            DataPointItem::new(entry.value.to_f64().unwrap_or(0.0))
                .name(entry.label.clone())
                .item_style(ItemStyle::new().color(entry.color.clone()))
        })
        .collect();

    Chart::new()
        .title(
            Title::new()
                .text("Spending by category")
                .subtext("Top categories, all time"),
        )
        .tooltip(Tooltip::new().trigger(Trigger::Item))
        .legend(Legend::new().top("bottom"))
        .series(
            Pie::new()
                .name("Expenses")
                .radius(vec!["45%", "70%"])
                .avoid_label_overlap(false)
                .data(data),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
