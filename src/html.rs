//! Shared HTML layout and formatting helpers.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use rust_decimal::Decimal;

/// An extra element to place in the page head.
pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    ScriptLink(String),
    /// JavaScript source code.
    ScriptSource(PreEscaped<String>),
}

/// The shared page skeleton.
pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Cashflow" }
                link rel="icon" type="image/png" href="/static/favicon-32x32.png" sizes="32x32";
                link href="/static/main.css" rel="stylesheet";

                style
                {
                    r#"
                    /* Keep chart tooltips above page content. */
                    .echarts-tooltip {
                        z-index: 30 !important;
                    }
                    "#
                }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::ScriptLink(path) => script src=(path) {}
                    }
                }
            }

            body
                class="container max-w-full min-h-screen bg-gray-50 dark:bg-gray-900"
            {
                (content)
            }
        }
    }
}

/// Format an exact currency amount for display, e.g. "$1234.56".
/// Negative amounts render as "-$1234.56".
pub fn format_currency(amount: Decimal) -> String {
    let amount = amount.round_dp(2);

    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${:.2}", -amount)
    } else {
        format!("${amount:.2}")
    }
}

#[cfg(test)]
mod format_currency_tests {
    use rust_decimal::{Decimal, dec};

    use super::format_currency;

    #[test]
    fn formats_two_decimal_places() {
        assert_eq!(format_currency(dec!(12.3)), "$12.30");
        assert_eq!(format_currency(dec!(1234.56)), "$1234.56");
    }

    #[test]
    fn formats_zero() {
        assert_eq!(format_currency(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn negative_sign_precedes_dollar_sign() {
        assert_eq!(format_currency(dec!(-300)), "-$300.00");
    }
}
