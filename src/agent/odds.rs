//! Odds parsing
//!
//! Bookmaker pages mix odds with handicaps, lines and scores in the same text. Only
//! unsigned decimal or fractional tokens within [`MIN_ODDS`, `MAX_ODDS`] count as odds.

use super::dom::Element;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use std::sync::LazyLock;

pub const MIN_ODDS: Decimal = dec!(1.01);
pub const MAX_ODDS: Decimal = dec!(100);

static ODDS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([+\-−]?)(\d+(?:[.,]\d+)?(?:\s*/\s*\d+)?)").unwrap());

/// Parse a single odds token: `2.10`, `2,10` or fractional `5/2` (-> 3.5)
pub fn parse_odds_token(token: &str) -> Option<Decimal> {
    let token = token.trim();
    if token.starts_with(['+', '-', '−']) {
        return None;
    }

    let value = match token.split_once('/') {
        Some((num, den)) => {
            let num = Decimal::from_str(num.trim()).ok()?;
            let den = Decimal::from_str(den.trim()).ok()?;
            if den.is_zero() {
                return None;
            }
            Decimal::ONE + num / den
        }
        None => Decimal::from_str(&token.replace(',', ".")).ok()?,
    };

    (MIN_ODDS..=MAX_ODDS).contains(&value).then_some(value)
}

/// Last unsigned odds-like token in free text
pub fn odds_in_text(text: &str) -> Option<Decimal> {
    odds_after_line(text, None)
}

/// Last unsigned odds-like token following the first occurrence of `line`.
/// Without `line`, or when it does not appear, every token is considered.
pub fn odds_after_line(text: &str, line: Option<Decimal>) -> Option<Decimal> {
    let tokens: Vec<(bool, String)> = ODDS_TOKEN
        .captures_iter(text)
        .map(|caps| (caps[1].is_empty(), caps[2].to_string()))
        .collect();

    let start = line
        .and_then(|line| {
            tokens.iter().position(|(unsigned, raw)| {
                *unsigned && Decimal::from_str(&raw.replace(',', ".")).ok() == Some(line)
            })
        })
        .map_or(0, |i| i + 1);

    tokens[start..]
        .iter()
        .filter(|(unsigned, _)| *unsigned)
        .filter_map(|(_, raw)| parse_odds_token(raw))
        .last()
}

/// Odds shown by a bet control: `data-odds`, then odds/price child text, then own text.
/// `line` is the totals line printed in the control; it is never read as the price.
pub fn element_odds(element: &Element, line: Option<Decimal>) -> Option<Decimal> {
    if let Some(odds) = element.data_odds.as_deref().and_then(parse_odds_token) {
        return Some(odds);
    }
    [element.odds_text.as_deref(), element.price_text.as_deref()]
        .into_iter()
        .flatten()
        .find_map(odds_in_text)
        .or_else(|| odds_after_line(&element.text, line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_and_comma() {
        assert_eq!(parse_odds_token("2.10"), Some(dec!(2.10)));
        assert_eq!(parse_odds_token("1,90"), Some(dec!(1.90)));
        assert_eq!(parse_odds_token(" 3 "), Some(dec!(3)));
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_odds_token("5/2"), Some(dec!(3.5)));
        assert_eq!(parse_odds_token("1/4"), Some(dec!(1.25)));
        assert_eq!(parse_odds_token("3/0"), None);
    }

    #[test]
    fn test_range_and_sign() {
        assert_eq!(parse_odds_token("1.00"), None);
        assert_eq!(parse_odds_token("101"), None);
        assert_eq!(parse_odds_token("-1.5"), None);
        assert_eq!(parse_odds_token("+2.5"), None);
    }

    #[test]
    fn test_odds_in_text_skips_handicaps() {
        assert_eq!(odds_in_text("RED SOX -1.5 1.95"), Some(dec!(1.95)));
        assert_eq!(odds_in_text("Más de 2,5 1,85"), Some(dec!(1.85)));
        assert_eq!(odds_in_text("Lakers +4.5"), None);
        assert_eq!(odds_in_text("no numbers"), None);
    }

    #[test]
    fn test_element_odds_preference() {
        let el = Element {
            text: "Over 2.5 1.70".to_string(),
            data_odds: Some("2.05".to_string()),
            odds_text: Some("1.99".to_string()),
            ..Default::default()
        };
        assert_eq!(element_odds(&el, None), Some(dec!(2.05)));

        let el = Element {
            text: "Over 2.5 1.70".to_string(),
            price_text: Some("1,99".to_string()),
            ..Default::default()
        };
        assert_eq!(element_odds(&el, None), Some(dec!(1.99)));

        let el = Element {
            text: "Over 2.5 1.70".to_string(),
            ..Default::default()
        };
        assert_eq!(element_odds(&el, Some(dec!(2.5))), Some(dec!(1.70)));
    }

    #[test]
    fn test_totals_line_is_not_a_price() {
        let el = Element {
            text: "Over 2.5".to_string(),
            ..Default::default()
        };
        assert_eq!(element_odds(&el, Some(dec!(2.5))), None);

        let el = Element {
            text: "Más de 2,5 2,5".to_string(),
            ..Default::default()
        };
        assert_eq!(element_odds(&el, Some(dec!(2.5))), Some(dec!(2.5)));
        assert_eq!(odds_after_line("Under 3.5 1,95", Some(dec!(3.5))), Some(dec!(1.95)));
    }
}
