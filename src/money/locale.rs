use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

use super::{cents, Money};
use crate::error::{LedgerError, Result};

/// Locale-aware formatting preferences. Passed explicitly to every
/// formatting and parsing call instead of being read from the environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LocaleConfig {
    pub currency_symbol: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_format: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "R$ ".to_string(),
            decimal_separator: ',',
            grouping_separator: '.',
            date_format: "%d/%m/%Y".to_string(),
        }
    }
}

impl LocaleConfig {
    /// Reject a `date_format` chrono cannot render.
    pub fn validate(&self) -> Result<()> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(LedgerError::InvalidDateFormat(self.date_format.clone()));
        }
        Ok(())
    }
}

/// Parse a display string such as `"R$ 1.234,56"` into a cent-exact amount.
pub fn parse_currency(input: &str, locale: &LocaleConfig) -> Result<Money> {
    let invalid = || LedgerError::InvalidAmount(input.trim().to_string());

    let mut text = input.trim();
    let negative = text.starts_with('-');
    if negative {
        text = text[1..].trim_start();
    }

    let symbol = locale.currency_symbol.trim();
    if !symbol.is_empty() {
        if let Some(rest) = text.strip_prefix(symbol) {
            text = rest;
        }
    }

    let mut normalized = String::with_capacity(text.len());
    let mut seen_decimal = false;
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            normalized.push(ch);
        } else if ch == locale.decimal_separator {
            if seen_decimal {
                return Err(invalid());
            }
            seen_decimal = true;
            normalized.push('.');
        } else if ch == locale.grouping_separator || ch.is_whitespace() {
            // grouping and spacing carry no value
        } else {
            return Err(invalid());
        }
    }

    if !normalized.chars().any(|ch| ch.is_ascii_digit()) {
        return Err(invalid());
    }

    let value = Decimal::from_str(&normalized).map_err(|_| invalid())?;
    let value = if negative { -value } else { value };
    Ok(cents(value))
}

/// Format an amount as `R$ 1.234,56` (or the configured equivalent).
pub fn format_currency(amount: Money, locale: &LocaleConfig) -> String {
    let mantissa = cents(amount).mantissa();
    let negative = mantissa < 0;
    let abs = mantissa.unsigned_abs();
    let whole = group_digits(&(abs / 100).to_string(), locale.grouping_separator);
    let frac = abs % 100;

    format!(
        "{}{}{}{}{:02}",
        if negative { "-" } else { "" },
        locale.currency_symbol,
        whole,
        locale.decimal_separator,
        frac
    )
}

/// Format a date with the locale pattern, falling back to ISO 8601 when the
/// pattern cannot be rendered.
pub fn format_date(date: NaiveDate, locale: &LocaleConfig) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(&locale.date_format)).is_err() {
        return date.format("%Y-%m-%d").to_string();
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Money {
        Decimal::from_str(s).unwrap()
    }

    fn us() -> LocaleConfig {
        LocaleConfig {
            currency_symbol: "$".to_string(),
            decimal_separator: '.',
            grouping_separator: ',',
            date_format: "%Y-%m-%d".to_string(),
        }
    }

    #[test]
    fn parses_brazilian_input() {
        let locale = LocaleConfig::default();
        assert_eq!(parse_currency("1.234,56", &locale).unwrap(), m("1234.56"));
        assert_eq!(parse_currency("R$ 1.234,56", &locale).unwrap(), m("1234.56"));
        assert_eq!(parse_currency("40", &locale).unwrap(), m("40.00"));
        assert_eq!(parse_currency("0,5", &locale).unwrap(), m("0.50"));
        assert_eq!(parse_currency("-12,30", &locale).unwrap(), m("-12.30"));
    }

    #[test]
    fn extra_fraction_digits_round_to_cents() {
        let locale = LocaleConfig::default();
        assert_eq!(parse_currency("10,005", &locale).unwrap(), m("10.01"));
    }

    #[test]
    fn rejects_garbage() {
        let locale = LocaleConfig::default();
        assert!(parse_currency("", &locale).is_err());
        assert!(parse_currency("abc", &locale).is_err());
        assert!(parse_currency("1,2,3", &locale).is_err());
        assert!(parse_currency("R$", &locale).is_err());
    }

    #[test]
    fn formats_with_grouping() {
        let locale = LocaleConfig::default();
        assert_eq!(format_currency(m("1234.5"), &locale), "R$ 1.234,50");
        assert_eq!(format_currency(m("0"), &locale), "R$ 0,00");
        assert_eq!(format_currency(m("-1000000"), &locale), "-R$ 1.000.000,00");
        assert_eq!(format_currency(m("33.34"), &us()), "$33.34");
    }

    #[test]
    fn format_then_parse_is_lossless_to_the_cent() {
        let locale = LocaleConfig::default();
        for raw in ["0.01", "99.99", "1234567.89", "33.33"] {
            let amount = m(raw);
            let shown = format_currency(amount, &locale);
            assert_eq!(parse_currency(&shown, &locale).unwrap(), amount);
        }
    }

    #[test]
    fn formats_dates_with_locale_pattern() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(format_date(date, &LocaleConfig::default()), "05/03/2026");
        assert_eq!(format_date(date, &us()), "2026-03-05");
    }

    #[test]
    fn bad_date_pattern_is_rejected_and_never_panics() {
        let locale = LocaleConfig {
            date_format: "%d/%Q".to_string(),
            ..LocaleConfig::default()
        };
        assert!(matches!(
            locale.validate(),
            Err(LedgerError::InvalidDateFormat(f)) if f == "%d/%Q"
        ));
        assert!(LocaleConfig::default().validate().is_ok());

        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(format_date(date, &locale), "2026-01-01");
    }
}
