//! Parsing and formatting of Brazilian Real amounts.
//!
//! Users type amounts in whatever style they are used to, e.g. "1.234,56",
//! "1,234.56" or "10,5". [parse_currency] decides which separator is the
//! decimal point by looking at where the separators are and how many digits
//! follow the last one.

use serde::{Deserialize, Deserializer, de};

use crate::Error;

/// Parse a localized amount such as "R$ 1.234,56" into a number.
///
/// When both `,` and `.` appear, whichever comes last is the decimal
/// separator. When only one kind appears, it is a decimal separator if it
/// occurs once and is followed by at most two digits, otherwise it separates
/// thousands.
///
/// Returns `None` if the text contains no digits.
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned: String = text
        .replace("R$", "")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let negative = cleaned.starts_with('-');
    let body: String = cleaned.chars().filter(|&c| c != '-').collect();

    if !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (body.rfind(','), body.rfind('.')) {
        (Some(comma), Some(dot)) => {
            let (decimal, thousands) = if comma > dot { (',', '.') } else { ('.', ',') };
            body.replace(thousands, "").replace(decimal, ".")
        }
        (Some(_), None) => resolve_single_separator(&body, ','),
        (None, Some(_)) => resolve_single_separator(&body, '.'),
        (None, None) => body,
    };

    let amount: f64 = normalized.parse().ok()?;

    Some(if negative { -amount } else { amount })
}

fn resolve_single_separator(body: &str, separator: char) -> String {
    let occurrences = body.matches(separator).count();
    let fraction_digits = body.rsplit(separator).next().map_or(0, str::len);

    if occurrences == 1 && fraction_digits <= 2 {
        body.replace(separator, ".")
    } else {
        body.replace(separator, "")
    }
}

/// Format an amount as Brazilian Reais with thousands separators: R$ 1.234,56
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut with_dots = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if amount < 0.0 && cents > 0 {
        format!("-R$ {with_dots},{fraction:02}")
    } else {
        format!("R$ {with_dots},{fraction:02}")
    }
}

/// The state of a text input bound to an amount.
///
/// While focused the input shows the plain number so it can be edited, and
/// when focus leaves the typed text is parsed and shown formatted again.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyField {
    amount: f64,
    text: String,
    focused: bool,
}

impl CurrencyField {
    /// Create an unfocused field showing `amount` formatted.
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            text: format_brl(amount),
            focused: false,
        }
    }

    /// Show the raw amount for editing.
    pub fn focus(&mut self) {
        self.focused = true;
        self.text = raw_amount(self.amount);
    }

    /// Replace the text with what the user typed.
    pub fn input(&mut self, text: &str) {
        self.text = text.to_owned();
    }

    /// Parse the typed text and show it formatted.
    ///
    /// Text that cannot be parsed is discarded and the last valid amount is kept.
    pub fn blur(&mut self) {
        self.focused = false;

        if let Some(amount) = parse_currency(&self.text) {
            self.amount = amount;
        }

        self.text = format_brl(self.amount);
    }

    /// The last valid amount.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// The text the input should display.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the field is being edited.
    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

/// Zero shows as an empty input so the user can start typing straight away.
fn raw_amount(amount: f64) -> String {
    if amount == 0.0 {
        return String::new();
    }

    let text = format!("{amount:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_owned()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

/// Deserialize a non-negative amount from either a JSON number or a localized string.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = match RawAmount::deserialize(deserializer)? {
        RawAmount::Number(number) => number,
        RawAmount::Text(text) => {
            parse_currency(&text).ok_or_else(|| de::Error::custom(Error::InvalidAmount(text)))?
        }
    };

    if !amount.is_finite() || amount < 0.0 {
        return Err(de::Error::custom(Error::InvalidAmount(amount.to_string())));
    }

    Ok(amount)
}


#[cfg(test)]
mod format_brl_tests {
    use super::format_brl;

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(1000000.99), "R$ 1.000.000,99");
        assert_eq!(format_brl(42.1), "R$ 42,10");
        assert_eq!(format_brl(0.0), "R$ 0,00");
    }

    #[test]
    fn formats_negative() {
        assert_eq!(format_brl(-500.0), "-R$ 500,00");
    }
}


#[cfg(test)]
mod deserialize_amount_tests {
    use serde::Deserialize;

    use super::deserialize_amount;

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(deserialize_with = "deserialize_amount")]
        amount: f64,
    }

    #[test]
    fn accepts_number() {
        let form: Form = serde_json::from_str(r#"{"amount": 12.5}"#).unwrap();
        assert_eq!(form.amount, 12.5);
    }

    #[test]
    fn accepts_localized_text() {
        let form: Form = serde_json::from_str(r#"{"amount": "1.234,56"}"#).unwrap();
        assert_eq!(form.amount, 1234.56);
    }

    #[test]
    fn rejects_negative() {
        assert!(serde_json::from_str::<Form>(r#"{"amount": -1}"#).is_err());
    }

    #[test]
    fn rejects_text_without_digits() {
        assert!(serde_json::from_str::<Form>(r#"{"amount": "abc"}"#).is_err());
    }
}
