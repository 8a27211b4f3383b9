//! Currencies and currency formatting.

use std::{fmt::Display, str::FromStr};

use numfmt::{Formatter, Precision};
use serde::{Deserialize, Serialize};

/// The currencies a family or user can keep their ledger in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// United States dollar.
    #[default]
    USD,
    /// Euro.
    EUR,
    /// Pound sterling.
    GBP,
    /// Indian rupee.
    INR,
    /// Canadian dollar.
    CAD,
    /// Australian dollar.
    AUD,
    /// Japanese yen.
    JPY,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Currency; 7] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::INR,
        Currency::CAD,
        Currency::AUD,
        Currency::JPY,
    ];

    /// The symbol placed before formatted amounts.
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::USD | Currency::CAD | Currency::AUD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::INR => "₹",
            Currency::JPY => "¥",
        }
    }

    /// The ISO 4217 code, e.g. "USD".
    pub fn code(self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::INR => "INR",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|currency| currency.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unsupported currency \"{s}\""))
    }
}

/// Format `amount` with the symbol of `currency`, thousands separators and two decimal places,
/// e.g. "$1,234.50" or "-€12.30".
pub fn format_currency(amount: f64, currency: Currency) -> String {
    let symbol = currency.symbol();

    if amount == 0.0 {
        // numfmt renders zero as "0"
        return format!("{symbol}0.00");
    }

    let prefix = if amount < 0.0 {
        format!("-{symbol}")
    } else {
        symbol.to_owned()
    };

    let formatted_string = match Formatter::currency(&prefix) {
        Ok(formatter) => formatter
            .precision(Precision::Decimals(2))
            .fmt_string(amount.abs()),
        Err(error) => {
            tracing::warn!("could not create currency formatter for {prefix}: {error:?}");
            return format!("{prefix}{:.2}", amount.abs());
        }
    };

    // numfmt drops trailing zeros, e.g. "12.30" is rendered as "12.3".
    match formatted_string.rfind('.') {
        None => format!("{formatted_string}.00"),
        Some(position) if formatted_string.len() - position == 2 => {
            format!("{formatted_string}0")
        }
        Some(_) => formatted_string,
    }
}
