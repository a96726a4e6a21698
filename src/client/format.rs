// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! en-US display formatting for amounts and percentages.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Currency;

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `€1,234.50`, `$1,234.50`, `ALL 1,234.50` (non-breaking space), minus sign in front.
pub fn format_currency(amount: Decimal, currency: Currency) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let number = format!("{}.{}", group_thousands(int_part), frac_part);
    let symbol = match currency {
        Currency::Eur => "€".to_string(),
        Currency::Usd => "$".to_string(),
        Currency::All => "ALL\u{a0}".to_string(),
    };
    format!("{}{}{}", if negative { "-" } else { "" }, symbol, number)
}

/// One decimal place, e.g. `85.0%`.
pub fn format_percentage(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.1}%", rounded)
}
