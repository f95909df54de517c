//! Display formatters for card input and amounts

use rust_decimal::{Decimal, RoundingStrategy};

pub use crate::lifecycle::format_time_remaining;

/// Groups of four digits: `4532015112830366` → `4532 0151 1283 0366`
pub fn format_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| !c.is_whitespace()).collect();
    digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Live `MM/YY` formatting of whatever the user has typed so far
pub fn format_expiration_input(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).take(4).collect();
    if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

/// `$` for USD and MXN, the code itself otherwise. Always two decimals.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let symbol = match currency {
        "USD" | "MXN" => "$",
        other => other,
    };
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{symbol}{rounded:.2}")
}

/// Only the last four digits stay visible
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| !c.is_whitespace()).collect();
    let last4: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("•••• •••• •••• {last4}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_card_number_grouping() {
        assert_eq!(format_card_number("4532015112830366"), "4532 0151 1283 0366");
        assert_eq!(format_card_number("3782 822463 10005"), "3782 8224 6310 005");
        assert_eq!(format_card_number(""), "");
    }

    #[test]
    fn test_expiration_input() {
        assert_eq!(format_expiration_input("1"), "1");
        assert_eq!(format_expiration_input("12"), "12");
        assert_eq!(format_expiration_input("123"), "12/3");
        assert_eq!(format_expiration_input("12/345"), "12/34");
    }

    #[test]
    fn test_amount() {
        assert_eq!(format_amount(dec!(123), "USD"), "$123.00");
        assert_eq!(format_amount(dec!(10.005), "MXN"), "$10.01");
        assert_eq!(format_amount(dec!(5.5), "EUR"), "EUR5.50");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask_card_number("4532 0151 1283 0366"), "•••• •••• •••• 0366");
        assert_eq!(mask_card_number("12"), "•••• •••• •••• 12");
    }
}
