//! Brazilian-locale number formatting for report output

use rust_decimal::Decimal;

/// Prefix written before a formatted number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// "R$ " (Brazilian Real)
    BRL,
    /// Bare number, for percentages and quantities
    None,
}

/// Format a Decimal with `.` thousands and `,` decimal separators, two places,
/// right-aligned to `width` when `width > 0`.
///
/// # Examples
/// ```
/// use carteira::utils::{format_number, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_number(dec!(1234.56), 0, CurrencySymbol::BRL), "R$ 1.234,56");
/// assert_eq!(format_number(dec!(1234), 10, CurrencySymbol::None), "  1.234,00");
/// ```
pub fn format_number(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let sign = if value < Decimal::ZERO { "-" } else { "" };
    let formatted = format!("{:.2}", value.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let digits: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let prefix = match symbol {
        CurrencySymbol::BRL => "R$ ",
        CurrencySymbol::None => "",
    };
    let result = format!("{}{}{},{}", prefix, sign, grouped, decimal_part);

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// "R$ 1.234,56"
///
/// # Examples
/// ```
/// use carteira::utils::format_currency;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_currency(dec!(1234.56)), "R$ 1.234,56");
/// assert_eq!(format_currency(dec!(-500)), "R$ -500,00");
/// ```
pub fn format_currency(value: Decimal) -> String {
    format_number(value, 0, CurrencySymbol::BRL)
}

/// "5,25%", or "-" when there is no return to show
pub fn format_percent(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{}%", format_number(v, 0, CurrencySymbol::None)),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency_groups_thousands() {
        assert_eq!(format_currency(dec!(0)), "R$ 0,00");
        assert_eq!(format_currency(dec!(0.99)), "R$ 0,99");
        assert_eq!(format_currency(dec!(999.99)), "R$ 999,99");
        assert_eq!(format_currency(dec!(1000)), "R$ 1.000,00");
        assert_eq!(format_currency(dec!(123456)), "R$ 123.456,00");
        assert_eq!(format_currency(dec!(12345678.90)), "R$ 12.345.678,90");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(dec!(-1234.56)), "R$ -1.234,56");
        assert_eq!(format_currency(dec!(-0.01)), "R$ -0,01");
    }

    #[test]
    fn test_format_number_width() {
        assert_eq!(format_number(dec!(100), 12, CurrencySymbol::BRL), "   R$ 100,00");
        assert_eq!(format_number(dec!(1000000), 5, CurrencySymbol::BRL), "R$ 1.000.000,00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(dec!(5))), "5,00%");
        assert_eq!(format_percent(Some(dec!(-0.1234))), "-0,12%");
        assert_eq!(format_percent(None), "-");
    }
}
