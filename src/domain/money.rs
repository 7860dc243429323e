use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point drift.
/// 1 unit = 100 cents, so 25.50 = 2550 cents.
pub type Cents = i64;

/// Format cents as a plain decimal string.
/// Example: 2550 -> "25.50", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must be a number like 25 or 25.50")]
    InvalidFormat,
    #[error("amount has more than two decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

/// Parse a user-entered amount into cents.
///
/// Accepts an optional leading minus, thousands separators (`1,250.00`)
/// and up to two decimals. Sign checks belong to the caller: a negative
/// transaction amount is a validation failure, not a parse failure.
pub fn parse_amount(input: &str) -> Result<Cents, ParseAmountError> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };

    let (units_str, decimals_str) = match digits.split_once('.') {
        Some((u, d)) => (u, d),
        None => (digits, ""),
    };

    if units_str.is_empty() && decimals_str.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimals_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }
    if decimals_str.len() > 2 {
        return Err(ParseAmountError::TooPrecise);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseAmountError::Overflow)?
    };
    let fraction: i64 = match decimals_str.len() {
        0 => 0,
        // "12.5" means fifty cents
        1 => decimals_str.parse::<i64>().map_err(|_| ParseAmountError::InvalidFormat)? * 10,
        _ => decimals_str.parse().map_err(|_| ParseAmountError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseAmountError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(2550), "25.50");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-2000), "-20.00");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("25.50"), Ok(2550));
        assert_eq!(parse_amount("25"), Ok(2500));
        assert_eq!(parse_amount("12.5"), Ok(1250));
        assert_eq!(parse_amount(".75"), Ok(75));
        assert_eq!(parse_amount("1,250.00"), Ok(125000));
        assert_eq!(parse_amount(" 40 "), Ok(4000));
        assert_eq!(parse_amount("-3.10"), Ok(-310));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::Empty));
        assert_eq!(parse_amount("abc"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("1.2.3"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("."), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("9.999"), Err(ParseAmountError::TooPrecise));
        assert_eq!(
            parse_amount("99999999999999999999"),
            Err(ParseAmountError::Overflow)
        );
    }
}
