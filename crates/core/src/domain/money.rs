use std::str::FromStr;

use rust_decimal::Decimal;

use crate::errors::DomainError;

/// Renders a dollar amount with two fractional digits, e.g. `$5.00`.
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

/// Parses user input like `5`, `2.50` or `$3`. Blank input is `Ok(None)`.
pub fn parse_amount(raw: &str) -> Result<Option<Decimal>, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    Decimal::from_str(digits)
        .map(Some)
        .map_err(|_| DomainError::InvalidAmount(trimmed.to_string()))
}

pub fn parse_positive_amount(raw: &str) -> Result<Decimal, DomainError> {
    match parse_amount(raw)? {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        _ => Err(DomainError::InvalidAmount(raw.trim().to_string())),
    }
}
