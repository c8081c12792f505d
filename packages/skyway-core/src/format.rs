//! Amount formatting helpers
//!
//! Conversions between base (atomic) units and two-decimal display strings,
//! plus small input-normalization helpers used by deposit/withdraw forms.

use crate::error::BridgeError;

/// Normalize a user-typed decimal string so it always has a leading digit.
///
/// `".5"` becomes `"0.5"`; everything else passes through unchanged,
/// including the empty string and a bare `"."` (which becomes `"0."`).
pub fn pad_decimal(value: &str) -> String {
    if value.starts_with('.') {
        format!("0{value}")
    } else {
        value.to_string()
    }
}

/// Format a base-unit amount as a display value with two decimals.
///
/// Rounds half away from zero at the third decimal, matching the display
/// rule used throughout the bridge UI.
pub fn format_balance(base_units: &str, decimals: u32) -> Result<String, BridgeError> {
    let value: u128 = base_units
        .parse()
        .map_err(|_| BridgeError::Amount(format!("not a base-unit integer: {base_units:?}")))?;

    if decimals > 38 {
        return Err(BridgeError::Amount(format!(
            "unsupported decimal precision: {decimals}"
        )));
    }

    let divisor = 10u128.pow(decimals);
    let whole = value / divisor;
    let frac = value % divisor;

    // Scale the fractional part to three decimal digits, then round the
    // third away from zero to get two.
    let frac3 = frac
        .checked_mul(1_000)
        .map(|f| f / divisor)
        .ok_or_else(|| BridgeError::Amount("amount too large to format".to_string()))?;
    let rounded = (frac3 + 5) / 10;

    // Rounding 0.995.. up carries into the integer part
    let (whole, cents) = if rounded >= 100 {
        (whole + 1, rounded - 100)
    } else {
        (whole, rounded)
    };

    Ok(format!("{whole}.{cents:02}"))
}

/// Convert a display-unit decimal string to base units.
///
/// `to_base_units("5", 6)` is `"5000000"`; excess fractional digits are an
/// error rather than silently truncated.
pub fn to_base_units(display: &str, decimals: u32) -> Result<String, BridgeError> {
    if decimals > 38 {
        return Err(BridgeError::Amount(format!(
            "unsupported decimal precision: {decimals}"
        )));
    }

    let display = pad_decimal(display.trim());
    if display.is_empty() {
        return Err(BridgeError::Amount("empty amount".to_string()));
    }

    let (whole, frac) = match display.split_once('.') {
        Some((w, f)) => (w, f),
        None => (display.as_str(), ""),
    };

    // Both parts must be bare digit runs; u128::from_str would also accept a
    // sign, which silently changes the transferred value ("1.+5" -> 1.05)
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::Amount(format!(
            "not a decimal number: {display:?}"
        )));
    }

    if frac.len() as u32 > decimals {
        return Err(BridgeError::Amount(format!(
            "more than {decimals} fractional digits: {display:?}"
        )));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| BridgeError::Amount(format!("not a decimal number: {display:?}")))?
    };
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse()
            .map_err(|_| BridgeError::Amount(format!("not a decimal number: {display:?}")))?
    };

    let scale = 10u128.pow(decimals);
    let frac_scale = 10u128.pow(decimals - frac.len() as u32);
    let base = whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_value * frac_scale))
        .ok_or_else(|| BridgeError::Amount("amount too large".to_string()))?;

    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_decimal_table() {
        assert_eq!(pad_decimal(".5"), "0.5");
        assert_eq!(pad_decimal("1.5"), "1.5");
        assert_eq!(pad_decimal(""), "");
        assert_eq!(pad_decimal("."), "0.");
    }

    #[test]
    fn test_format_balance_whole_unit() {
        assert_eq!(
            format_balance("1000000000000000000", 18).unwrap(),
            "1.00"
        );
    }

    #[test]
    fn test_format_balance_truncates_to_two_decimals() {
        assert_eq!(format_balance("123456000000000000", 18).unwrap(), "0.12");
    }

    #[test]
    fn test_format_balance_rounds_half_away_from_zero() {
        // 0.125 rounds up at the third decimal
        assert_eq!(format_balance("125000000000000000", 18).unwrap(), "0.13");
        // 0.124 rounds down
        assert_eq!(format_balance("124000000000000000", 18).unwrap(), "0.12");
        // 0.995 carries into the integer part
        assert_eq!(format_balance("995000000000000000", 18).unwrap(), "1.00");
    }

    #[test]
    fn test_format_balance_six_decimals() {
        assert_eq!(format_balance("5000000", 6).unwrap(), "5.00");
        assert_eq!(format_balance("5120000", 6).unwrap(), "5.12");
        assert_eq!(format_balance("0", 6).unwrap(), "0.00");
    }

    #[test]
    fn test_format_balance_rejects_garbage() {
        assert!(format_balance("1.5", 6).is_err());
        assert!(format_balance("abc", 6).is_err());
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units("5", 6).unwrap(), "5000000");
        assert_eq!(to_base_units("5.5", 6).unwrap(), "5500000");
        assert_eq!(to_base_units(".5", 6).unwrap(), "500000");
        assert_eq!(to_base_units("0.000001", 6).unwrap(), "1");
    }

    #[test]
    fn test_to_base_units_rejects_excess_precision() {
        assert!(to_base_units("0.0000001", 6).is_err());
        assert!(to_base_units("", 6).is_err());
    }

    #[test]
    fn test_to_base_units_rejects_signed_parts() {
        // A signed fractional part would otherwise parse as "1.05"
        assert!(to_base_units("1.+5", 6).is_err());
        assert!(to_base_units("+1.5", 6).is_err());
        assert!(to_base_units("1.-5", 6).is_err());
        assert!(to_base_units("-1", 6).is_err());
    }

    #[test]
    fn test_to_base_units_rejects_absurd_precision() {
        assert!(to_base_units("1", 40).is_err());
    }
}
