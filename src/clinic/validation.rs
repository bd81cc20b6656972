use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::states::UnknownVariant;
use crate::error::{ClinicError, ClinicResult};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static SLOT_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("time pattern compiles"));

/// Trimmed, non-empty text or a validation error naming the field.
pub fn required(field: &str, value: &str) -> ClinicResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClinicError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Blank optional strings are stored as NULL.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lower-cased address; uniqueness is case-insensitive.
pub fn email(value: &str) -> ClinicResult<String> {
    let email = value.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err(ClinicError::validation(format!("Invalid email address: {value}")));
    }
    Ok(email)
}

/// Zero-padded 24h `HH:MM`. Plain string comparison orders these correctly.
pub fn slot_time(field: &str, value: &str) -> ClinicResult<String> {
    let value = value.trim();
    if !SLOT_TIME.is_match(value) {
        return Err(ClinicError::validation(format!(
            "{field} must be a zero-padded HH:MM time, got '{value}'"
        )));
    }
    Ok(value.to_string())
}

/// Calendar date in `YYYY-MM-DD` form.
pub fn date(field: &str, value: &str) -> ClinicResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ClinicError::validation(format!("{field} must be a YYYY-MM-DD date, got '{value}'")))
}

/// One of the wire names of a text enum.
pub fn choice<T>(value: &str) -> ClinicResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value.trim().parse().map_err(|e: UnknownVariant| ClinicError::validation(e.to_string()))
}

/// Largest value a NUMERIC(12,2) price column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest value a NUMERIC(14,2) total column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Non-negative money rounded to cents, no larger than `max`.
pub fn amount(field: &str, value: Decimal, max: Decimal) -> ClinicResult<Decimal> {
    if value < Decimal::ZERO {
        return Err(ClinicError::validation(format!("{field} cannot be negative")));
    }
    let value = value.round_dp(2);
    if value > max {
        return Err(ClinicError::validation(format!("{field} cannot exceed {max}")));
    }
    Ok(value)
}

pub fn password(value: &str) -> ClinicResult<&str> {
    if value.chars().count() < 6 {
        return Err(ClinicError::validation("Password must be at least 6 characters"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalised() {
        assert_eq!(email("  Dr.House@Clinic.ORG ").unwrap(), "dr.house@clinic.org");
        assert!(email("not-an-email").is_err());
        assert!(email("a@b").is_err());
    }

    #[test]
    fn slot_time_requires_zero_padding() {
        assert_eq!(slot_time("time", "09:30").unwrap(), "09:30");
        assert!(slot_time("time", "9:30").is_err());
        assert!(slot_time("time", "24:00").is_err());
        assert!(slot_time("time", "12:60").is_err());
        assert!(slot_time("time", "noon").is_err());
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("name", "  Ana ").unwrap(), "Ana");
        let err = required("name", "   ").unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn dates_must_be_iso_calendar_days() {
        assert_eq!(date("date", "2026-10-19").unwrap(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(date("date", "2026-02-30").is_err());
        assert!(date("date", "19/10/2026").is_err());
    }

    #[test]
    fn choice_reports_the_unknown_value() {
        use crate::clinic::AppointmentStatus;
        assert_eq!(choice::<AppointmentStatus>(" Approved ").unwrap(), AppointmentStatus::Approved);
        let err = choice::<AppointmentStatus>("Done").unwrap_err();
        assert_eq!(err.to_string(), "unknown appointment status: Done");
    }

    #[test]
    fn amount_bounds_follow_column_precision() {
        use rust_decimal_macros::dec;
        assert_eq!(MAX_PRICE, dec!(9999999999.99));
        assert_eq!(MAX_AMOUNT, dec!(999999999999.99));

        assert_eq!(amount("price", dec!(2.005), MAX_PRICE).unwrap(), dec!(2.00));
        assert_eq!(amount("price", MAX_PRICE, MAX_PRICE).unwrap(), MAX_PRICE);
        let err = amount("price", dec!(10000000000), MAX_PRICE).unwrap_err();
        assert_eq!(err.to_string(), "price cannot exceed 9999999999.99");
        assert!(amount("price", Decimal::MAX, MAX_PRICE).is_err());
        assert!(amount("tax", dec!(-0.01), MAX_AMOUNT).is_err());
    }

    #[test]
    fn optional_drops_blank_values() {
        assert_eq!(optional(Some("  ".into())), None);
        assert_eq!(optional(Some(" x ".into())), Some("x".into()));
        assert_eq!(optional(None), None);
    }
}
