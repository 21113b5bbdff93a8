use std::collections::HashSet;
use std::fmt;

use crate::domain::calendar::MAX_DELIVERY_INDEX;

pub const MAX_ORDER_QUANTITY: u32 = 999;
pub const COUPON_CODE_MAX_LEN: usize = 32;
pub const PAYMENT_METHODS: &[&str] = &["transfer", "cash", "card"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    // Whitespace controls (tab, newline) survive the filter so the
    // normalization below collapses them instead of gluing words together.
    value
        .chars()
        .filter(|ch| !ch.is_control() || ch.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

pub fn validate_quantity(quantity: u32) -> ValidationResult {
    if quantity < 1 {
        return Err(ValidationError::new("quantity", "must be at least 1"));
    }
    if quantity > MAX_ORDER_QUANTITY {
        return Err(ValidationError::new(
            "quantity",
            format!("must be at most {}", MAX_ORDER_QUANTITY),
        ));
    }

    Ok(())
}

/// A submittable schedule is non-empty, in range, and free of duplicates.
pub fn validate_schedule(schedule: &[u32]) -> ValidationResult {
    if schedule.is_empty() {
        return Err(ValidationError::new(
            "schedule",
            "at least one delivery date must be selected",
        ));
    }

    let mut seen = HashSet::with_capacity(schedule.len());
    for &index in schedule {
        if index > MAX_DELIVERY_INDEX {
            return Err(ValidationError::new(
                "schedule",
                format!("delivery index {} is out of range", index),
            ));
        }
        if !seen.insert(index) {
            return Err(ValidationError::new(
                "schedule",
                format!("delivery index {} appears more than once", index),
            ));
        }
    }

    Ok(())
}

pub fn validate_coupon_code(code: &str) -> ValidationResult {
    let code = sanitize_string(code);
    validate_max_len("coupon_code", &code, COUPON_CODE_MAX_LEN)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("payment_method", "card", PAYMENT_METHODS).is_ok());
        assert!(validate_enum("payment_method", "crypto", PAYMENT_METHODS).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("line\nbreak"), "line break");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
    }

    #[test]
    fn validates_quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn rejects_empty_schedule() {
        assert!(validate_schedule(&[]).is_err());
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert!(validate_schedule(&[0, 99, 100, 199]).is_ok());
        assert!(validate_schedule(&[200]).is_err());
    }

    #[test]
    fn rejects_duplicate_indices() {
        assert!(validate_schedule(&[0, 1, 1]).is_err());
    }

    #[test]
    fn validates_coupon_code_length() {
        assert!(validate_coupon_code("PARTNER-A").is_ok());
        assert!(validate_coupon_code(&"X".repeat(33)).is_err());
    }
}
