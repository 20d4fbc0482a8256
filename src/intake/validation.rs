//! Per-field validators run on every edit.
//!
//! Each validator looks at one field only. The controller adds or clears that
//! field's entry in [`FieldErrors`] and leaves the others alone.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::model::{Field, parse_guest_count};

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    #[error("required")]
    Required,
    #[error("too short")]
    TooShort,
    #[error("invalid format")]
    InvalidFormat,
    #[error("below minimum")]
    BelowMinimum,
}

/// Human-readable message shown under the field.
pub fn message(field: Field, kind: FieldErrorKind) -> &'static str {
    use FieldErrorKind::*;
    match (field, kind) {
        (Field::Name, Required) => "Name is required",
        (Field::Name, _) => "Name must be at least 2 characters",
        (Field::Phone, Required) => "Phone is required",
        (Field::Phone, _) => "Please enter a valid 10-digit phone number",
        (Field::Email, Required) => "Email is required",
        (Field::Email, _) => "Please enter a valid email",
        (Field::GuestCount, Required) => "Number of guests is required",
        (Field::GuestCount, _) => "Must be at least 1 guest",
    }
}

pub fn validate_name(value: &str) -> Result<(), FieldErrorKind> {
    if value.trim().is_empty() {
        return Err(FieldErrorKind::Required);
    }
    if value.chars().count() < 2 {
        return Err(FieldErrorKind::TooShort);
    }
    Ok(())
}

pub fn validate_phone(value: &str) -> Result<(), FieldErrorKind> {
    if value.trim().is_empty() {
        return Err(FieldErrorKind::Required);
    }
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    if digits != 10 {
        return Err(FieldErrorKind::InvalidFormat);
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), FieldErrorKind> {
    if value.trim().is_empty() {
        return Err(FieldErrorKind::Required);
    }
    if !EMAIL_SHAPE.is_match(value) {
        return Err(FieldErrorKind::InvalidFormat);
    }
    Ok(())
}

pub fn validate_guest_count(value: &str) -> Result<(), FieldErrorKind> {
    match parse_guest_count(value) {
        None => Err(FieldErrorKind::Required),
        Some(n) if n < 1 => Err(FieldErrorKind::BelowMinimum),
        Some(_) => Ok(()),
    }
}

/// Run the validator that belongs to `field`.
pub fn validate(field: Field, value: &str) -> Result<(), FieldErrorKind> {
    match field {
        Field::Name => validate_name(value),
        Field::Phone => validate_phone(value),
        Field::Email => validate_email(value),
        Field::GuestCount => validate_guest_count(value),
    }
}

/// Inline error messages keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    /// Validate `value` and update only `field`'s entry.
    /// Returns the failure, if any.
    pub fn revalidate(&mut self, field: Field, value: &str) -> Option<FieldErrorKind> {
        match validate(field, value) {
            Ok(()) => {
                self.0.remove(&field);
                None
            }
            Err(kind) => {
                self.0.insert(field, message(field, kind).to_string());
                Some(kind)
            }
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
