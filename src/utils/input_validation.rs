use std::fmt;

use chrono::NaiveDate;
use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidateEmail;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("{_0}")]
pub struct InvalidInput(pub &'static str);

/// Wrapper type for an email address that has been validated and normalized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[serde(try_from = "String")]
pub struct Email(String);

impl TryFrom<&str> for Email {
    type Error = InvalidInput;

    fn try_from(email: &str) -> Result<Self, Self::Error> {
        let email = email.trim();
        if email.is_empty() {
            return Err(InvalidInput("Email is required"));
        }
        if email.len() > MAX_EMAIL_LEN || !email.validate_email() {
            return Err(InvalidInput("Please provide a valid email address"));
        }
        Ok(Self(email.to_lowercase()))
    }
}

impl TryFrom<String> for Email {
    type Error = InvalidInput;

    fn try_from(email: String) -> Result<Self, Self::Error> {
        Email::try_from(email.as_str())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A plaintext password that satisfies the registration policy.
/// Never stored: it only lives until it is hashed.
pub struct Password(String);

impl TryFrom<String> for Password {
    type Error = InvalidInput;

    fn try_from(password: String) -> Result<Self, Self::Error> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(InvalidInput(
                "Password must be at least 6 characters long",
            ));
        }
        Ok(Self(password))
    }
}

impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// A phone number is free text; it only has to be present.
pub fn validate_phone(phone: &str) -> Result<(), InvalidInput> {
    if phone.trim().is_empty() {
        return Err(InvalidInput("Phone number is required"));
    }
    Ok(())
}

/// Parses an ISO 8601 calendar date (`YYYY-MM-DD`), tolerating a trailing time part.
pub fn parse_date(value: &str) -> Result<NaiveDate, InvalidInput> {
    let value = value.trim();
    let day = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| InvalidInput("Please provide a valid date"))
}

/// One violated field of a request payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every violated field of a request payload, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Records a missing value when `value` is blank
    pub fn require(&mut self, field: &'static str, value: &str, message: &'static str) {
        if value.trim().is_empty() {
            self.add(field, message);
        }
    }

    /// Keeps the value on success, records the failure otherwise
    pub fn capture<T, E: fmt::Display>(
        &mut self,
        field: &'static str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        write!(f, "Validation failed: {}", messages.join(", "))
    }
}
