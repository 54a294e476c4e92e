//! Erreurs renvoyées à la frontière des opérations

use http::StatusCode;
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::authorization::AccessDenied;
use crate::db::DBError;
use crate::token::TokenError;
use crate::utils::input_validation::{FieldError, ValidationErrors};

pub const DUPLICATE_EMAIL: &str =
    "An account with this email already exists. Please use a different email or login.";
pub const DUPLICATE_LICENSE: &str =
    "A doctor with this license number already exists. Please check your license number.";
pub const DUPLICATE_REGISTRATION: &str =
    "A hospital with this registration number already exists. Please check your registration number.";
const SERVER_ERROR: &str = "Server error";

#[derive(Debug, Error, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{}", DUPLICATE_EMAIL)]
    DuplicateIdentity,

    #[error("{}", DUPLICATE_LICENSE)]
    DuplicateLicense,

    #[error("{}", DUPLICATE_REGISTRATION)]
    DuplicateRegistration,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Your account is pending approval from the hospital.")]
    ApprovalPending,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Not authorized")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Internal(String),
}

impl From<AccessDenied> for ServiceError {
    fn from(_: AccessDenied) -> Self {
        ServiceError::Forbidden
    }
}

impl From<TokenError> for ServiceError {
    fn from(_: TokenError) -> Self {
        ServiceError::Unauthenticated
    }
}

impl From<DBError> for ServiceError {
    fn from(e: DBError) -> Self {
        match e {
            DBError::InvalidIdentityID(_) => ServiceError::NotFound("User"),
            DBError::InvalidPatientID(_) => ServiceError::NotFound("Patient"),
            DBError::InvalidDoctorID(_) => ServiceError::NotFound("Doctor"),
            DBError::InvalidHospitalID(_) => ServiceError::NotFound("Hospital"),
            DBError::InvalidAppointmentID(_) => ServiceError::NotFound("Appointment"),
            DBError::InvalidRecordID(_) => ServiceError::NotFound("Medical record"),
            DBError::EmailTaken(_) => ServiceError::DuplicateIdentity,
            DBError::LicenseTaken(_) => ServiceError::DuplicateLicense,
            DBError::RegistrationTaken(_) => ServiceError::DuplicateRegistration,
            DBError::ProfileMismatch => ServiceError::Internal(e.to_string()),
        }
    }
}

/// Le corps structuré d'une réponse en erreur
#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::DuplicateIdentity
            | ServiceError::DuplicateLicense
            | ServiceError::DuplicateRegistration
            | ServiceError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden | ServiceError::ApprovalPending => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Les erreurs internes ne sont jamais détaillées au client
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            ServiceError::Validation(errors) => ErrorResponse {
                message: errors.to_string(),
                errors: errors.fields().to_vec(),
            },
            ServiceError::Internal(detail) => {
                error!("Internal error: {detail}");
                ErrorResponse {
                    message: SERVER_ERROR.to_string(),
                    errors: vec![],
                }
            }
            other => ErrorResponse {
                message: other.to_string(),
                errors: vec![],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DoctorID;

    #[test]
    fn test_status_classes() {
        assert_eq!(ServiceError::DuplicateLicense.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ServiceError::ApprovalPending.status(), StatusCode::FORBIDDEN);
        assert_eq!(ServiceError::NotFound("Doctor").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_db_errors_map_to_taxonomy() {
        let e: ServiceError = DBError::InvalidDoctorID(DoctorID::new()).into();
        assert_eq!(e, ServiceError::NotFound("Doctor"));
        assert_eq!(e.to_string(), "Doctor not found");

        let e: ServiceError = DBError::LicenseTaken("LIC1".into()).into();
        assert_eq!(e.to_response().message, DUPLICATE_LICENSE);
    }

    #[test]
    fn test_validation_response_lists_fields() {
        let mut errors = ValidationErrors::default();
        errors.add("email", "Please provide a valid email address");
        errors.add("phone", "Phone number is required");

        let response = ServiceError::from(errors).to_response();
        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[1].field, "phone");
        assert!(response.message.contains("Phone number is required"));
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = ServiceError::Internal("disk on fire".into()).to_response();
        assert_eq!(response.message, "Server error");
        assert!(response.errors.is_empty());
    }
}
