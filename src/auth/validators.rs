//! Request validation for the auth endpoints

use regex::Regex;
use std::sync::OnceLock;

use super::models::{LoginRequest, RegisterRequest};
use crate::common::{ApiError, ValidationResult, Validator};

const MAX_NAME_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 8;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

fn check_email(result: &mut ValidationResult, email: &str) {
    if email.trim().is_empty() {
        result.add_error("email", "email is required");
    } else if !email_regex().is_match(email) {
        result.add_error("email", "email is not valid");
    }
}

impl Validator<LoginRequest> for LoginRequest {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_email(&mut result, &data.email);
        if data.password.is_empty() {
            result.add_error("password", "password is required");
        }

        result
    }
}

impl Validator<RegisterRequest> for RegisterRequest {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        check_email(&mut result, &data.email);
        if data.password.is_empty() {
            result.add_error("password", "password is required");
        }
        if data.name.trim().is_empty() {
            result.add_error("name", "name is required");
        } else if data.name.len() > MAX_NAME_LENGTH {
            result.add_error("name", "name is too long");
        }

        result
    }
}

/// Minimal strength gate for local registrations: common weak substrings
/// and a length floor. Not an entropy score.
pub fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH
        || password.contains("password")
        || password.contains("123456")
    {
        return Err(ApiError::BadRequest("weak password".to_string()));
    }

    Ok(())
}
