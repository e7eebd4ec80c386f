// Common validation types and traits
//
// Request DTOs implement Validator on themselves; handlers run the check
// before any use case executes and convert failures via
// `From<ValidationResult> for ApiError`.

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub is_valid: bool,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            is_valid: true,
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}
