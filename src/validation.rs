// 📐 Input validation for Create/Update bodies

use crate::entities::Beneficiario;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
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

pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|c| c.is_ascii_digit())
}

/// Check a beneficiary body. `today` bounds the birth date.
pub fn validate_beneficiario(b: &Beneficiario, today: NaiveDate) -> ValidationResult {
    let mut errors = Vec::new();

    if b.id < 0 {
        errors.push(ValidationError::new("id", "Cannot be negative"));
    }

    if b.nome.trim().is_empty() {
        errors.push(ValidationError::new("nome", "Required field is empty"));
    }

    if !all_digits(&b.cpf, 11) {
        errors.push(ValidationError::new("cpf", "Must be exactly 11 digits"));
    }

    if b.data_nascimento > today {
        errors.push(ValidationError::new("dataNascimento", "Cannot be in the future"));
    }

    if !b.email.is_empty() && !b.email.contains('@') {
        errors.push(ValidationError::new("email", "Not an e-mail address"));
    }

    if !b.cep.is_empty() && !all_digits(&b.cep, 8) {
        errors.push(ValidationError::new("cep", "Must be exactly 8 digits"));
    }

    if b.uf.len() != 2 || !b.uf.bytes().all(|c| c.is_ascii_uppercase()) {
        errors.push(ValidationError::new("uf", "Must be a two-letter state code"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// "field: message; field: message"
pub fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
