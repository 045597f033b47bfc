use std::fmt;

use thiserror::Error;

/// Rejection of caller input before any store access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date is required")]
    MissingDate,
    #[error("attendance records are required")]
    EmptyBatch,
    #[error("invalid student id format: {0}")]
    InvalidStudentId(String),
    #[error("invalid attendance status: {0}")]
    InvalidStatus(String),
    #[error("invalid complaint category: {0}")]
    InvalidCategory(String),
    #[error("invalid complaint status: {0}")]
    InvalidComplaintStatus(String),
    #[error("{}", join(.0))]
    Fields(Vec<FieldError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, reason: &'static str) -> Self {
        FieldError { field, reason }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects field errors and turns them into a single `ValidationError`.
#[derive(Default)]
pub(crate) struct FieldCheck(Vec<FieldError>);

impl FieldCheck {
    pub fn ensure(&mut self, ok: bool, field: &'static str, reason: &'static str) {
        if !ok {
            self.0.push(FieldError::new(field, reason));
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(self.0))
        }
    }
}
