use std::str::FromStr;

use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::errors::{FieldCheck, ValidationError};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub parent_phone: String,
    pub address: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub national_id: String,
    #[serde(default)]
    pub password_digest: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Display identity of a student. Every field may be missing when the
/// underlying row is malformed or the student is gone.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct StudentShort {
    pub id: Option<ObjectId>,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl StudentShort {
    pub fn display_name(&self) -> &str {
        non_empty(&self.full_name)
    }

    pub fn display_email(&self) -> &str {
        non_empty(&self.email)
    }
}

fn non_empty(value: &Option<String>) -> &str {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(NOT_AVAILABLE)
}

impl From<&Student> for StudentShort {
    fn from(student: &Student) -> Self {
        StudentShort {
            id: Some(student.id),
            full_name: Some(student.full_name.clone()),
            email: Some(student.email.clone()),
        }
    }
}

/// Raw registration form.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub parent_phone: String,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub address: String,
    pub national_id: String,
}

/// Registration that passed every field check.
#[derive(Debug, Clone)]
pub struct ValidRegistration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub parent_phone: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub address: String,
    pub national_id: String,
}

impl Registration {
    pub fn validate(self) -> Result<ValidRegistration, ValidationError> {
        let full_name = self.full_name.trim().to_owned();
        let email = normalize_email(&self.email);
        let phone = sanitize_phone(&self.phone);
        let parent_phone = sanitize_phone(&self.parent_phone);
        let address = self.address.trim().to_owned();
        let national_id = self.national_id.trim().to_owned();
        let gender = Gender::from_str(self.gender.trim()).ok();
        let address_len = address.chars().count();

        let mut check = FieldCheck::default();
        check.ensure(full_name.chars().count() >= 2, "full_name", "must be at least 2 characters");
        check.ensure(is_email(&email), "email", "invalid email address");
        check.ensure(self.password.chars().count() >= 6, "password", "must be at least 6 characters");
        check.ensure(is_digits(&phone, 10), "phone", "must be 10 digits");
        check.ensure(is_digits(&parent_phone, 10), "parent_phone", "must be 10 digits");
        check.ensure(gender.is_some(), "gender", "must be male, female or other");
        check.ensure(self.dob.is_some(), "dob", "is required");
        check.ensure((10..=200).contains(&address_len), "address", "must be 10-200 characters");
        check.ensure(is_digits(&national_id, 12), "national_id", "must be 12 digits");
        check.finish()?;

        match (gender, self.dob) {
            (Some(gender), Some(dob)) => Ok(ValidRegistration {
                full_name,
                email,
                password: self.password,
                phone,
                parent_phone,
                gender,
                dob,
                address,
                national_id,
            }),
            _ => Err(ValidationError::Fields(vec![])),
        }
    }
}

impl ValidRegistration {
    pub fn into_student(self, digest: impl FnOnce(&ObjectId, &str) -> String) -> Student {
        let id = ObjectId::new();
        let password_digest = digest(&id, &self.password);
        Student {
            id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            parent_phone: self.parent_phone,
            address: self.address,
            dob: self.dob,
            gender: self.gender,
            national_id: self.national_id,
            password_digest,
            created_at: Utc::now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Keeps only the digits of a phone number.
pub fn sanitize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn is_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty() && !host.is_empty() && !tld.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> Registration {
        Registration {
            full_name: "Asha Verma".to_owned(),
            email: "  Asha.Verma@Example.com ".to_owned(),
            password: "secret1".to_owned(),
            phone: "98765-43210".to_owned(),
            parent_phone: "9123456780".to_owned(),
            gender: "female".to_owned(),
            dob: NaiveDate::from_ymd_opt(2004, 6, 1),
            address: "12 Hostel Road, Pune".to_owned(),
            national_id: "123412341234".to_owned(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let valid = form().validate().unwrap();
        assert_eq!(valid.email, "asha.verma@example.com");
        assert_eq!(valid.phone, "9876543210");
        assert_eq!(valid.gender, Gender::Female);

        let student = valid.into_student(|id, password| format!("{}:{}", id.to_hex(), password));
        assert_eq!(student.full_name, "Asha Verma");
        assert!(student.password_digest.ends_with(":secret1"));
        assert!(student.password_digest.starts_with(&student.id.to_hex()));
    }

    #[test]
    fn test_invalid_fields_are_reported_together() {
        let mut bad = form();
        bad.email = "not-an-email".to_owned();
        bad.phone = "12345".to_owned();
        bad.national_id = "1234".to_owned();
        bad.gender = "unknown".to_owned();
        bad.dob = None;

        let ValidationError::Fields(errors) = bad.validate().unwrap_err() else {
            panic!("expected field errors");
        };
        let fields = errors.iter().map(|e| e.field).collect::<Vec<_>>();
        assert_eq!(fields, vec!["email", "phone", "gender", "dob", "national_id"]);
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email("a@b.c"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.c"));
        assert!(!is_email("a b@c.d"));
        assert!(!is_email("a@.c"));
    }

    #[test]
    fn test_display_identity_placeholders() {
        let short = StudentShort::default();
        assert_eq!(short.display_name(), NOT_AVAILABLE);
        assert_eq!(short.display_email(), NOT_AVAILABLE);

        let short = StudentShort {
            id: Some(ObjectId::new()),
            full_name: Some("  ".to_owned()),
            email: Some("x@y.z".to_owned()),
        };
        assert_eq!(short.display_name(), NOT_AVAILABLE);
        assert_eq!(short.display_email(), "x@y.z");
    }
}
