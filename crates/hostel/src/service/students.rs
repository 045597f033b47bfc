use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use model::{
    errors::ValidationError,
    student::{normalize_email, Gender, Registration, Student, NOT_AVAILABLE},
};
use serde::Serialize;
use sha2::{Digest as _, Sha256};
use storage::{StoreError, StudentQuery};
use thiserror::Error;

use super::{log_store_error, Store};

#[derive(Clone)]
pub struct Students {
    store: Store,
}

impl Students {
    pub(crate) fn new(store: Store) -> Self {
        Students { store }
    }

    pub async fn register(&self, form: Registration) -> Result<Profile, RegisterError> {
        let valid = form.validate()?;
        if self
            .store
            .call(self.store.find_student_by_email(&valid.email))
            .await?
            .is_some()
        {
            return Err(RegisterError::EmailTaken);
        }

        let student = valid.into_student(password_digest);
        let profile = Profile::from(&student);
        match self.store.call(self.store.insert_student(student)).await {
            Ok(()) => {
                info!("registered student {}", profile.id);
                Ok(profile)
            }
            Err(StoreError::DuplicateKey(field)) if field == "email" => {
                Err(RegisterError::EmailTaken)
            }
            Err(StoreError::DuplicateKey(field)) if field == "national_id" => {
                Err(RegisterError::NationalIdTaken)
            }
            Err(err) => {
                log_store_error(
                    "register",
                    format_args!("email={}", profile.email),
                    &err,
                );
                Err(err.into())
            }
        }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Profile, AuthError> {
        let email = normalize_email(email);
        let student = self
            .store
            .call(self.store.find_student_by_email(&email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if student.password_digest != password_digest(&student.id, password) {
            warn!("failed login for {}", email);
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Profile::from(&student))
    }

    pub async fn profile(&self, student_id: &str) -> Option<Profile> {
        let id = ObjectId::parse_str(student_id.trim()).ok()?;
        match self.store.call(self.store.find_student(id)).await {
            Ok(student) => student.as_ref().map(Profile::from),
            Err(err) => {
                log_store_error("profile", format_args!("student={}", id), &err);
                None
            }
        }
    }

    pub async fn list_students(&self, limit: Option<u64>) -> Vec<StudentRow> {
        let query = StudentQuery::all().limit(limit);
        match self.store.call(self.store.find_students(&query)).await {
            Ok(students) => students.iter().map(StudentRow::from).collect(),
            Err(err) => {
                log_store_error("list_students", format_args!("limit={:?}", limit), &err);
                vec![]
            }
        }
    }

    pub async fn count_students(&self) -> u64 {
        match self
            .store
            .call(self.store.count_students(&StudentQuery::all()))
            .await
        {
            Ok(count) => count,
            Err(err) => {
                log_store_error("count_students", format_args!("query=all"), &err);
                0
            }
        }
    }
}

fn password_digest(id: &ObjectId, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.to_hex().as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    #[error("Email already registered.")]
    EmailTaken,
    #[error("National id already registered.")]
    NationalIdTaken,
    #[error("Registration failed, please try again later.")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Login failed, please try again later.")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Profile {
    #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
    pub id: ObjectId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub parent_phone: String,
    pub address: String,
    pub dob: NaiveDate,
    pub gender: Gender,
    pub national_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Student> for Profile {
    fn from(student: &Student) -> Self {
        Profile {
            id: student.id,
            full_name: student.full_name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone(),
            parent_phone: student.parent_phone.clone(),
            address: student.address.clone(),
            dob: student.dob,
            gender: student.gender,
            national_id: student.national_id.clone(),
            created_at: student.created_at,
        }
    }
}

/// Dashboard listing row. Blank fields show as "N/A".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StudentRow {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Student> for StudentRow {
    fn from(student: &Student) -> Self {
        StudentRow {
            id: student.id.to_hex(),
            full_name: or_not_available(&student.full_name),
            email: or_not_available(&student.email),
            phone: or_not_available(&student.phone),
            created_at: student.created_at,
        }
    }
}

fn or_not_available(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_owned()
    } else {
        value.to_owned()
    }
}
