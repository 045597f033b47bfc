use std::str::FromStr;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::{
    errors::{FieldCheck, ValidationError},
    student::StudentShort,
};

const DESCRIPTION_MIN: usize = 10;
const DESCRIPTION_MAX: usize = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ComplaintCategory {
    Maintenance,
    Mess,
    Noise,
    Security,
    Harassment,
    Other,
}

impl FromStr for ComplaintCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Maintenance" => Ok(ComplaintCategory::Maintenance),
            "Mess" => Ok(ComplaintCategory::Mess),
            "Noise" => Ok(ComplaintCategory::Noise),
            "Security" => Ok(ComplaintCategory::Security),
            "Harassment" => Ok(ComplaintCategory::Harassment),
            "Other" => Ok(ComplaintCategory::Other),
            other => Err(ValidationError::InvalidCategory(other.to_owned())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum ComplaintStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "Pending",
            ComplaintStatus::InProgress => "In Progress",
            ComplaintStatus::Resolved => "Resolved",
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ComplaintStatus::Pending),
            "In Progress" => Ok(ComplaintStatus::InProgress),
            "Resolved" => Ok(ComplaintStatus::Resolved),
            other => Err(ValidationError::InvalidComplaintStatus(other.to_owned())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Complaint {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub student_id: ObjectId,
    pub category: ComplaintCategory,
    pub description: String,
    pub status: ComplaintStatus,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    pub fn new(student_id: ObjectId, category: ComplaintCategory, description: String) -> Self {
        let now = Utc::now();
        Complaint {
            id: ObjectId::new(),
            student_id,
            category,
            description,
            status: ComplaintStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Complaint joined with the submitting student's identity. `student` is
/// `None` when the student no longer exists.
#[derive(Debug, Clone)]
pub struct ComplaintView {
    pub complaint: Complaint,
    pub student: Option<StudentShort>,
}

/// Raw complaint form.
#[derive(Debug, Deserialize, Clone)]
pub struct ComplaintDraft {
    pub student_id: String,
    pub category: String,
    pub description: String,
}

impl ComplaintDraft {
    pub fn validate(&self) -> Result<Complaint, ValidationError> {
        let student_id = ObjectId::parse_str(self.student_id.trim())
            .map_err(|_| ValidationError::InvalidStudentId(self.student_id.clone()))?;
        let category = ComplaintCategory::from_str(self.category.trim())?;

        let len = self.description.chars().count();
        let mut check = FieldCheck::default();
        check.ensure(len >= DESCRIPTION_MIN, "description", "must be at least 10 characters long");
        check.ensure(len <= DESCRIPTION_MAX, "description", "cannot exceed 1000 characters");
        check.finish()?;

        Ok(Complaint::new(student_id, category, self.description.clone()))
    }
}
