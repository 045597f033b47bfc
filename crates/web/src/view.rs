use chrono::{DateTime, Utc};
use model::{
    attendance::{AttendanceRecord, AttendanceStatus, UNKNOWN_STUDENT},
    complaint::{ComplaintCategory, ComplaintStatus, ComplaintView},
    student::{StudentShort, NOT_AVAILABLE},
};
use serde::Serialize;

const DELETED_STUDENT: &str = "N/A (User Deleted)";

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: String,
    pub full_name: String,
}

impl From<&StudentShort> for RosterEntry {
    fn from(student: &StudentShort) -> Self {
        RosterEntry {
            id: student
                .id
                .map(|id| id.to_hex())
                .unwrap_or_else(|| UNKNOWN_STUDENT.to_owned()),
            full_name: student.display_name().to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DayRecordView {
    pub student_id: String,
    pub status: AttendanceStatus,
}

impl From<&AttendanceRecord> for DayRecordView {
    fn from(record: &AttendanceRecord) -> Self {
        DayRecordView {
            student_id: record.student_id.to_hex(),
            status: record.status,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ComplaintRow {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub student_email: String,
    pub category: ComplaintCategory,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ComplaintView> for ComplaintRow {
    fn from(view: ComplaintView) -> Self {
        let (student_name, student_email) = match &view.student {
            Some(student) => (
                student.display_name().to_owned(),
                student.display_email().to_owned(),
            ),
            None => (DELETED_STUDENT.to_owned(), NOT_AVAILABLE.to_owned()),
        };
        let complaint = view.complaint;
        ComplaintRow {
            id: complaint.id.to_hex(),
            student_id: complaint.student_id.to_hex(),
            student_name,
            student_email,
            category: complaint.category,
            description: complaint.description,
            status: complaint.status,
            created_at: complaint.created_at,
            updated_at: complaint.updated_at,
        }
    }
}
