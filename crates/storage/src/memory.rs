use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use log::info;
use model::{
    attendance::{AttendanceRecord, AttendanceStatus, UpsertOutcome},
    complaint::{Complaint, ComplaintStatus, ComplaintView},
    ids::DayId,
    student::{Student, StudentShort},
};
use parking_lot::RwLock;

use crate::{
    complaint::join_students, ComplaintQuery, RecordStore, StoreError, StudentQuery, StudentScope,
    StudentSort,
};

/// Process-local record store with the same key constraints as the MongoDB
/// one. Used for tests and for running without a database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    students: Vec<Student>,
    attendance: BTreeMap<(ObjectId, DateTime<Utc>), AttendanceStatus>,
    complaints: Vec<Complaint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Hard-deletes a student, leaving their attendance and complaints behind.
    pub fn remove_student(&self, id: ObjectId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.students.len();
        inner.students.retain(|s| s.id != id);
        before != inner.students.len()
    }

    pub fn attendance_len(&self) -> usize {
        self.inner.read().attendance.len()
    }

    fn select(&self, query: &StudentQuery) -> Vec<Student> {
        let inner = self.inner.read();
        let mut students = inner
            .students
            .iter()
            .filter(|s| matches_search(s, query.search.as_deref()))
            .cloned()
            .collect::<Vec<_>>();
        match query.sort {
            StudentSort::Newest => students.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            StudentSort::Name => students.sort_by(|a, b| a.full_name.cmp(&b.full_name)),
        }
        if let Some(limit) = query.limit {
            students.truncate(limit as usize);
        }
        students
    }
}

fn matches_search(student: &Student, search: Option<&str>) -> bool {
    let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };
    let search = search.to_lowercase();
    student
        .full_name
        .split_whitespace()
        .any(|word| word.to_lowercase().starts_with(&search))
        || student.email.to_lowercase().starts_with(&search)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_students(&self, query: &StudentQuery) -> Result<Vec<Student>, StoreError> {
        Ok(self.select(query))
    }

    async fn find_roster(&self, query: &StudentQuery) -> Result<Vec<StudentShort>, StoreError> {
        Ok(self.select(query).iter().map(StudentShort::from).collect())
    }

    async fn find_student(&self, id: ObjectId) -> Result<Option<Student>, StoreError> {
        Ok(self
            .inner
            .read()
            .students
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .inner
            .read()
            .students
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn count_students(&self, query: &StudentQuery) -> Result<u64, StoreError> {
        let query = StudentQuery {
            limit: None,
            ..query.clone()
        };
        Ok(self.select(&query).len() as u64)
    }

    async fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.students.iter().any(|s| s.email == student.email) {
            return Err(StoreError::DuplicateKey("email".to_owned()));
        }
        if inner
            .students
            .iter()
            .any(|s| s.national_id == student.national_id)
        {
            return Err(StoreError::DuplicateKey("national_id".to_owned()));
        }
        info!("Inserting student: {} <{}>", student.id, student.email);
        inner.students.push(student);
        Ok(())
    }

    async fn find_attendance(
        &self,
        scope: StudentScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.read();
        let mut records = inner
            .attendance
            .iter()
            .filter(|((student, date), _)| {
                *date >= from
                    && *date < to
                    && match scope {
                        StudentScope::All => true,
                        StudentScope::One(id) => *student == id,
                    }
            })
            .map(|((student_id, date), status)| AttendanceRecord {
                student_id: *student_id,
                date: *date,
                status: *status,
            })
            .collect::<Vec<_>>();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn upsert_attendance(
        &self,
        student_id: ObjectId,
        day: DayId,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.inner.write();
        Ok(match inner.attendance.insert((student_id, day.id()), status) {
            None => UpsertOutcome::Inserted,
            Some(old) if old == status => UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        })
    }

    async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError> {
        self.inner.write().complaints.push(complaint);
        Ok(())
    }

    async fn find_complaints(
        &self,
        query: &ComplaintQuery,
    ) -> Result<Vec<ComplaintView>, StoreError> {
        let inner = self.inner.read();
        let mut complaints = inner
            .complaints
            .iter()
            .filter(|c| query.student.map_or(true, |id| c.student_id == id))
            .filter(|c| query.status.map_or(true, |status| c.status == status))
            .cloned()
            .collect::<Vec<_>>();
        complaints.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(join_students(
            complaints,
            inner.students.iter().map(StudentShort::from),
        ))
    }

    async fn set_complaint_status(
        &self,
        id: ObjectId,
        status: ComplaintStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        match inner.complaints.iter_mut().find(|c| c.id == id) {
            Some(complaint) => {
                complaint.status = status;
                complaint.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
