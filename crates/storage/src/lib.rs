pub mod attendance;
pub mod complaint;
pub mod error;
pub mod memory;
pub mod session;
pub mod student;

use async_trait::async_trait;
use attendance::AttendanceStore;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use complaint::ComplaintStore;
use eyre::Result;
use model::{
    attendance::{AttendanceRecord, AttendanceStatus, UpsertOutcome},
    complaint::{Complaint, ComplaintStatus, ComplaintView},
    ids::DayId,
    student::{Student, StudentShort},
};
use session::Db;
use student::StudentStore;

pub use error::StoreError;
pub use memory::MemoryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StudentSort {
    /// Most recently registered first.
    #[default]
    Newest,
    Name,
}

#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
    /// Case-insensitive prefix of a name word or of the email.
    pub search: Option<String>,
    pub sort: StudentSort,
    pub limit: Option<u64>,
}

impl StudentQuery {
    pub fn all() -> Self {
        StudentQuery::default()
    }

    pub fn by_name() -> Self {
        StudentQuery {
            sort: StudentSort::Name,
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit.filter(|l| *l > 0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentScope {
    All,
    One(ObjectId),
}

/// Complaint filter. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct ComplaintQuery {
    pub student: Option<ObjectId>,
    pub status: Option<ComplaintStatus>,
}

/// Persistence boundary for students, attendance and complaints.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_students(&self, query: &StudentQuery) -> Result<Vec<Student>, StoreError>;

    /// Id, name and email only. Malformed rows come back with empty fields
    /// instead of failing the whole read.
    async fn find_roster(&self, query: &StudentQuery) -> Result<Vec<StudentShort>, StoreError>;

    async fn find_student(&self, id: ObjectId) -> Result<Option<Student>, StoreError>;

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError>;

    async fn count_students(&self, query: &StudentQuery) -> Result<u64, StoreError>;

    /// Fails with `DuplicateKey` when the email or national id is taken.
    async fn insert_student(&self, student: Student) -> Result<(), StoreError>;

    /// Records with `from <= date < to`.
    async fn find_attendance(
        &self,
        scope: StudentScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn upsert_attendance(
        &self,
        student_id: ObjectId,
        day: DayId,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError>;

    async fn find_complaints(&self, query: &ComplaintQuery)
        -> Result<Vec<ComplaintView>, StoreError>;

    /// Returns `false` when no complaint has that id.
    async fn set_complaint_status(
        &self,
        id: ObjectId,
        status: ComplaintStatus,
    ) -> Result<bool, StoreError>;
}

/// MongoDB-backed record store.
#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub students: StudentStore,
    pub attendance: AttendanceStore,
    pub complaints: ComplaintStore,
}

impl Storage {
    /// Builds the store without touching the network. The connection is
    /// opened by the first call that needs it.
    pub fn new(uri: &str, db_name: &str) -> Self {
        let db = Db::new(uri, db_name);
        Storage {
            students: StudentStore::new(db.clone()),
            attendance: AttendanceStore::new(db.clone()),
            complaints: ComplaintStore::new(db.clone()),
            db,
        }
    }

    /// Opens the connection eagerly.
    pub async fn connect(&self) -> Result<()> {
        self.db.get().await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for Storage {
    async fn find_students(&self, query: &StudentQuery) -> Result<Vec<Student>, StoreError> {
        self.students.find(query).await
    }

    async fn find_roster(&self, query: &StudentQuery) -> Result<Vec<StudentShort>, StoreError> {
        self.students.roster(query).await
    }

    async fn find_student(&self, id: ObjectId) -> Result<Option<Student>, StoreError> {
        self.students.get(id).await
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        self.students.get_by_email(email).await
    }

    async fn count_students(&self, query: &StudentQuery) -> Result<u64, StoreError> {
        self.students.count(query).await
    }

    async fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        self.students.insert(student).await
    }

    async fn find_attendance(
        &self,
        scope: StudentScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.attendance.find(scope, from, to).await
    }

    async fn upsert_attendance(
        &self,
        student_id: ObjectId,
        day: DayId,
        status: AttendanceStatus,
    ) -> Result<UpsertOutcome, StoreError> {
        self.attendance.upsert(student_id, day, status).await
    }

    async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError> {
        self.complaints.insert(complaint).await
    }

    async fn find_complaints(
        &self,
        query: &ComplaintQuery,
    ) -> Result<Vec<ComplaintView>, StoreError> {
        let complaints = self.complaints.find(query).await?;
        let mut ids = complaints.iter().map(|c| c.student_id).collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        let students = self.students.shorts_by_ids(&ids).await?;
        Ok(complaint::join_students(complaints, students))
    }

    async fn set_complaint_status(
        &self,
        id: ObjectId,
        status: ComplaintStatus,
    ) -> Result<bool, StoreError> {
        self.complaints.set_status(id, status).await
    }
}
