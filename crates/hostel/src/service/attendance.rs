use std::collections::HashMap;

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use log::{info, warn};
use model::{
    attendance::{
        AttendanceRecord, AttendanceStatus, MarkEntry, MonthlyAttendanceSummary, UpsertOutcome,
    },
    errors::ValidationError,
    ids::{DayId, MonthId},
    student::StudentShort,
};
use serde::Serialize;
use storage::{StoreError, StudentQuery, StudentScope};

use super::{log_store_error, Store};

const DUPLICATE_MESSAGE: &str =
    "A duplicate key error occurred. This might happen with concurrent requests.";
const FAILURE_MESSAGE: &str = "An unexpected error occurred while saving attendance.";

#[derive(Clone)]
pub struct Attendance {
    store: Store,
}

impl Attendance {
    pub(crate) fn new(store: Store) -> Self {
        Attendance { store }
    }

    pub async fn monthly_attendance(&self, month: Option<MonthId>) -> Vec<MonthlyAttendanceSummary> {
        let month = month.unwrap_or_default();
        match self.try_monthly_attendance(month).await {
            Ok(summaries) => summaries,
            Err(err) => {
                log_store_error("monthly_attendance", format_args!("month={}", month), &err);
                vec![]
            }
        }
    }

    pub async fn try_monthly_attendance(
        &self,
        month: MonthId,
    ) -> Result<Vec<MonthlyAttendanceSummary>, StoreError> {
        let roster = self
            .store
            .call(self.store.find_roster(&StudentQuery::by_name()))
            .await?;
        let (from, to) = month.bounds();
        let records = self
            .store
            .call(self.store.find_attendance(StudentScope::All, from, to))
            .await?;

        let mut by_student: HashMap<ObjectId, Vec<AttendanceRecord>> = HashMap::new();
        for record in records {
            by_student.entry(record.student_id).or_default().push(record);
        }

        Ok(roster
            .iter()
            .map(|student| {
                let records = student
                    .id
                    .and_then(|id| by_student.get(&id))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                MonthlyAttendanceSummary::build(month, student, records)
            })
            .collect())
    }

    pub async fn student_monthly_attendance(
        &self,
        student_id: &str,
        month: Option<MonthId>,
    ) -> Option<MonthlyAttendanceSummary> {
        let id = ObjectId::parse_str(student_id.trim()).ok()?;
        let month = month.unwrap_or_default();
        match self.try_student_monthly_attendance(id, month).await {
            Ok(summary) => summary,
            Err(err) => {
                log_store_error(
                    "student_monthly_attendance",
                    format_args!("student={} month={}", id, month),
                    &err,
                );
                None
            }
        }
    }

    pub async fn try_student_monthly_attendance(
        &self,
        id: ObjectId,
        month: MonthId,
    ) -> Result<Option<MonthlyAttendanceSummary>, StoreError> {
        let Some(student) = self.store.call(self.store.find_student(id)).await? else {
            return Ok(None);
        };
        let (from, to) = month.bounds();
        let records = self
            .store
            .call(self.store.find_attendance(StudentScope::One(id), from, to))
            .await?;
        Ok(Some(MonthlyAttendanceSummary::build(
            month,
            &StudentShort::from(&student),
            &records,
        )))
    }

    pub async fn roster(&self) -> Vec<StudentShort> {
        match self
            .store
            .call(self.store.find_roster(&StudentQuery::by_name()))
            .await
        {
            Ok(roster) => roster,
            Err(err) => {
                log_store_error("roster", format_args!("sort=name"), &err);
                vec![]
            }
        }
    }

    pub async fn records_for_date(&self, day: DayId) -> Vec<AttendanceRecord> {
        let to = day
            .date()
            .succ_opt()
            .map(|next| DayId::from_date(next).id())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        match self
            .store
            .call(self.store.find_attendance(StudentScope::All, day.id(), to))
            .await
        {
            Ok(records) => records,
            Err(err) => {
                log_store_error("records_for_date", format_args!("date={}", day), &err);
                vec![]
            }
        }
    }

    /// Any malformed line rejects the whole batch before the first write.
    /// Valid batches are independent upserts with no rollback.
    pub async fn mark_daily(&self, date: Option<DayId>, entries: &[MarkEntry]) -> MarkOutcome {
        let (day, marks) = match validate_batch(date, entries) {
            Ok(batch) => batch,
            Err(err) => {
                warn!("rejected attendance batch: {}", err);
                return MarkOutcome::Rejected(err);
            }
        };

        info!("marking attendance for {} students on {}", marks.len(), day);
        let results = join_all(marks.iter().map(|(student_id, status)| {
            self.store
                .call(self.store.upsert_attendance(*student_id, day, *status))
        }))
        .await;

        let mut processed = 0;
        let mut unchanged = 0;
        let mut errors = vec![];
        for ((student_id, _), result) in marks.iter().zip(results) {
            match result {
                Ok(UpsertOutcome::Inserted | UpsertOutcome::Updated) => processed += 1,
                Ok(UpsertOutcome::Unchanged) => unchanged += 1,
                Err(err) => {
                    log_store_error(
                        "mark_daily",
                        format_args!("date={} student={} batch={}", day, student_id, marks.len()),
                        &err,
                    );
                    errors.push(err);
                }
            }
        }

        if errors.is_empty() {
            MarkOutcome::Saved {
                day,
                processed,
                unchanged,
            }
        } else if processed + unchanged > 0 {
            MarkOutcome::Partial {
                day,
                processed,
                unchanged,
                failed: errors.len(),
            }
        } else {
            MarkOutcome::StorageFailure {
                kind: errors[0].kind(),
                duplicate: errors.iter().any(StoreError::is_duplicate),
            }
        }
    }
}

fn validate_batch(
    date: Option<DayId>,
    entries: &[MarkEntry],
) -> Result<(DayId, Vec<(ObjectId, AttendanceStatus)>), ValidationError> {
    let day = date.ok_or(ValidationError::MissingDate)?;
    if entries.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    let marks = entries
        .iter()
        .map(MarkEntry::validate)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((day, marks))
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkOutcome {
    /// `processed` counts inserted or modified records only.
    Saved {
        day: DayId,
        processed: usize,
        unchanged: usize,
    },
    Partial {
        day: DayId,
        processed: usize,
        unchanged: usize,
        failed: usize,
    },
    Rejected(ValidationError),
    StorageFailure {
        kind: &'static str,
        duplicate: bool,
    },
}

impl MarkOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MarkOutcome::Saved { .. })
    }

    pub fn processed_count(&self) -> usize {
        match self {
            MarkOutcome::Saved { processed, .. } | MarkOutcome::Partial { processed, .. } => {
                *processed
            }
            MarkOutcome::Rejected(_) | MarkOutcome::StorageFailure { .. } => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            MarkOutcome::Saved { day, processed, .. } => format!(
                "Attendance for {} saved successfully. Processed: {} records.",
                day, processed
            ),
            MarkOutcome::Partial {
                day,
                processed,
                unchanged,
                failed,
            } => format!(
                "Some records might not have been saved for {}. Saved: {}, unchanged: {}, failed: {}.",
                day, processed, unchanged, failed
            ),
            MarkOutcome::Rejected(ValidationError::MissingDate | ValidationError::EmptyBatch) => {
                "Invalid payload: Date and records are required.".to_owned()
            }
            MarkOutcome::Rejected(err) => format!("Invalid payload: {}.", err),
            MarkOutcome::StorageFailure { duplicate, .. } => {
                if *duplicate {
                    DUPLICATE_MESSAGE.to_owned()
                } else {
                    FAILURE_MESSAGE.to_owned()
                }
            }
        }
    }

    pub fn report(&self) -> MarkReport {
        MarkReport {
            success: self.is_success(),
            message: self.message(),
            processed_count: self.processed_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MarkReport {
    pub success: bool,
    pub message: String,
    pub processed_count: usize,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use model::{
        attendance::{DayMark, UpsertOutcome},
        complaint::{Complaint, ComplaintStatus, ComplaintView},
        student::Student,
    };
    use storage::{ComplaintQuery, MemoryStore, RecordStore};

    use super::*;
    use crate::{
        testing::{hostel, student},
        Hostel, HostelConfig,
    };

    fn april() -> MonthId {
        MonthId::new(2024, 4).unwrap()
    }

    fn april_day(day: u32) -> DayId {
        DayId::from_date(NaiveDate::from_ymd_opt(2024, 4, day).unwrap())
    }

    #[tokio::test]
    async fn test_april_example() {
        let (hostel, _) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;

        let outcome = hostel
            .attendance
            .mark_daily(
                Some(april_day(1)),
                &[MarkEntry::new(asha.to_hex(), AttendanceStatus::Present)],
            )
            .await;
        assert!(outcome.is_success());
        let outcome = hostel
            .attendance
            .mark_daily(
                Some(april_day(2)),
                &[MarkEntry::new(asha.to_hex(), AttendanceStatus::Absent)],
            )
            .await;
        assert!(outcome.is_success());

        let summary = hostel
            .attendance
            .student_monthly_attendance(&asha.to_hex(), Some(april()))
            .await
            .unwrap();
        assert_eq!(summary.total_days, 30);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.days[0], DayMark::Present);
        assert_eq!(summary.days[1], DayMark::Absent);
        assert_eq!(summary.pattern(), format!("PA{}", "-".repeat(28)));
        assert_eq!(
            hostel.billing.compute_bill(summary.present_days),
            hostel.billing.rate()
        );
    }

    #[tokio::test]
    async fn test_month_without_records() {
        let (hostel, _) = hostel();
        student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        student(&hostel, "Ravi Kumar", "ravi@example.com", "222222222222").await;

        let feb = MonthId::new(2024, 2).unwrap();
        let summaries = hostel.attendance.monthly_attendance(Some(feb)).await;
        assert_eq!(summaries.len(), 2);
        for summary in summaries {
            assert_eq!(summary.days.len(), 29);
            assert!(summary.days.iter().all(|d| *d == DayMark::NoRecord));
            assert_eq!(summary.present_days, 0);
        }
    }

    #[tokio::test]
    async fn test_present_every_day() {
        let (hostel, _) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        for day in april().days() {
            let outcome = hostel
                .attendance
                .mark_daily(
                    Some(DayId::from_date(day)),
                    &[MarkEntry::new(asha.to_hex(), AttendanceStatus::Present)],
                )
                .await;
            assert!(outcome.is_success());
        }
        let summaries = hostel.attendance.monthly_attendance(Some(april())).await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].present_days, 30);
        assert!(summaries[0].days.iter().all(|d| *d == DayMark::Present));
    }

    #[tokio::test]
    async fn test_marking_twice_keeps_one_record() {
        let (hostel, store) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        let entries = [MarkEntry::new(asha.to_hex(), AttendanceStatus::Present)];
        let first = hostel.attendance.mark_daily(Some(april_day(3)), &entries).await;
        assert_eq!(first.processed_count(), 1);
        let again = hostel.attendance.mark_daily(Some(april_day(3)), &entries).await;
        assert_eq!(
            again,
            MarkOutcome::Saved {
                day: april_day(3),
                processed: 0,
                unchanged: 1,
            }
        );
        assert!(again.is_success());
        assert_eq!(again.report().processed_count, 0);
        assert_eq!(store.attendance_len(), 1);

        let records = hostel.attendance.records_for_date(april_day(3)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Present);
        assert!(hostel.attendance.records_for_date(april_day(4)).await.is_empty());

        let changed = hostel
            .attendance
            .mark_daily(
                Some(april_day(3)),
                &[MarkEntry::new(asha.to_hex(), AttendanceStatus::Absent)],
            )
            .await;
        assert_eq!(changed.processed_count(), 1);
        assert_eq!(store.attendance_len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_id_rejects_whole_batch() {
        let (hostel, store) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        let outcome = hostel
            .attendance
            .mark_daily(
                Some(april_day(1)),
                &[
                    MarkEntry::new(asha.to_hex(), AttendanceStatus::Present),
                    MarkEntry::new("not-an-id", AttendanceStatus::Absent),
                ],
            )
            .await;
        assert!(matches!(
            outcome,
            MarkOutcome::Rejected(ValidationError::InvalidStudentId(_))
        ));
        assert!(!outcome.report().success);
        assert_eq!(store.attendance_len(), 0);
    }

    #[tokio::test]
    async fn test_batch_validation() {
        let (hostel, store) = hostel();
        let id = ObjectId::new().to_hex();

        let outcome = hostel
            .attendance
            .mark_daily(None, &[MarkEntry::new(id.clone(), AttendanceStatus::Present)])
            .await;
        assert_eq!(outcome, MarkOutcome::Rejected(ValidationError::MissingDate));
        assert_eq!(
            outcome.message(),
            "Invalid payload: Date and records are required."
        );

        let outcome = hostel.attendance.mark_daily(Some(april_day(1)), &[]).await;
        assert_eq!(outcome, MarkOutcome::Rejected(ValidationError::EmptyBatch));

        let late = MarkEntry {
            student_id: id,
            status: "Late".to_owned(),
        };
        let outcome = hostel.attendance.mark_daily(Some(april_day(1)), &[late]).await;
        assert!(matches!(
            outcome,
            MarkOutcome::Rejected(ValidationError::InvalidStatus(_))
        ));
        assert_eq!(store.attendance_len(), 0);
    }

    #[tokio::test]
    async fn test_removed_student_drops_out_of_reports() {
        let (hostel, store) = hostel();
        let asha = student(&hostel, "Asha Rao", "asha@example.com", "111111111111").await;
        hostel
            .attendance
            .mark_daily(
                Some(april_day(5)),
                &[MarkEntry::new(asha.to_hex(), AttendanceStatus::Present)],
            )
            .await;
        assert!(store.remove_student(asha));

        assert!(hostel
            .attendance
            .student_monthly_attendance(&asha.to_hex(), Some(april()))
            .await
            .is_none());
        assert!(hostel
            .attendance
            .student_monthly_attendance("garbage", Some(april()))
            .await
            .is_none());
        assert!(hostel.attendance.monthly_attendance(Some(april())).await.is_empty());
    }

    struct FlakyStore {
        inner: MemoryStore,
        broken: ObjectId,
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        async fn find_students(&self, query: &StudentQuery) -> Result<Vec<Student>, StoreError> {
            self.inner.find_students(query).await
        }

        async fn find_roster(
            &self,
            query: &StudentQuery,
        ) -> Result<Vec<StudentShort>, StoreError> {
            Err(StoreError::Unavailable(format!("roster {:?}", query.sort)))
        }

        async fn find_student(&self, id: ObjectId) -> Result<Option<Student>, StoreError> {
            self.inner.find_student(id).await
        }

        async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
            self.inner.find_student_by_email(email).await
        }

        async fn count_students(&self, query: &StudentQuery) -> Result<u64, StoreError> {
            self.inner.count_students(query).await
        }

        async fn insert_student(&self, student: Student) -> Result<(), StoreError> {
            self.inner.insert_student(student).await
        }

        async fn find_attendance(
            &self,
            scope: StudentScope,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            self.inner.find_attendance(scope, from, to).await
        }

        async fn upsert_attendance(
            &self,
            student_id: ObjectId,
            day: DayId,
            status: AttendanceStatus,
        ) -> Result<UpsertOutcome, StoreError> {
            if student_id == self.broken {
                return Err(StoreError::DuplicateKey("student_id_date".to_owned()));
            }
            self.inner.upsert_attendance(student_id, day, status).await
        }

        async fn insert_complaint(&self, complaint: Complaint) -> Result<(), StoreError> {
            self.inner.insert_complaint(complaint).await
        }

        async fn find_complaints(
            &self,
            query: &ComplaintQuery,
        ) -> Result<Vec<ComplaintView>, StoreError> {
            self.inner.find_complaints(query).await
        }

        async fn set_complaint_status(
            &self,
            id: ObjectId,
            status: ComplaintStatus,
        ) -> Result<bool, StoreError> {
            self.inner.set_complaint_status(id, status).await
        }
    }

    fn flaky() -> (Hostel, MemoryStore, ObjectId) {
        let inner = MemoryStore::new();
        let broken = ObjectId::new();
        let store = FlakyStore {
            inner: inner.clone(),
            broken,
        };
        (
            Hostel::new(Arc::new(store), HostelConfig::default()),
            inner,
            broken,
        )
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let (hostel, inner, broken) = flaky();
        let ok = ObjectId::new();
        let outcome = hostel
            .attendance
            .mark_daily(
                Some(april_day(1)),
                &[
                    MarkEntry::new(ok.to_hex(), AttendanceStatus::Present),
                    MarkEntry::new(broken.to_hex(), AttendanceStatus::Absent),
                ],
            )
            .await;
        assert_eq!(
            outcome,
            MarkOutcome::Partial {
                day: april_day(1),
                processed: 1,
                unchanged: 0,
                failed: 1,
            }
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.report().processed_count, 1);
        assert_eq!(inner.attendance_len(), 1);

        let outcome = hostel
            .attendance
            .mark_daily(
                Some(april_day(2)),
                &[MarkEntry::new(broken.to_hex(), AttendanceStatus::Absent)],
            )
            .await;
        assert_eq!(
            outcome,
            MarkOutcome::StorageFailure {
                kind: "duplicate_key",
                duplicate: true,
            }
        );
        assert_eq!(outcome.message(), DUPLICATE_MESSAGE);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let (hostel, _, _) = flaky();
        assert!(hostel.attendance.monthly_attendance(Some(april())).await.is_empty());
        assert!(hostel.attendance.roster().await.is_empty());
        assert!(hostel
            .attendance
            .try_monthly_attendance(april())
            .await
            .is_err());
    }
}
