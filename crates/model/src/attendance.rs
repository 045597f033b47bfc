use std::{collections::HashMap, str::FromStr};

use bson::oid::ObjectId;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::{
    errors::ValidationError,
    ids::MonthId,
    student::{StudentShort, NOT_AVAILABLE},
};

pub const UNKNOWN_STUDENT: &str = "unknown";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(ValidationError::InvalidStatus(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub student_id: ObjectId,
    /// Start of the local day the record belongs to.
    pub date: DateTime<Utc>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn day(&self) -> NaiveDate {
        self.date.with_timezone(&Local).date_naive()
    }
}

/// Outcome of a single keyed upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// One line of a marking form, as submitted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarkEntry {
    pub student_id: String,
    pub status: String,
}

impl MarkEntry {
    pub fn new(student_id: impl Into<String>, status: AttendanceStatus) -> Self {
        MarkEntry {
            student_id: student_id.into(),
            status: status.as_str().to_owned(),
        }
    }

    pub fn validate(&self) -> Result<(ObjectId, AttendanceStatus), ValidationError> {
        let id = ObjectId::parse_str(self.student_id.trim())
            .map_err(|_| ValidationError::InvalidStudentId(self.student_id.clone()))?;
        let status = AttendanceStatus::from_str(self.status.trim())?;
        Ok((id, status))
    }
}

/// Per-day cell of the monthly grid.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DayMark {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "A")]
    Absent,
    /// No record. Holidays are not distinguished.
    #[serde(rename = "-")]
    NoRecord,
}

impl DayMark {
    pub fn symbol(&self) -> char {
        match self {
            DayMark::Present => 'P',
            DayMark::Absent => 'A',
            DayMark::NoRecord => '-',
        }
    }
}

impl From<AttendanceStatus> for DayMark {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Present => DayMark::Present,
            AttendanceStatus::Absent => DayMark::Absent,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MonthlyAttendanceSummary {
    pub student_id: String,
    pub full_name: String,
    pub month: MonthId,
    pub days: Vec<DayMark>,
    pub present_days: u32,
    pub absent_days: u32,
    pub total_days: u32,
    /// Present days over calendar days, one decimal place.
    pub attendance_percentage: f64,
}

impl MonthlyAttendanceSummary {
    /// Lays `records` over every calendar day of `month`.
    ///
    /// Records outside the month are ignored. A student without an id gets a
    /// placeholder identity and an empty grid.
    pub fn build<'a>(
        month: MonthId,
        student: &StudentShort,
        records: impl IntoIterator<Item = &'a AttendanceRecord>,
    ) -> Self {
        let Some(id) = student.id else {
            return Self::placeholder(month, student.display_name());
        };

        let by_day = records
            .into_iter()
            .filter(|record| record.student_id == id)
            .map(|record| (record.day(), record.status))
            .collect::<HashMap<_, _>>();

        let mut present_days = 0;
        let mut absent_days = 0;
        let days = month
            .days()
            .map(|day| match by_day.get(&day) {
                Some(AttendanceStatus::Present) => {
                    present_days += 1;
                    DayMark::Present
                }
                Some(AttendanceStatus::Absent) => {
                    absent_days += 1;
                    DayMark::Absent
                }
                None => DayMark::NoRecord,
            })
            .collect::<Vec<_>>();
        let total_days = days.len() as u32;

        MonthlyAttendanceSummary {
            student_id: id.to_hex(),
            full_name: student.display_name().to_owned(),
            month,
            days,
            present_days,
            absent_days,
            total_days,
            attendance_percentage: percentage(present_days, total_days),
        }
    }

    pub fn placeholder(month: MonthId, full_name: &str) -> Self {
        let total_days = month.days_count();
        MonthlyAttendanceSummary {
            student_id: UNKNOWN_STUDENT.to_owned(),
            full_name: if full_name.is_empty() {
                NOT_AVAILABLE.to_owned()
            } else {
                full_name.to_owned()
            },
            month,
            days: vec![DayMark::NoRecord; total_days as usize],
            present_days: 0,
            absent_days: 0,
            total_days,
            attendance_percentage: 0.0,
        }
    }

    /// The grid as a string of `P`, `A` and `-`.
    pub fn pattern(&self) -> String {
        self.days.iter().map(DayMark::symbol).collect()
    }
}

fn percentage(present_days: u32, total_days: u32) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    (present_days as f64 * 1000.0 / total_days as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DayId;

    fn april() -> MonthId {
        MonthId::new(2024, 4).unwrap()
    }

    fn record(student: ObjectId, day: u32, status: AttendanceStatus) -> AttendanceRecord {
        let date = NaiveDate::from_ymd_opt(2024, 4, day).unwrap();
        AttendanceRecord {
            student_id: student,
            date: DayId::from_date(date).id(),
            status,
        }
    }

    fn student(id: ObjectId) -> StudentShort {
        StudentShort {
            id: Some(id),
            full_name: Some("Ravi".to_owned()),
            email: None,
        }
    }

    #[test]
    fn test_no_records() {
        let id = ObjectId::new();
        let summary =
            MonthlyAttendanceSummary::build(april(), &student(id), &[] as &[AttendanceRecord]);
        assert_eq!(summary.total_days, 30);
        assert_eq!(summary.days.len(), 30);
        assert_eq!(summary.present_days, 0);
        assert!(summary.days.iter().all(|d| *d == DayMark::NoRecord));
        assert_eq!(summary.student_id, id.to_hex());
    }

    #[test]
    fn test_present_every_day() {
        let id = ObjectId::new();
        let records = (1..=30)
            .map(|day| record(id, day, AttendanceStatus::Present))
            .collect::<Vec<_>>();
        let summary = MonthlyAttendanceSummary::build(april(), &student(id), &records);
        assert_eq!(summary.present_days, 30);
        assert_eq!(summary.pattern(), "P".repeat(30));
        assert_eq!(summary.attendance_percentage, 100.0);
    }

    #[test]
    fn test_april_example() {
        let id = ObjectId::new();
        let other = ObjectId::new();
        let records = vec![
            record(id, 1, AttendanceStatus::Present),
            record(id, 2, AttendanceStatus::Absent),
            record(other, 3, AttendanceStatus::Present),
        ];
        let summary = MonthlyAttendanceSummary::build(april(), &student(id), &records);
        assert_eq!(summary.pattern(), format!("PA{}", "-".repeat(28)));
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.absent_days, 1);
        assert_eq!(summary.total_days, 30);
        assert_eq!(summary.attendance_percentage, 3.3);
        assert_eq!(percentage(10, 30), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn test_records_outside_month_are_ignored() {
        let id = ObjectId::new();
        let march = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let records = vec![AttendanceRecord {
            student_id: id,
            date: DayId::from_date(march).id(),
            status: AttendanceStatus::Present,
        }];
        let summary = MonthlyAttendanceSummary::build(april(), &student(id), &records);
        assert_eq!(summary.present_days, 0);
    }

    #[test]
    fn test_missing_identity_is_placeholder() {
        let id = ObjectId::new();
        let records = vec![record(id, 1, AttendanceStatus::Present)];
        let summary = MonthlyAttendanceSummary::build(april(), &StudentShort::default(), &records);
        assert_eq!(summary.student_id, UNKNOWN_STUDENT);
        assert_eq!(summary.full_name, NOT_AVAILABLE);
        assert_eq!(summary.days.len(), 30);
        assert_eq!(summary.present_days, 0);
    }

    #[test]
    fn test_mark_entry_validation() {
        let id = ObjectId::new();
        let entry = MarkEntry::new(id.to_hex(), AttendanceStatus::Absent);
        assert_eq!(entry.validate().unwrap(), (id, AttendanceStatus::Absent));

        let bad_id = MarkEntry::new("42", AttendanceStatus::Present);
        assert_eq!(
            bad_id.validate().unwrap_err(),
            ValidationError::InvalidStudentId("42".to_owned())
        );

        let bad_status = MarkEntry {
            student_id: id.to_hex(),
            status: "Late".to_owned(),
        };
        assert_eq!(
            bad_status.validate().unwrap_err(),
            ValidationError::InvalidStatus("Late".to_owned())
        );
    }

    #[test]
    fn test_day_mark_serde() {
        let json = serde_json::to_string(&vec![DayMark::Present, DayMark::Absent, DayMark::NoRecord])
            .unwrap();
        assert_eq!(json, r#"["P","A","-"]"#);
    }
}
