use model::{attendance::MonthlyAttendanceSummary, decimal::Decimal, ids::MonthId};
use serde::Serialize;

use super::attendance::Attendance;

/// `present_days × rate`, saturating at the `Decimal` range.
pub fn bill(present_days: u32, rate_per_day: Decimal) -> Decimal {
    rate_per_day * present_days
}

#[derive(Clone)]
pub struct Billing {
    attendance: Attendance,
    rate: Decimal,
}

impl Billing {
    pub(crate) fn new(attendance: Attendance, rate: Decimal) -> Self {
        Billing { attendance, rate }
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn compute_bill(&self, present_days: u32) -> Decimal {
        bill(present_days, self.rate)
    }

    pub fn bill_for(&self, summary: &MonthlyAttendanceSummary) -> MonthlyBill {
        MonthlyBill {
            student_id: summary.student_id.clone(),
            full_name: summary.full_name.clone(),
            month: summary.month,
            present_days: summary.present_days,
            total_days: summary.total_days,
            rate_per_day: self.rate,
            amount: self.compute_bill(summary.present_days),
        }
    }

    pub async fn monthly_bills(&self, month: Option<MonthId>) -> Vec<MonthlyBill> {
        self.attendance
            .monthly_attendance(month)
            .await
            .iter()
            .map(|summary| self.bill_for(summary))
            .collect()
    }

    pub async fn student_bill(&self, student_id: &str, month: Option<MonthId>) -> Option<MonthlyBill> {
        self.attendance
            .student_monthly_attendance(student_id, month)
            .await
            .map(|summary| self.bill_for(&summary))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthlyBill {
    pub student_id: String,
    pub full_name: String,
    pub month: MonthId,
    pub present_days: u32,
    pub total_days: u32,
    pub rate_per_day: Decimal,
    pub amount: Decimal,
}
