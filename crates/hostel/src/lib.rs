use std::{sync::Arc, time::Duration};

use model::decimal::Decimal;
use service::{
    attendance::Attendance, billing::Billing, complaints::Complaints, students::Students, Store,
};
use storage::RecordStore;

pub mod service;

pub const DEFAULT_RATE_PER_DAY: i64 = 80;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HostelConfig {
    pub rate_per_day: Decimal,
    /// Upper bound for every single store call.
    pub request_timeout: Duration,
}

impl Default for HostelConfig {
    fn default() -> Self {
        HostelConfig {
            rate_per_day: Decimal::int(DEFAULT_RATE_PER_DAY),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct Hostel {
    pub students: Students,
    pub attendance: Attendance,
    pub billing: Billing,
    pub complaints: Complaints,
}

impl Hostel {
    pub fn new(store: Arc<dyn RecordStore>, config: HostelConfig) -> Self {
        let store = Store::new(store, config.request_timeout);
        let attendance = Attendance::new(store.clone());
        let billing = Billing::new(attendance.clone(), config.rate_per_day);
        Hostel {
            students: Students::new(store.clone()),
            complaints: Complaints::new(store),
            attendance,
            billing,
        }
    }
}
