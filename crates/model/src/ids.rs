use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike as _, Local, Months, NaiveDate, NaiveTime, TimeZone as _, Utc};
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Start of a local calendar day. Stored in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayId(DateTime<Utc>);

impl DayId {
    pub fn new(date_time: DateTime<Local>) -> Self {
        DayId::from_date(date_time.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let midnight = date.and_time(NaiveTime::MIN);
        let local = Local
            .from_local_datetime(&midnight)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&midnight));
        DayId(local.with_timezone(&Utc))
    }

    pub fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    pub fn id(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.local().date_naive()
    }
}

impl From<DateTime<Utc>> for DayId {
    fn from(date_time: DateTime<Utc>) -> Self {
        DayId::new(date_time.with_timezone(&Local))
    }
}

impl From<NaiveDate> for DayId {
    fn from(date: NaiveDate) -> Self {
        DayId::from_date(date)
    }
}

impl Default for DayId {
    fn default() -> Self {
        DayId::new(Local::now())
    }
}

impl fmt::Display for DayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date().format("%d.%m.%Y"))
    }
}

/// Calendar month, identified by its first day. Textual form is `YYYY-MM`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr,
)]
pub struct MonthId(NaiveDate);

impl MonthId {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(MonthId)
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthId(date.with_day(1).unwrap_or(date))
    }

    pub fn current() -> Self {
        MonthId::of(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.0
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.0)
    }

    pub fn days_count(&self) -> u32 {
        self.last_day().day()
    }

    /// Every calendar day of the month, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.0.iter_days().take(self.days_count() as usize)
    }

    /// Half-open `[start, end)` interval covering the whole month in local time.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = DayId::from_date(self.0).id();
        let end = DayId::from_date(self.next().0).id();
        (start, end)
    }

    pub fn next(&self) -> Self {
        MonthId(self.0.checked_add_months(Months::new(1)).unwrap_or(self.0))
    }
}

impl Default for MonthId {
    fn default() -> Self {
        MonthId::current()
    }
}

impl fmt::Display for MonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid month `{0}`, expected YYYY-MM")]
pub struct ParseMonthError(String);

impl FromStr for MonthId {
    type Err = ParseMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ParseMonthError(s.to_owned()))?;
        let year = year.parse().map_err(|_| ParseMonthError(s.to_owned()))?;
        let month = month.parse().map_err(|_| ParseMonthError(s.to_owned()))?;
        MonthId::new(year, month).ok_or_else(|| ParseMonthError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike as _;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_count() {
        assert_eq!(MonthId::new(2024, 4).unwrap().days_count(), 30);
        assert_eq!(MonthId::new(2024, 1).unwrap().days_count(), 31);
        assert_eq!(MonthId::new(2024, 2).unwrap().days_count(), 29);
        assert_eq!(MonthId::new(2023, 2).unwrap().days_count(), 28);
        assert_eq!(MonthId::new(2023, 12).unwrap().days_count(), 31);
    }

    #[test]
    fn test_days_are_ordered() {
        let month = MonthId::new(2024, 4).unwrap();
        let days = month.days().collect::<Vec<_>>();
        assert_eq!(days.len(), 30);
        assert_eq!(days[0], date(2024, 4, 1));
        assert_eq!(days[29], date(2024, 4, 30));
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_month_navigation() {
        let month = MonthId::new(2023, 12).unwrap();
        assert_eq!(month.next(), MonthId::new(2024, 1).unwrap());
        assert_eq!(MonthId::of(date(2024, 2, 29)), MonthId::new(2024, 2).unwrap());
    }

    #[test]
    fn test_month_parse_and_display() {
        let month: MonthId = "2024-04".parse().unwrap();
        assert_eq!(month, MonthId::new(2024, 4).unwrap());
        assert_eq!(month.to_string(), "2024-04");
        assert!("2024-13".parse::<MonthId>().is_err());
        assert!("april".parse::<MonthId>().is_err());
    }

    #[test]
    fn test_month_serde() {
        let month = MonthId::new(2024, 4).unwrap();
        let json = serde_json::to_string(&month).unwrap();
        assert_eq!(json, "\"2024-04\"");
        let back: MonthId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month);
    }

    #[test]
    fn test_day_truncation() {
        let morning = Local.with_ymd_and_hms(2024, 4, 2, 8, 15, 0).unwrap();
        let evening = Local.with_ymd_and_hms(2024, 4, 2, 23, 59, 59).unwrap();
        let day = DayId::new(morning);
        assert_eq!(day, DayId::new(evening));
        assert_eq!(day.date(), date(2024, 4, 2));
        assert_eq!(day.local().hour(), 0);
        assert_eq!(day.local().minute(), 0);
        assert_eq!(DayId::from(morning.with_timezone(&Utc)), day);
    }

    #[test]
    fn test_bounds_cover_month() {
        let month = MonthId::new(2024, 4).unwrap();
        let (start, end) = month.bounds();
        assert_eq!(start, DayId::from_date(date(2024, 4, 1)).id());
        assert_eq!(end, DayId::from_date(date(2024, 5, 1)).id());
        let last = DayId::from_date(date(2024, 4, 30)).id();
        assert!(start <= last && last < end);
    }
}
