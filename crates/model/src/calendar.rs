use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calendar {
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Calendar {
    pub fn runs_on(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date && self.runs_on(date.weekday())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionType {
    Added,
    Removed,
}

impl ExceptionType {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(ExceptionType::Added),
            2 => Some(ExceptionType::Removed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarException {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: ExceptionType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_respects_validity_window() {
        let calendar = Calendar {
            service_id: "S1".to_owned(),
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: false,
            sunday: false,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        };
        // 2026-07-29 is a Wednesday
        assert!(calendar.covers(NaiveDate::from_ymd_opt(2026, 7, 29).unwrap()));
        // Saturday
        assert!(!calendar.covers(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()));
        // Outside window
        assert!(!calendar.covers(NaiveDate::from_ymd_opt(2027, 1, 4).unwrap()));
    }
}
