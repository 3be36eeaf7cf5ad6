use chrono::NaiveDate;
use model::calendar::{Calendar, CalendarException, ExceptionType};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CalendarRow {
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

impl From<CalendarRow> for Calendar {
    fn from(row: CalendarRow) -> Self {
        Calendar {
            service_id: row.service_id,
            monday: row.monday,
            tuesday: row.tuesday,
            wednesday: row.wednesday,
            thursday: row.thursday,
            friday: row.friday,
            saturday: row.saturday,
            sunday: row.sunday,
            start_date: row.start_date,
            end_date: row.end_date,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CalendarExceptionRow {
    pub service_id: String,
    pub date: NaiveDate,
    pub exception_type: i16,
}

impl CalendarExceptionRow {
    pub fn into_exception(self) -> Option<CalendarException> {
        Some(CalendarException {
            service_id: self.service_id,
            date: self.date,
            exception_type: ExceptionType::from_i16(self.exception_type)?,
        })
    }
}
