//! Spanish holiday calendar and effective day-type resolution.
//!
//! Schedules distinguish four day types. Holidays run the sunday timetable
//! and the eve of a holiday ("víspera") runs the extended friday timetable.

use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

pub const MADRID_TZ: chrono_tz::Tz = chrono_tz::Europe::Madrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Friday,
    Saturday,
    Sunday,
}

impl DayType {
    pub fn as_str(self) -> &'static str {
        match self {
            DayType::Weekday => "weekday",
            DayType::Friday => "friday",
            DayType::Saturday => "saturday",
            DayType::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Easter Sunday via the Anonymous Gregorian algorithm.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .expect("easter computation yields a valid date")
}

/// National plus Madrid-regional holidays for one year.
pub fn spanish_holidays(year: i32) -> HashSet<NaiveDate> {
    let fixed = [
        (1, 1),   // Año Nuevo
        (1, 6),   // Reyes
        (5, 1),   // Día del Trabajador
        (5, 2),   // Comunidad de Madrid
        (5, 15),  // San Isidro
        (8, 15),  // Asunción
        (10, 12), // Fiesta Nacional
        (11, 1),  // Todos los Santos
        (11, 9),  // Almudena
        (12, 6),  // Constitución
        (12, 8),  // Inmaculada
        (12, 25), // Navidad
    ];

    let mut holidays: HashSet<NaiveDate> = fixed
        .iter()
        .filter_map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect();

    let easter = easter_sunday(year);
    holidays.insert(easter - Duration::days(3)); // Jueves Santo
    holidays.insert(easter - Duration::days(2)); // Viernes Santo

    holidays
}

pub fn is_holiday(date: NaiveDate) -> bool {
    spanish_holidays(date.year()).contains(&date)
}

/// The eve of a holiday, when extended timetables apply.
pub fn is_vispera(date: NaiveDate) -> bool {
    is_holiday(date + Duration::days(1))
}

/// Resolve the day type a date runs under. Holidays win over the weekday:
/// a Friday that is also a holiday runs the sunday timetable.
pub fn effective_day_type(date: NaiveDate) -> DayType {
    if is_holiday(date) {
        return DayType::Sunday;
    }
    match date.weekday() {
        Weekday::Sun => DayType::Sunday,
        Weekday::Sat => DayType::Saturday,
        Weekday::Fri => DayType::Friday,
        _ if is_vispera(date) => DayType::Friday,
        _ => DayType::Weekday,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn easter_2026_is_april_5() {
        assert_eq!(easter_sunday(2026), date(2026, 4, 5));
    }

    #[test]
    fn maundy_thursday_and_good_friday_are_holidays() {
        // Easter 2024 was March 31
        assert!(is_holiday(date(2024, 3, 28)));
        assert!(is_holiday(date(2024, 3, 29)));
        assert!(!is_holiday(date(2024, 3, 27)));
    }

    #[test]
    fn holiday_wins_over_friday() {
        // 2026-05-01 is a Friday and Día del Trabajador
        assert_eq!(effective_day_type(date(2026, 5, 1)), DayType::Sunday);
    }

    #[test]
    fn vispera_promotes_to_friday() {
        // 2026-01-05 is a Monday, eve of Reyes
        assert_eq!(effective_day_type(date(2026, 1, 5)), DayType::Friday);
    }

    #[test]
    fn plain_days_map_to_their_type() {
        assert_eq!(effective_day_type(date(2026, 7, 29)), DayType::Weekday); // Wed
        assert_eq!(effective_day_type(date(2026, 7, 31)), DayType::Friday);
        assert_eq!(effective_day_type(date(2026, 8, 1)), DayType::Saturday);
        assert_eq!(effective_day_type(date(2026, 8, 2)), DayType::Sunday);
    }
}
