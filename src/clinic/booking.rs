use chrono::{Datelike, NaiveDate, Weekday};

use super::models::{AvailabilityWindow, Doctor};
use super::validation;
use crate::error::{ClinicError, ClinicResult};

pub fn weekday_name(date: NaiveDate) -> &'static str {
    day_name(date.weekday())
}

/// Accepts `monday`, `MON`, `Monday`...
pub fn normalize_day(day: &str) -> Option<&'static str> {
    day.trim().parse::<Weekday>().ok().map(day_name)
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Normalises submitted availability and rejects malformed or overlapping
/// windows on the same day.
pub fn validate_windows(windows: Vec<AvailabilityWindow>) -> ClinicResult<Vec<AvailabilityWindow>> {
    let mut clean = Vec::with_capacity(windows.len());
    for w in windows {
        let day = normalize_day(&w.day)
            .ok_or_else(|| ClinicError::validation(format!("Unknown weekday '{}'", w.day)))?;
        let start_time = validation::slot_time("startTime", &w.start_time)?;
        let end_time = validation::slot_time("endTime", &w.end_time)?;
        if start_time >= end_time {
            return Err(ClinicError::validation(format!(
                "{day}: startTime {start_time} must be before endTime {end_time}"
            )));
        }
        clean.push(AvailabilityWindow { day: day.to_string(), start_time, end_time });
    }

    clean.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.start_time.cmp(&b.start_time)));
    for pair in clean.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.day == b.day && b.start_time < a.end_time {
            return Err(ClinicError::validation(format!(
                "{}: window {}-{} overlaps {}-{}",
                a.day, a.start_time, a.end_time, b.start_time, b.end_time
            )));
        }
    }
    Ok(clean)
}

/// Decides whether `doctor` sees patients at `date`/`time`.
///
/// `time` must already be a validated `HH:MM` string; bounds are inclusive.
pub fn check_availability(doctor: &Doctor, date: NaiveDate, time: &str) -> ClinicResult<()> {
    let day = weekday_name(date);
    let mut windows = doctor.availability.iter().filter(|w| w.day == day).peekable();

    if windows.peek().is_none() {
        return Err(ClinicError::Unavailable(day.to_string()));
    }
    if windows.any(|w| w.start_time.as_str() <= time && time <= w.end_time.as_str()) {
        Ok(())
    } else {
        Err(ClinicError::OutsideHours { day: day.to_string(), time: time.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn window(day: &str, start: &str, end: &str) -> AvailabilityWindow {
        AvailabilityWindow {
            day: day.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn doctor(windows: Vec<AvailabilityWindow>) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            name: "Dr. A".into(),
            specialization: "General".into(),
            email: None,
            phone: None,
            created_at: Utc::now(),
            availability: windows,
        }
    }

    // 2026-10-19 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn weekday_names() {
        assert_eq!(weekday_name(monday()), "Monday");
        assert_eq!(weekday_name(monday().succ_opt().unwrap()), "Tuesday");
        assert_eq!(normalize_day("mon"), Some("Monday"));
        assert_eq!(normalize_day("SUNDAY"), Some("Sunday"));
        assert_eq!(normalize_day("someday"), None);
    }

    #[test]
    fn booking_inside_window_is_accepted() {
        let d = doctor(vec![window("Monday", "09:00", "17:00")]);
        assert!(check_availability(&d, monday(), "10:00").is_ok());
        assert!(check_availability(&d, monday(), "09:00").is_ok());
        assert!(check_availability(&d, monday(), "17:00").is_ok());
    }

    #[test]
    fn booking_on_day_without_window_is_unavailable() {
        let d = doctor(vec![window("Monday", "09:00", "17:00")]);
        let tuesday = monday().succ_opt().unwrap();
        match check_availability(&d, tuesday, "10:00") {
            Err(ClinicError::Unavailable(day)) => assert_eq!(day, "Tuesday"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn booking_outside_every_window_is_rejected() {
        let d = doctor(vec![
            window("Monday", "09:00", "12:00"),
            window("Monday", "14:00", "17:00"),
        ]);
        assert!(check_availability(&d, monday(), "15:30").is_ok());
        for t in ["08:59", "12:30", "17:01", "23:00"] {
            assert!(matches!(
                check_availability(&d, monday(), t),
                Err(ClinicError::OutsideHours { .. })
            ));
        }
    }

    #[test]
    fn windows_are_normalised_and_sorted() {
        let clean = validate_windows(vec![
            window("monday", "14:00", "17:00"),
            window("Mon", "09:00", "12:00"),
        ])
        .unwrap();
        assert_eq!(clean[0], window("Monday", "09:00", "12:00"));
        assert_eq!(clean[1], window("Monday", "14:00", "17:00"));
    }

    #[test]
    fn malformed_or_overlapping_windows_are_rejected() {
        assert!(validate_windows(vec![window("Monday", "17:00", "09:00")]).is_err());
        assert!(validate_windows(vec![window("Monday", "9:00", "17:00")]).is_err());
        assert!(validate_windows(vec![window("Funday", "09:00", "17:00")]).is_err());
        assert!(validate_windows(vec![
            window("Monday", "09:00", "13:00"),
            window("Monday", "12:00", "17:00"),
        ])
        .is_err());
        assert!(validate_windows(vec![
            window("Monday", "09:00", "12:00"),
            window("Tuesday", "09:00", "12:00"),
        ])
        .is_ok());
    }
}
