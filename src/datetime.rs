// Date and time handling for expression values
// Parsing, formatting and relative-delta calendar arithmetic

use std::fmt;

use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike,
};
use thiserror::Error;

/// DateTime errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateTimeError {
    #[error("Invalid isoformat string: '{0}'")]
    ParseError(String),

    #[error("{0}")]
    OutOfRange(String),
}

const MIN_YEAR: i64 = 1;
const MAX_YEAR: i64 = 9999;

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`)
pub fn parse_date(s: &str) -> Result<NaiveDate, DateTimeError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| DateTimeError::ParseError(s.to_string()))
}

/// Parse an ISO 8601 datetime
///
/// Accepts `T` or a space as separator, optional fractional seconds and an
/// optional UTC offset. Values without an offset are taken as UTC; a bare
/// date means midnight UTC.
pub fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, DateTimeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Ok(date) = parse_date(s) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }
    Err(DateTimeError::ParseError(s.to_string()))
}

fn check_year(year: i64) -> Result<i32, DateTimeError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(DateTimeError::OutOfRange(format!(
            "year {} is out of range",
            year
        )));
    }
    // Range checked above
    Ok(year as i32)
}

fn to_u32(value: i64, what: &str) -> Result<u32, DateTimeError> {
    u32::try_from(value).map_err(|_| DateTimeError::OutOfRange(format!("{} must be in range", what)))
}

/// Build a calendar date from its parts.
pub fn make_date(year: i64, month: i64, day: i64) -> Result<NaiveDate, DateTimeError> {
    let year = check_year(year)?;
    let month = to_u32(month, "month")?;
    if !(1..=12).contains(&month) {
        return Err(DateTimeError::OutOfRange(
            "month must be in 1..12".to_string(),
        ));
    }
    NaiveDate::from_ymd_opt(year, month, to_u32(day, "day")?).ok_or_else(|| {
        DateTimeError::OutOfRange("day is out of range for month".to_string())
    })
}

/// Date and time components for [`make_datetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeParts {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
    pub microsecond: i64,
    /// Offset from UTC in whole hours
    pub utc_offset: i64,
}

impl Default for DateTimeParts {
    fn default() -> Self {
        DateTimeParts {
            year: 0,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            microsecond: 0,
            utc_offset: 0,
        }
    }
}

/// Build a datetime with a fixed UTC offset from its parts.
pub fn make_datetime(parts: &DateTimeParts) -> Result<DateTime<FixedOffset>, DateTimeError> {
    let date = make_date(parts.year, parts.month, parts.day)?;
    let time = NaiveTime::from_hms_micro_opt(
        to_u32(parts.hour, "hour")?,
        to_u32(parts.minute, "minute")?,
        to_u32(parts.second, "second")?,
        to_u32(parts.microsecond, "microsecond")?,
    )
    .ok_or_else(|| DateTimeError::OutOfRange("time component out of range".to_string()))?;

    let offset = parts
        .utc_offset
        .checked_mul(3600)
        .and_then(|secs| i32::try_from(secs).ok())
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            DateTimeError::OutOfRange(
                "utc_offset must be strictly between -24 and 24 hours".to_string(),
            )
        })?;

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| DateTimeError::OutOfRange("ambiguous local time".to_string()))
}

/// Format a datetime as ISO 8601 with the given date/time separator.
///
/// Microseconds are only shown when non-zero.
pub fn format_datetime(dt: &DateTime<FixedOffset>, separator: char) -> String {
    let mut result = dt.format("%Y-%m-%d").to_string();
    result.push(separator);
    result.push_str(&dt.format("%H:%M:%S").to_string());
    let micros = dt.nanosecond() / 1_000;
    if micros != 0 {
        result.push_str(&format!(".{:06}", micros));
    }
    result.push_str(&dt.format("%:z").to_string());
    result
}

/// A calendar-aware offset
///
/// Years and months shift the calendar position (clamping the day to the end
/// of the target month); the remaining fields are an exact duration.
/// Construction normalizes overflowing fields into the next larger unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelativeDelta {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub microseconds: i64,
}

impl RelativeDelta {
    pub fn years(n: i64) -> Self {
        RelativeDelta { years: n, ..Default::default() }.normalized()
    }

    pub fn months(n: i64) -> Self {
        RelativeDelta { months: n, ..Default::default() }.normalized()
    }

    pub fn weeks(n: i64) -> Self {
        Self::days(n.saturating_mul(7))
    }

    pub fn days(n: i64) -> Self {
        RelativeDelta { days: n, ..Default::default() }
    }

    pub fn hours(n: i64) -> Self {
        RelativeDelta { hours: n, ..Default::default() }.normalized()
    }

    pub fn minutes(n: i64) -> Self {
        RelativeDelta { minutes: n, ..Default::default() }.normalized()
    }

    pub fn seconds(n: i64) -> Self {
        RelativeDelta { seconds: n, ..Default::default() }.normalized()
    }

    pub fn microseconds(n: i64) -> Self {
        RelativeDelta { microseconds: n, ..Default::default() }.normalized()
    }

    /// Exact difference between two instants, expressed in days and below.
    pub fn from_duration(duration: Duration) -> Self {
        let days = duration.num_days();
        let rest = duration - Duration::days(days);
        let seconds = rest.num_seconds();
        let micros = (rest - Duration::seconds(seconds))
            .num_microseconds()
            .unwrap_or(0);
        RelativeDelta {
            days,
            seconds,
            microseconds: micros,
            ..Default::default()
        }
        .normalized()
    }

    /// Carry overflowing fields into the next larger unit, keeping signs.
    pub fn normalized(mut self) -> Self {
        carry(&mut self.microseconds, &mut self.seconds, 1_000_000);
        carry(&mut self.seconds, &mut self.minutes, 60);
        carry(&mut self.minutes, &mut self.hours, 60);
        carry(&mut self.hours, &mut self.days, 24);
        carry(&mut self.months, &mut self.years, 12);
        self
    }

    pub fn is_zero(&self) -> bool {
        *self == RelativeDelta::default()
    }

    /// Whether applying this delta to a date needs a time of day.
    pub fn has_time(&self) -> bool {
        self.hours != 0 || self.minutes != 0 || self.seconds != 0 || self.microseconds != 0
    }

    pub fn plus(&self, other: &RelativeDelta) -> Self {
        RelativeDelta {
            years: self.years.saturating_add(other.years),
            months: self.months.saturating_add(other.months),
            days: self.days.saturating_add(other.days),
            hours: self.hours.saturating_add(other.hours),
            minutes: self.minutes.saturating_add(other.minutes),
            seconds: self.seconds.saturating_add(other.seconds),
            microseconds: self.microseconds.saturating_add(other.microseconds),
        }
        .normalized()
    }

    pub fn negated(&self) -> Self {
        self.scaled(-1)
    }

    pub fn scaled(&self, factor: i64) -> Self {
        RelativeDelta {
            years: self.years.saturating_mul(factor),
            months: self.months.saturating_mul(factor),
            days: self.days.saturating_mul(factor),
            hours: self.hours.saturating_mul(factor),
            minutes: self.minutes.saturating_mul(factor),
            seconds: self.seconds.saturating_mul(factor),
            microseconds: self.microseconds.saturating_mul(factor),
        }
        .normalized()
    }

    fn total_months(&self) -> i64 {
        self.years.saturating_mul(12).saturating_add(self.months)
    }

    fn exact_duration(&self) -> Option<Duration> {
        Duration::try_days(self.days)?
            .checked_add(&Duration::try_hours(self.hours)?)?
            .checked_add(&Duration::try_minutes(self.minutes)?)?
            .checked_add(&Duration::try_seconds(self.seconds)?)?
            .checked_add(&Duration::microseconds(self.microseconds))
    }

    /// Apply to a calendar date. Time fields are ignored; callers promote
    /// the date to a datetime first when [`has_time`](Self::has_time) is set.
    pub fn apply_to_date(&self, date: NaiveDate) -> Result<NaiveDate, DateTimeError> {
        shift_months(date, self.total_months(), NaiveDate::checked_add_months, NaiveDate::checked_sub_months)
            .and_then(|d| d.checked_add_signed(Duration::try_days(self.days)?))
            .ok_or_else(overflow)
    }

    pub fn apply_to_datetime(
        &self,
        dt: DateTime<FixedOffset>,
    ) -> Result<DateTime<FixedOffset>, DateTimeError> {
        let duration = self.exact_duration().ok_or_else(overflow)?;
        shift_months(
            dt,
            self.total_months(),
            DateTime::checked_add_months,
            DateTime::checked_sub_months,
        )
        .and_then(|d| d.checked_add_signed(duration))
        .ok_or_else(overflow)
    }
}

fn overflow() -> DateTimeError {
    DateTimeError::OutOfRange("date value out of range".to_string())
}

fn shift_months<T>(
    value: T,
    months: i64,
    add: fn(T, Months) -> Option<T>,
    sub: fn(T, Months) -> Option<T>,
) -> Option<T> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        add(value, Months::new(magnitude))
    } else {
        sub(value, Months::new(magnitude))
    }
}

/// Truncating `/` and `%` keep the sign of `value`, so no magnitude is taken.
fn carry(value: &mut i64, next: &mut i64, limit: i64) {
    *next = next.saturating_add(*value / limit);
    *value %= limit;
}

impl fmt::Display for RelativeDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("years", self.years),
            ("months", self.months),
            ("days", self.days),
            ("hours", self.hours),
            ("minutes", self.minutes),
            ("seconds", self.seconds),
            ("microseconds", self.microseconds),
        ];
        write!(f, "relativedelta(")?;
        let mut first = true;
        for (name, value) in fields.iter().filter(|(_, v)| *v != 0) {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={:+}", name, value)?;
            first = false;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Utc};

    #[test]
    fn test_parse_date() {
        let date = parse_date("1970-01-01").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (1970, 1, 1));
        assert!(parse_date("1970-13-01").is_err());
        assert!(parse_date("not a date").is_err());
    }

    #[test]
    fn test_parse_datetime_variants() {
        let expected = make_datetime(&DateTimeParts {
            year: 1970,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(parse_datetime("1970-01-01T00:00:00.000+00:00").unwrap(), expected);
        assert_eq!(parse_datetime("1970-01-01 00:00:00").unwrap(), expected);
        assert_eq!(parse_datetime("1970-01-01").unwrap(), expected);

        let shifted = parse_datetime("1970-01-01T02:00:00+02:00").unwrap();
        assert_eq!(shifted, expected);
        assert_eq!(shifted.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_make_datetime_rejects_year_zero() {
        let err = make_datetime(&DateTimeParts::default()).unwrap_err();
        assert_eq!(err, DateTimeError::OutOfRange("year 0 is out of range".to_string()));
        assert!(make_date(2021, 2, 29).is_err());
        assert!(make_datetime(&DateTimeParts {
            year: 2000,
            utc_offset: 24,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_format_datetime() {
        let dt = make_datetime(&DateTimeParts {
            year: 2020,
            month: 5,
            day: 17,
            hour: 8,
            minute: 30,
            second: 5,
            microsecond: 250,
            utc_offset: -5,
        })
        .unwrap();
        assert_eq!(format_datetime(&dt, 'T'), "2020-05-17T08:30:05.000250-05:00");
        assert_eq!(format_datetime(&dt, ' '), "2020-05-17 08:30:05.000250-05:00");
    }

    #[test]
    fn test_delta_normalization() {
        assert_eq!(RelativeDelta::months(14), RelativeDelta { years: 1, months: 2, ..Default::default() });
        assert_eq!(RelativeDelta::weeks(10), RelativeDelta::days(70));
        assert_eq!(
            RelativeDelta::seconds(-3661),
            RelativeDelta { hours: -1, minutes: -1, seconds: -1, ..Default::default() }
        );
        assert!(RelativeDelta::days(0).is_zero());
    }

    #[test]
    fn test_delta_display() {
        assert_eq!(RelativeDelta::days(10).to_string(), "relativedelta(days=+10)");
        assert_eq!(
            RelativeDelta::years(1).plus(&RelativeDelta::hours(-2)).to_string(),
            "relativedelta(years=+1, hours=-2)"
        );
        assert_eq!(RelativeDelta::default().to_string(), "relativedelta()");
    }

    #[test]
    fn test_month_arithmetic_clamps_day() {
        let jan31 = make_date(2021, 1, 31).unwrap();
        let feb = RelativeDelta::months(1).apply_to_date(jan31).unwrap();
        assert_eq!(feb, make_date(2021, 2, 28).unwrap());

        let back = RelativeDelta::months(-1).apply_to_date(feb).unwrap();
        assert_eq!(back, make_date(2021, 1, 28).unwrap());
    }

    #[test]
    fn test_apply_to_datetime() {
        let start = Utc::now().fixed_offset();
        let later = RelativeDelta::hours(25).apply_to_datetime(start).unwrap();
        assert_eq!((later - start).num_hours(), 25);
    }

    #[test]
    fn test_from_duration() {
        let delta = RelativeDelta::from_duration(Duration::hours(26) + Duration::microseconds(5));
        assert_eq!(
            delta,
            RelativeDelta { days: 1, hours: 2, microseconds: 5, ..Default::default() }
        );
    }

    #[test]
    fn test_normalization_at_integer_extremes() {
        let delta = RelativeDelta::hours(i64::MIN);
        assert_eq!(
            delta,
            RelativeDelta { days: i64::MIN / 24, hours: -8, ..Default::default() }
        );
        assert_eq!(delta.negated().hours, 8);

        let delta = RelativeDelta::microseconds(i64::MIN).plus(&RelativeDelta::microseconds(i64::MIN));
        assert!(delta.microseconds <= 0 && delta.microseconds > -1_000_000);
        assert!(delta.seconds < 0);

        let delta = RelativeDelta::minutes(i64::MAX);
        assert_eq!(delta.minutes, i64::MAX % 60);
        assert!(delta.days > 0);
    }
}
