use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Instant normalized to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses an RFC 3339 timestamp with any offset and converts it to UTC.
    pub fn parse_rfc3339(input: &str) -> Option<Self> {
        OffsetDateTime::parse(input.trim(), &Rfc3339)
            .ok()
            .map(Self::from_offset_datetime)
    }

    /// Parses the date forms seen in sale-history payloads.
    ///
    /// Tried in order: `MM/DD/YYYY` (optionally followed by a time part),
    /// RFC 3339, and `YYYY-MM-DD`. Dates without a time resolve to midnight UTC.
    pub fn parse_sale_date(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        parse_us_date(trimmed)
            .map(Self::from_date)
            .or_else(|| Self::parse_rfc3339(trimmed))
            .or_else(|| {
                Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
                    .ok()
                    .map(Self::from_date)
            })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn from_date(date: Date) -> Self {
        Self(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
    }

    pub fn from_unix_timestamp(seconds: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp(seconds).ok().map(Self)
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Same wall-clock moment `years` calendar years earlier; Feb 29 clamps to Feb 28.
    pub fn years_before(self, years: i32) -> Self {
        let date = self.0.date();
        let year = date.year() - years;
        let day = date.day().min(date.month().length(year));
        self.with_date(year, date.month(), day)
    }

    /// Same wall-clock moment `months` calendar months earlier, clamped to month end.
    pub fn months_before(self, months: u32) -> Self {
        let date = self.0.date();
        let zero_based = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - months as i32;
        let year = zero_based.div_euclid(12);
        let month_number = (zero_based.rem_euclid(12) + 1) as u8;
        let month = Month::try_from(month_number).unwrap_or(Month::January);
        let day = date.day().min(month.length(year));
        self.with_date(year, month, day)
    }

    fn with_date(self, year: i32, month: Month, day: u8) -> Self {
        match Date::from_calendar_date(year, month, day) {
            Ok(date) => Self(self.0.replace_date(date)),
            Err(_) => self,
        }
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }
}

fn parse_us_date(input: &str) -> Option<Date> {
    let date_part = input.split_whitespace().next()?;
    let mut parts = date_part.split('/');
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    let year = parts.next()?.parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse_rfc3339(&value)
            .ok_or_else(|| D::Error::custom(format!("timestamp must be RFC3339: '{value}'")))
    }
}
