//! Identifier and calendar date utilities

use bech32::Bech32m;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use uuid7::uuid7;

// construct a unique entity id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Generate an id for one of the fixed entity collections. The prefix doubles
/// as the sled key namespace, so every id must keep its collection prefix.
pub(crate) fn new_id(prefix: &str) -> String {
    let hrp = bech32::Hrp::parse(prefix).expect("failed to parse id prefix as a bech32 hrp");
    bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())
        .expect("failed to serialise uuid payload to bech32 encoding")
}

/// An instant in UTC. Used for submission/review/delivery stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// A calendar date with no time-of-day component. Expiry, issue and due dates
/// are all calendar dates; comparing two of them yields whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalDate(NaiveDate);

impl CalDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self(
            NaiveDate::from_ymd_opt(year, month, day)
                .expect("failed to construct a calendar date from year/month/day"),
        )
    }
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }
    pub fn plus_days(self, days: i64) -> Self {
        Self(self.0 + chrono::Duration::days(days))
    }
    /// Whole days from `from` until this date. Negative once the date is past.
    pub fn days_from(self, from: CalDate) -> i64 {
        (self.0 - from.0).num_days()
    }
}

impl std::fmt::Display for CalDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<NaiveDate> for CalDate {
    fn from(value: NaiveDate) -> Self {
        CalDate(value)
    }
}

impl<C> minicbor::Encode<C> for CalDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for CalDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(CalDate)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day count to a calendar date",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: TimeStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn caldate_encoding() {
        let original = CalDate::new(2026, 8, 7);

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: CalDate = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn caldate_day_arithmetic() {
        let today = CalDate::new(2026, 8, 7);
        let due = today.plus_days(30);

        assert_eq!(due, CalDate::new(2026, 9, 6));
        assert_eq!(due.days_from(today), 30);
        assert_eq!(today.days_from(due), -30);
    }
}
