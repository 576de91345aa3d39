//! The time family: UTCTime, GeneralizedTime, DATE, TIME-OF-DAY,
//! DATE-TIME and the general TIME type.
//!
//! All members are fixed-width ASCII layouts on the wire. The encoders
//! always emit the canonical form (UTC, trailing `Z`, no redundant
//! fraction digits); the decoders additionally accept the laxer BER
//! shapes (missing seconds, numeric offsets).

use core::fmt;

use chrono::{
    DateTime as ChronoDateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc,
};
use nom::error::{Error as NomError, ErrorKind};
use nom::{IResult, Parser, bytes::complete::take, combinator::opt};

use crate::constraint::Constraint;
use crate::constraint::temporal::Timestamped;
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::{TAG_DATE, TAG_DATE_TIME, TAG_GENERALIZED_TIME, TAG_TIME, TAG_TIME_OF_DAY, TAG_UTC_TIME};
use crate::types::{AsnType, constrained};

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

fn digits(input: &[u8], count: usize) -> IResult<&[u8], u32> {
    let (rest, raw) = take(count).parse(input)?;
    if !raw.iter().all(u8::is_ascii_digit) {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Digit)));
    }
    Ok((rest, raw.iter().fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))))
}

fn byte(input: &[u8], expected: u8) -> IResult<&[u8], ()> {
    match input.first() {
        Some(b) if *b == expected => Ok((&input[1..], ())),
        _ => Err(nom::Err::Error(NomError::new(input, ErrorKind::Char))),
    }
}

/// `Z`, `±HHMM`, or nothing; seconds east of UTC.
fn zone(input: &[u8]) -> IResult<&[u8], Option<i32>> {
    match input.first() {
        Some(b'Z') => Ok((&input[1..], Some(0))),
        Some(sign @ (b'+' | b'-')) => {
            let negative = *sign == b'-';
            let (rest, hh) = digits(&input[1..], 2)?;
            let (rest, mm) = digits(rest, 2)?;
            let secs = (hh * 3600 + mm * 60) as i32;
            Ok((rest, Some(if negative { -secs } else { secs })))
        }
        _ => Ok((input, None)),
    }
}

/// `.ddd` or `,ddd` as nanoseconds; at most nine digits.
fn fraction(input: &[u8]) -> IResult<&[u8], Option<u32>> {
    match input.first() {
        Some(b'.' | b',') => {
            let rest = &input[1..];
            let len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            if len == 0 || len > 9 {
                return Err(nom::Err::Error(NomError::new(input, ErrorKind::Digit)));
            }
            let mut nanos: u32 = 0;
            for b in &rest[..len] {
                nanos = nanos * 10 + u32::from(b - b'0');
            }
            nanos *= 10u32.pow(9 - len as u32);
            Ok((&rest[len..], Some(nanos)))
        }
        _ => Ok((input, None)),
    }
}

fn ascii<'a>(type_name: &'static str, content: &'a [u8]) -> Result<&'a str> {
    core::str::from_utf8(content)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or_else(|| Error::invalid_content(type_name, "content is not ASCII"))
}

fn temporal_err(type_name: &'static str, text: &str) -> Error {
    Error::InvalidTemporal(format!("{type_name} {text:?}"))
}

fn build_date(type_name: &'static str, text: &str, y: i32, mo: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, mo, d).ok_or_else(|| temporal_err(type_name, text))
}

fn build_time(type_name: &'static str, text: &str, h: u32, mi: u32, s: u32, nanos: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_nano_opt(h, mi, s, nanos).ok_or_else(|| temporal_err(type_name, text))
}

fn with_offset(
    type_name: &'static str,
    text: &str,
    local: NaiveDateTime,
    offset_secs: i32,
) -> Result<ChronoDateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| temporal_err(type_name, text))?;
    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| temporal_err(type_name, text))
}

/// Canonical fraction suffix: up to nine digits, trailing zeros trimmed.
fn push_fraction(out: &mut String, nanos: u32) {
    if nanos == 0 {
        return;
    }
    let digits = format!("{nanos:09}");
    let trimmed = digits.trim_end_matches('0');
    out.push('.');
    out.push_str(trimmed);
}

// ---------------------------------------------------------------------------
// UTCTime
// ---------------------------------------------------------------------------

/// UTCTime: `YYMMDDHHMM[SS](Z|±HHMM)`, two-digit years pivoting at 50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTime(pub ChronoDateTime<FixedOffset>);

impl UtcTime {
    pub fn new(value: ChronoDateTime<FixedOffset>, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: ChronoDateTime<FixedOffset>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("UTCTime construction failed: {e}"))
    }

    pub fn value(&self) -> ChronoDateTime<FixedOffset> {
        self.0
    }

    fn canonical(&self) -> String {
        let utc = self.0.with_timezone(&Utc);
        format!(
            "{:02}{:02}{:02}{:02}{:02}{:02}Z",
            utc.year().rem_euclid(100),
            utc.month(),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second()
        )
    }
}

impl Default for UtcTime {
    fn default() -> Self {
        Self(Utc.timestamp_opt(0, 0).unwrap().fixed_offset())
    }
}

impl AsnType for UtcTime {
    const TAG: u32 = TAG_UTC_TIME;
    const NAME: &'static str = "UTCTime";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.canonical().into_bytes())
    }

    fn decode_verify(content: &[u8], rule: EncodingRule) -> Result<()> {
        if rule.is_canonical() && (content.len() != 13 || content.last() != Some(&b'Z')) {
            return Err(Error::invalid_content(
                Self::NAME,
                "CER/DER require the YYMMDDHHMMSSZ form",
            ));
        }
        Ok(())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let text = ascii(Self::NAME, content)?;
        let parsed = (|| {
            let input = content;
            let (input, yy) = digits(input, 2)?;
            let (input, mo) = digits(input, 2)?;
            let (input, dd) = digits(input, 2)?;
            let (input, hh) = digits(input, 2)?;
            let (input, mi) = digits(input, 2)?;
            let (input, ss) = opt(|i| digits(i, 2)).parse(input)?;
            let (input, z) = zone(input)?;
            Ok((input, (yy, mo, dd, hh, mi, ss, z)))
        })()
        .map_err(|_: nom::Err<NomError<&[u8]>>| temporal_err(Self::NAME, text))?;
        let (rest, (yy, mo, dd, hh, mi, ss, z)) = parsed;
        let z = z.ok_or_else(|| temporal_err(Self::NAME, text))?;
        if !rest.is_empty() {
            return Err(temporal_err(Self::NAME, text));
        }
        let year = (if yy < 50 { 2000 + yy } else { 1900 + yy }) as i32;
        let date = build_date(Self::NAME, text, year, mo, dd)?;
        let time = build_time(Self::NAME, text, hh, mi, ss.unwrap_or(0), 0)?;
        Ok(Self(with_offset(Self::NAME, text, date.and_time(time), z)?))
    }
}

impl TryFrom<&str> for UtcTime {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::decode_value(s.as_bytes(), EncodingRule::Ber)
    }
}

impl Timestamped for UtcTime {
    fn timestamp_utc(&self) -> ChronoDateTime<Utc> {
        self.0.with_timezone(&Utc)
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// ---------------------------------------------------------------------------
// GeneralizedTime
// ---------------------------------------------------------------------------

/// GeneralizedTime: `YYYYMMDDHHMMSS[.f](Z|±HHMM|local)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeneralizedTime(pub ChronoDateTime<FixedOffset>);

impl GeneralizedTime {
    pub fn new(value: ChronoDateTime<FixedOffset>, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: ChronoDateTime<FixedOffset>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints)
            .unwrap_or_else(|e| panic!("GeneralizedTime construction failed: {e}"))
    }

    pub fn value(&self) -> ChronoDateTime<FixedOffset> {
        self.0
    }

    fn canonical(&self) -> String {
        let utc = self.0.with_timezone(&Utc);
        let mut out = format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            utc.year(),
            utc.month(),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second()
        );
        push_fraction(&mut out, utc.nanosecond() % 1_000_000_000);
        out.push('Z');
        out
    }
}

impl Default for GeneralizedTime {
    fn default() -> Self {
        Self(Utc.timestamp_opt(0, 0).unwrap().fixed_offset())
    }
}

impl AsnType for GeneralizedTime {
    const TAG: u32 = TAG_GENERALIZED_TIME;
    const NAME: &'static str = "GeneralizedTime";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.canonical().into_bytes())
    }

    fn decode_verify(content: &[u8], rule: EncodingRule) -> Result<()> {
        if !rule.is_canonical() {
            return Ok(());
        }
        if content.last() != Some(&b'Z') {
            return Err(Error::invalid_content(Self::NAME, "CER/DER require UTC with a trailing Z"));
        }
        if content.contains(&b',') {
            return Err(Error::invalid_content(Self::NAME, "CER/DER require a dot fraction separator"));
        }
        if let Some(dot) = content.iter().position(|b| *b == b'.') {
            let frac = &content[dot + 1..content.len() - 1];
            if frac.is_empty() || frac.last() == Some(&b'0') {
                return Err(Error::invalid_content(
                    Self::NAME,
                    "fraction must be non-empty without trailing zeros",
                ));
            }
        }
        Ok(())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let text = ascii(Self::NAME, content)?;
        let parsed = (|| {
            let input = content;
            let (input, year) = digits(input, 4)?;
            let (input, mo) = digits(input, 2)?;
            let (input, dd) = digits(input, 2)?;
            let (input, hh) = digits(input, 2)?;
            let (input, mi) = digits(input, 2)?;
            let (input, ss) = digits(input, 2)?;
            let (input, nanos) = fraction(input)?;
            let (input, z) = zone(input)?;
            Ok((input, (year, mo, dd, hh, mi, ss, nanos, z)))
        })()
        .map_err(|_: nom::Err<NomError<&[u8]>>| temporal_err(Self::NAME, text))?;
        let (rest, (year, mo, dd, hh, mi, ss, nanos, z)) = parsed;
        if !rest.is_empty() {
            return Err(temporal_err(Self::NAME, text));
        }
        let date = build_date(Self::NAME, text, year as i32, mo, dd)?;
        let time = build_time(Self::NAME, text, hh, mi, ss, nanos.unwrap_or(0))?;
        // a zone-less time is taken as UTC
        Ok(Self(with_offset(Self::NAME, text, date.and_time(time), z.unwrap_or(0))?))
    }
}

impl TryFrom<&str> for GeneralizedTime {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::decode_value(s.as_bytes(), EncodingRule::Ber)
    }
}

impl Timestamped for GeneralizedTime {
    fn timestamp_utc(&self) -> ChronoDateTime<Utc> {
        self.0.with_timezone(&Utc)
    }
}

impl fmt::Display for GeneralizedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// ---------------------------------------------------------------------------
// DATE / TIME-OF-DAY / DATE-TIME
// ---------------------------------------------------------------------------

/// DATE: `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date(pub NaiveDate);

impl Date {
    pub fn new(value: NaiveDate, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: NaiveDate, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("DATE construction failed: {e}"))
    }

    pub fn value(&self) -> NaiveDate {
        self.0
    }
}

impl AsnType for Date {
    const TAG: u32 = TAG_DATE;
    const NAME: &'static str = "DATE";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.0.format("%Y-%m-%d").to_string().into_bytes())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let text = ascii(Self::NAME, content)?;
        let parsed = (|| {
            let input = content;
            let (input, y) = digits(input, 4)?;
            let (input, _) = byte(input, b'-')?;
            let (input, mo) = digits(input, 2)?;
            let (input, _) = byte(input, b'-')?;
            let (input, d) = digits(input, 2)?;
            Ok((input, (y, mo, d)))
        })()
        .map_err(|_: nom::Err<NomError<&[u8]>>| temporal_err(Self::NAME, text))?;
        let (rest, (y, mo, d)) = parsed;
        if !rest.is_empty() {
            return Err(temporal_err(Self::NAME, text));
        }
        build_date(Self::NAME, text, y as i32, mo, d).map(Self)
    }
}

impl TryFrom<&str> for Date {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::decode_value(s.as_bytes(), EncodingRule::Ber)
    }
}

impl From<NaiveDate> for Date {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl Timestamped for Date {
    fn timestamp_utc(&self) -> ChronoDateTime<Utc> {
        self.0.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc()
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// TIME-OF-DAY: `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(pub NaiveTime);

impl TimeOfDay {
    pub fn new(value: NaiveTime, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: NaiveTime, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints)
            .unwrap_or_else(|e| panic!("TIME-OF-DAY construction failed: {e}"))
    }

    pub fn value(&self) -> NaiveTime {
        self.0
    }
}

impl AsnType for TimeOfDay {
    const TAG: u32 = TAG_TIME_OF_DAY;
    const NAME: &'static str = "TIME-OF-DAY";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.0.format("%H:%M:%S").to_string().into_bytes())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let text = ascii(Self::NAME, content)?;
        let parsed = (|| {
            let input = content;
            let (input, h) = digits(input, 2)?;
            let (input, _) = byte(input, b':')?;
            let (input, mi) = digits(input, 2)?;
            let (input, _) = byte(input, b':')?;
            let (input, s) = digits(input, 2)?;
            Ok((input, (h, mi, s)))
        })()
        .map_err(|_: nom::Err<NomError<&[u8]>>| temporal_err(Self::NAME, text))?;
        let (rest, (h, mi, s)) = parsed;
        if !rest.is_empty() {
            return Err(temporal_err(Self::NAME, text));
        }
        build_time(Self::NAME, text, h, mi, s, 0).map(Self)
    }
}

impl TryFrom<&str> for TimeOfDay {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::decode_value(s.as_bytes(), EncodingRule::Ber)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(value: NaiveTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

/// DATE-TIME: `YYYY-MM-DDTHH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime(pub NaiveDateTime);

impl DateTime {
    pub fn new(value: NaiveDateTime, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: NaiveDateTime, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints)
            .unwrap_or_else(|e| panic!("DATE-TIME construction failed: {e}"))
    }

    pub fn value(&self) -> NaiveDateTime {
        self.0
    }
}

impl AsnType for DateTime {
    const TAG: u32 = TAG_DATE_TIME;
    const NAME: &'static str = "DATE-TIME";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.0.format("%Y-%m-%dT%H:%M:%S").to_string().into_bytes())
    }

    fn decode_value(content: &[u8], rule: EncodingRule) -> Result<Self> {
        let text = ascii(Self::NAME, content)?;
        let split = content
            .iter()
            .position(|b| *b == b'T')
            .ok_or_else(|| temporal_err(Self::NAME, text))?;
        let date = Date::decode_value(&content[..split], rule)?;
        let time = TimeOfDay::decode_value(&content[split + 1..], rule)?;
        Ok(Self(date.0.and_time(time.0)))
    }
}

impl TryFrom<&str> for DateTime {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::decode_value(s.as_bytes(), EncodingRule::Ber)
    }
}

impl From<NaiveDateTime> for DateTime {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl Timestamped for DateTime {
    fn timestamp_utc(&self) -> ChronoDateTime<Utc> {
        self.0.and_utc()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
    }
}

// ---------------------------------------------------------------------------
// TIME
// ---------------------------------------------------------------------------

/// The general TIME type: one of the ISO 8601 shapes the rest of the
/// family uses (a date, a time of day, or a combined date-time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AsnTime(String);

impl AsnTime {
    pub fn new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Result<Self> {
        let value = value.into();
        Self::check(&value)?;
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("TIME construction failed: {e}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn check(value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        if Date::decode_value(bytes, EncodingRule::Ber).is_ok()
            || TimeOfDay::decode_value(bytes, EncodingRule::Ber).is_ok()
            || DateTime::decode_value(bytes, EncodingRule::Ber).is_ok()
        {
            Ok(())
        } else {
            Err(Error::InvalidTemporal(format!("TIME {value:?}")))
        }
    }
}

impl AsnType for AsnTime {
    const TAG: u32 = TAG_TIME;
    const NAME: &'static str = "TIME";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.0.clone().into_bytes())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let text = ascii(Self::NAME, content)?;
        Self::check(text)?;
        Ok(Self(text.to_string()))
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&str> for AsnTime {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s, &[])
    }
}

impl AsRef<str> for AsnTime {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AsnTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
macro_rules! serialize_as_display {
    ($($t:ty),+ $(,)?) => {
        $(
            impl serde::Serialize for $t {
                fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.serialize_str(&self.to_string())
                }
            }
        )+
    };
}

#[cfg(feature = "serde")]
serialize_as_display!(UtcTime, GeneralizedTime, Date, TimeOfDay, DateTime, AsnTime);

// ---------------------------------------------------------------------------
// jiff bridges
// ---------------------------------------------------------------------------

#[cfg(feature = "jiff-conversions")]
impl Date {
    /// Builds a DATE from a jiff civil date.
    pub fn from_jiff(date: &jiff::civil::Date) -> Result<Self> {
        NaiveDate::from_ymd_opt(i32::from(date.year()), date.month() as u32, date.day() as u32)
            .map(Self)
            .ok_or_else(|| Error::InvalidTemporal(format!("DATE {date}")))
    }

    /// Converts into a jiff civil date.
    pub fn to_jiff(&self) -> Result<jiff::civil::Date> {
        use chrono::Datelike;
        jiff::civil::Date::new(self.0.year() as i16, self.0.month() as i8, self.0.day() as i8)
            .map_err(|e| Error::InvalidTemporal(e.to_string()))
    }
}

#[cfg(feature = "jiff-conversions")]
impl TimeOfDay {
    pub fn from_jiff(time: &jiff::civil::Time) -> Result<Self> {
        NaiveTime::from_hms_opt(time.hour() as u32, time.minute() as u32, time.second() as u32)
            .map(Self)
            .ok_or_else(|| Error::InvalidTemporal(format!("TIME-OF-DAY {time}")))
    }

    pub fn to_jiff(&self) -> Result<jiff::civil::Time> {
        jiff::civil::Time::new(self.0.hour() as i8, self.0.minute() as i8, self.0.second() as i8, 0)
            .map_err(|e| Error::InvalidTemporal(e.to_string()))
    }
}

#[cfg(feature = "jiff-conversions")]
impl DateTime {
    pub fn from_jiff(dt: &jiff::civil::DateTime) -> Result<Self> {
        let date = Date::from_jiff(&dt.date())?;
        let time = TimeOfDay::from_jiff(&dt.time())?;
        Ok(Self(date.0.and_time(time.0)))
    }

    pub fn to_jiff(&self) -> Result<jiff::civil::DateTime> {
        let date = Date(self.0.date()).to_jiff()?;
        let time = TimeOfDay(self.0.time()).to_jiff()?;
        Ok(date.at(time.hour(), time.minute(), time.second(), 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_time_canonical_form() {
        let t = UtcTime::try_from("9105062345Z").unwrap();
        assert_eq!(t.encode_value(EncodingRule::Der).unwrap(), b"910506234500Z");
        let t = UtcTime::try_from("910506234540Z").unwrap();
        assert_eq!(t.to_string(), "910506234540Z");
    }

    #[test]
    fn utc_time_offset_normalizes() {
        // 23:45 at -0700 is 06:45 the next day in UTC
        let t = UtcTime::try_from("910506234540-0700").unwrap();
        assert_eq!(t.encode_value(EncodingRule::Ber).unwrap(), b"910507064540Z");
    }

    #[test]
    fn utc_time_century_pivot() {
        use chrono::Datelike;
        assert_eq!(UtcTime::try_from("490101000000Z").unwrap().0.year(), 2049);
        assert_eq!(UtcTime::try_from("500101000000Z").unwrap().0.year(), 1950);
    }

    #[test]
    fn utc_time_der_requires_seconds_and_zulu() {
        assert!(UtcTime::decode_verify(b"910506234540Z", EncodingRule::Der).is_ok());
        assert!(UtcTime::decode_verify(b"9105062345Z", EncodingRule::Der).is_err());
        assert!(UtcTime::decode_verify(b"910506234540-0700", EncodingRule::Der).is_err());
        assert!(UtcTime::decode_verify(b"9105062345Z", EncodingRule::Ber).is_ok());
    }

    #[test]
    fn generalized_time_fraction() {
        let t = GeneralizedTime::try_from("20210918120000.5Z").unwrap();
        assert_eq!(t.0.nanosecond(), 500_000_000);
        assert_eq!(t.encode_value(EncodingRule::Der).unwrap(), b"20210918120000.5Z");
        let whole = GeneralizedTime::try_from("20210918120000Z").unwrap();
        assert_eq!(whole.encode_value(EncodingRule::Der).unwrap(), b"20210918120000Z");
    }

    #[test]
    fn generalized_time_der_checks() {
        assert!(GeneralizedTime::decode_verify(b"20210918120000Z", EncodingRule::Der).is_ok());
        assert!(GeneralizedTime::decode_verify(b"20210918120000", EncodingRule::Der).is_err());
        assert!(GeneralizedTime::decode_verify(b"20210918120000.50Z", EncodingRule::Der).is_err());
        assert!(GeneralizedTime::decode_verify(b"20210918120000,5Z", EncodingRule::Der).is_err());
        assert!(GeneralizedTime::decode_verify(b"20210918120000.5Z", EncodingRule::Der).is_ok());
    }

    #[test]
    fn date_layout() {
        let d = Date::try_from("2021-09-18").unwrap();
        assert_eq!(d.encode_value(EncodingRule::Der).unwrap(), b"2021-09-18");
        assert!(Date::try_from("2021-13-01").is_err());
        assert!(Date::try_from("20210918").is_err());
    }

    #[test]
    fn time_of_day_layout() {
        let t = TimeOfDay::try_from("23:59:07").unwrap();
        assert_eq!(t.encode_value(EncodingRule::Der).unwrap(), b"23:59:07");
        assert!(TimeOfDay::try_from("24:00:00").is_err());
    }

    #[test]
    fn date_time_layout() {
        let dt = DateTime::try_from("2021-09-18T06:45:00").unwrap();
        assert_eq!(dt.encode_value(EncodingRule::Der).unwrap(), b"2021-09-18T06:45:00");
        assert!(DateTime::try_from("2021-09-18 06:45:00").is_err());
    }

    #[test]
    fn general_time_accepts_family_shapes() {
        assert!(AsnTime::try_from("2021-09-18").is_ok());
        assert!(AsnTime::try_from("23:59:07").is_ok());
        assert!(AsnTime::try_from("2021-09-18T06:45:00").is_ok());
        assert!(AsnTime::try_from("not a time").is_err());
    }
}
