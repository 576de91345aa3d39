//! DURATION: the ISO 8601 textual form `PnYnMnWnDTnHnMnS`.

use core::fmt;

use nom::error::{Error as NomError, ErrorKind};
use nom::IResult;

use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::TAG_DURATION;
use crate::types::{AsnType, constrained};

/// A duration broken into its calendar components. Seconds may carry a
/// fraction; every other component is integral.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Duration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: f64,
}

impl Duration {
    pub fn new(value: Duration, constraints: &[Constraint<Self>]) -> Result<Self> {
        if value.seconds < 0.0 {
            return Err(Error::invalid_content("DURATION", "negative seconds component"));
        }
        constrained(value, constraints)
    }

    pub fn must_new(value: Duration, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("DURATION construction failed: {e}"))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// Length in seconds under the civil approximations of one year as
    /// 365 days and one month as 30 days. Used for ordering only.
    pub fn approx_seconds(&self) -> f64 {
        let days = f64::from(self.years) * 365.0
            + f64::from(self.months) * 30.0
            + f64::from(self.weeks) * 7.0
            + f64::from(self.days);
        days * 86_400.0 + f64::from(self.hours) * 3_600.0 + f64::from(self.minutes) * 60.0 + self.seconds
    }
}

/// An unsigned integer of at most nine digits, plus its designator.
fn component(input: &[u8]) -> IResult<&[u8], (u64, Option<u32>, u8)> {
    let digits = input.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > 9 {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Digit)));
    }
    let mut whole: u64 = 0;
    for b in &input[..digits] {
        whole = whole * 10 + u64::from(b - b'0');
    }
    let mut rest = &input[digits..];
    let mut fraction = None;
    if rest.first() == Some(&b'.') {
        let frac_digits = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if frac_digits == 0 || frac_digits > 9 {
            return Err(nom::Err::Error(NomError::new(input, ErrorKind::Digit)));
        }
        let mut nanos: u32 = 0;
        for b in &rest[1..=frac_digits] {
            nanos = nanos * 10 + u32::from(b - b'0');
        }
        nanos *= 10u32.pow(9 - frac_digits as u32);
        fraction = Some(nanos);
        rest = &rest[1 + frac_digits..];
    }
    let Some((&designator, rest)) = rest.split_first() else {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)));
    };
    Ok((rest, (whole, fraction, designator)))
}

impl AsnType for Duration {
    const TAG: u32 = TAG_DURATION;
    const NAME: &'static str = "DURATION";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.to_string().into_bytes())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let bad = || Error::InvalidTemporal(format!("DURATION {:?}", String::from_utf8_lossy(content)));
        let mut input = content;
        if input.first() != Some(&b'P') {
            return Err(bad());
        }
        input = &input[1..];
        if input.is_empty() {
            return Err(bad());
        }
        let mut out = Duration::default();
        let mut in_time = false;
        let mut seen = 0u8;
        while !input.is_empty() {
            if !in_time && input[0] == b'T' {
                in_time = true;
                input = &input[1..];
                if input.is_empty() {
                    return Err(bad());
                }
                continue;
            }
            let (rest, (whole, fraction, designator)) = component(input).map_err(|_| bad())?;
            // fractions are only legal on the final (seconds) component
            if fraction.is_some() && !(in_time && designator == b'S') {
                return Err(bad());
            }
            let small = u32::try_from(whole).map_err(|_| bad())?;
            let order = match (in_time, designator) {
                (false, b'Y') => {
                    out.years = small;
                    1
                }
                (false, b'M') => {
                    out.months = small;
                    2
                }
                (false, b'W') => {
                    out.weeks = small;
                    3
                }
                (false, b'D') => {
                    out.days = small;
                    4
                }
                (true, b'H') => {
                    out.hours = small;
                    5
                }
                (true, b'M') => {
                    out.minutes = small;
                    6
                }
                (true, b'S') => {
                    out.seconds = whole as f64 + f64::from(fraction.unwrap_or(0)) / 1e9;
                    7
                }
                _ => return Err(bad()),
            };
            if order <= seen {
                return Err(bad());
            }
            seen = order;
            input = rest;
        }
        if seen == 0 {
            return Err(bad());
        }
        Ok(out)
    }

    fn is_empty(&self) -> bool {
        self.is_zero()
    }
}

impl TryFrom<&str> for Duration {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::decode_value(s.as_bytes(), EncodingRule::Ber)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("PT0S");
        }
        f.write_str("P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.weeks > 0 {
            write!(f, "{}W", self.weeks)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0.0 {
            f.write_str("T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0.0 {
                if self.seconds.fract() == 0.0 {
                    write!(f, "{}S", self.seconds as u64)?;
                } else {
                    let text = format!("{:.9}", self.seconds);
                    write!(f, "{}S", text.trim_end_matches('0').trim_end_matches('.'))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_round_trips() {
        for text in ["P1Y2M3DT4H5M6S", "PT15M", "P3W", "P2DT12H", "PT0.5S", "PT0S"] {
            let d = Duration::try_from(text).unwrap();
            assert_eq!(d.to_string(), text, "duration {text}");
            let content = d.encode_value(EncodingRule::Der).unwrap();
            assert_eq!(Duration::decode_value(&content, EncodingRule::Der).unwrap(), d);
        }
    }

    #[test]
    fn component_values() {
        let d = Duration::try_from("P1Y2M3DT4H5M6.25S").unwrap();
        assert_eq!((d.years, d.months, d.days), (1, 2, 3));
        assert_eq!((d.hours, d.minutes), (4, 5));
        assert_eq!(d.seconds, 6.25);
    }

    #[test]
    fn rejects_malformed_forms() {
        for text in ["", "P", "PT", "1Y", "P1S", "PT1D", "P1M2Y", "P1.5Y", "PT1H1H"] {
            assert!(Duration::try_from(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn ordering_approximation() {
        let minute = Duration { minutes: 1, ..Duration::default() };
        let hour = Duration { hours: 1, ..Duration::default() };
        assert!(minute.approx_seconds() < hour.approx_seconds());
        assert_eq!(Duration::default().approx_seconds(), 0.0);
    }
}
