//! REAL: binary mantissa/exponent content form.
//!
//! Layout of the leading octet: bit 8 set marks the binary form, bit 7
//! the mantissa sign, bits 6-5 the base (00 = 2, 01 = 8, 10 = 16,
//! 11 = 10), and bits 2-1 the exponent length (one to three octets, or
//! `11` followed by a count octet for up to fifteen). The exponent is
//! two's complement, the mantissa unsigned big-endian. Zero encodes as
//! empty content; the infinities are the single octets `0x40`/`0x41`.
//! The encoder always emits base 2.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::TAG_REAL;
use crate::types::integer::encode_twos_complement;
use crate::types::{AsnType, constrained};

const HEADER_PLUS_INFINITY: u8 = 0x40;
const HEADER_MINUS_INFINITY: u8 = 0x41;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Real(pub f64);

impl Real {
    pub fn new(value: f64, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: f64, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("REAL construction failed: {e}"))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Splits a finite non-zero double into (mantissa, base-2 exponent,
/// negative) with an odd mantissa.
fn decompose(value: f64) -> (u64, i32, bool) {
    let negative = value.is_sign_negative();
    let bits = value.abs().to_bits();
    let raw_exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1u64 << 52) - 1);
    let (mut mantissa, mut exp) = if raw_exp == 0 {
        (frac, -1074) // subnormal
    } else {
        (frac | (1 << 52), raw_exp - 1075)
    };
    while mantissa & 1 == 0 {
        mantissa >>= 1;
        exp += 1;
    }
    (mantissa, exp, negative)
}

fn base_factor(bits: u8) -> Result<f64> {
    match bits {
        0b00 => Ok(2.0),
        0b01 => Ok(8.0),
        0b10 => Ok(16.0),
        0b11 => Ok(10.0),
        other => Err(Error::InvalidBase(other)),
    }
}

/// Multiplies by a power of two in clamped steps, so exponents near the
/// edges of the double range neither overflow an intermediate nor lose
/// the subnormal tail.
fn scale_pow2(mut value: f64, mut exp: i32) -> f64 {
    while exp > 1023 {
        value *= 2f64.powi(1023);
        exp -= 1023;
    }
    while exp < -1023 {
        value *= 2f64.powi(-1023);
        exp += 1023;
    }
    value * 2f64.powi(exp)
}

/// Sign-extends exponent octets without a minimality requirement.
fn read_exponent(type_name: &'static str, octets: &[u8]) -> Result<i32> {
    if octets.is_empty() || octets.len() > 4 {
        return Err(Error::invalid_content(type_name, "exponent must use 1 to 4 octets"));
    }
    let negative = octets[0] & 0x80 != 0;
    let mut buf = [if negative { 0xff } else { 0x00 }; 4];
    buf[4 - octets.len()..].copy_from_slice(octets);
    Ok(i32::from_be_bytes(buf))
}

impl AsnType for Real {
    const TAG: u32 = TAG_REAL;
    const NAME: &'static str = "REAL";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        let v = self.0;
        if v == 0.0 {
            return Ok(Vec::new());
        }
        if v.is_infinite() {
            return Ok(vec![if v > 0.0 { HEADER_PLUS_INFINITY } else { HEADER_MINUS_INFINITY }]);
        }
        if v.is_nan() {
            return Err(Error::invalid_content(Self::NAME, "NaN has no encoding"));
        }
        let (mantissa, exp, negative) = decompose(v);
        let exp_octets = encode_twos_complement(i128::from(exp));
        let mantissa_octets = {
            let octets = mantissa.to_be_bytes();
            let skip = octets.iter().position(|b| *b != 0).unwrap_or(octets.len() - 1);
            octets[skip..].to_vec()
        };
        let mut out = Vec::with_capacity(1 + exp_octets.len() + mantissa_octets.len());
        let mut header = 0x80;
        if negative {
            header |= 0x40;
        }
        // base 2, so bits 6-5 stay clear
        debug_assert!(exp_octets.len() <= 3);
        header |= (exp_octets.len() - 1) as u8;
        out.push(header);
        out.extend_from_slice(&exp_octets);
        out.extend_from_slice(&mantissa_octets);
        Ok(out)
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let Some((&header, rest)) = content.split_first() else {
            return Ok(Self(0.0));
        };
        if header & 0x80 == 0 {
            return match header {
                HEADER_PLUS_INFINITY => Ok(Self(f64::INFINITY)),
                HEADER_MINUS_INFINITY => Ok(Self(f64::NEG_INFINITY)),
                _ => Err(Error::invalid_content(Self::NAME, "only the binary content form is supported")),
            };
        }
        let negative = header & 0x40 != 0;
        let base = base_factor((header >> 4) & 0b11)?;
        let (exp_len, exp_start) = match header & 0b11 {
            0b11 => {
                let count = *rest
                    .first()
                    .ok_or_else(|| Error::invalid_content(Self::NAME, "missing exponent length octet"))?
                    as usize;
                if count == 0 || count > 15 {
                    return Err(Error::invalid_content(Self::NAME, "exponent length outside 1..15"));
                }
                (count, 1)
            }
            bits => (bits as usize + 1, 0),
        };
        let exp_end = exp_start + exp_len;
        if rest.len() < exp_end + 1 {
            return Err(Error::invalid_content(Self::NAME, "truncated exponent or mantissa"));
        }
        let exp = read_exponent(Self::NAME, &rest[exp_start..exp_end])?;
        let mantissa_octets = &rest[exp_end..];
        if mantissa_octets.len() > 8 {
            return Err(Error::invalid_content(Self::NAME, "mantissa exceeds 64 bits"));
        }
        let mut mantissa: u64 = 0;
        for octet in mantissa_octets {
            mantissa = (mantissa << 8) | u64::from(*octet);
        }
        let mut value = if base == 2.0 {
            scale_pow2(mantissa as f64, exp)
        } else {
            mantissa as f64 * base.powi(exp)
        };
        if negative {
            value = -value;
        }
        Ok(Self(value))
    }

    fn is_empty(&self) -> bool {
        self.0 == 0.0
    }
}

impl From<f64> for Real {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<f32> for Real {
    fn from(value: f32) -> Self {
        Self(f64::from(value))
    }
}

impl From<Real> for f64 {
    fn from(value: Real) -> Self {
        value.0
    }
}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl fmt::Display for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Real {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: f64) {
        let content = Real(v).encode_value(EncodingRule::Der).unwrap();
        let back = Real::decode_value(&content, EncodingRule::Der).unwrap();
        assert_eq!(back.0, v, "value {v}");
    }

    #[test]
    fn known_vectors() {
        assert_eq!(Real(0.0).encode_value(EncodingRule::Der).unwrap(), [] as [u8; 0]);
        assert_eq!(Real(1.0).encode_value(EncodingRule::Der).unwrap(), [0x80, 0x00, 0x01]);
        assert_eq!(Real(-0.5).encode_value(EncodingRule::Der).unwrap(), [0xc0, 0xff, 0x01]);
        assert_eq!(Real(8.0).encode_value(EncodingRule::Der).unwrap(), [0x80, 0x03, 0x01]);
        assert_eq!(
            Real(f64::INFINITY).encode_value(EncodingRule::Ber).unwrap(),
            [HEADER_PLUS_INFINITY]
        );
        assert_eq!(
            Real(f64::NEG_INFINITY).encode_value(EncodingRule::Ber).unwrap(),
            [HEADER_MINUS_INFINITY]
        );
    }

    #[test]
    fn round_trips() {
        for v in [
            0.0,
            1.0,
            -1.0,
            0.5,
            -0.5,
            3.25,
            -1024.0,
            1.5e300,
            5e-324, // smallest subnormal
            f64::MAX,
            f64::INFINITY,
            f64::NEG_INFINITY,
        ] {
            round_trip(v);
        }
    }

    #[test]
    fn alternate_bases_decode() {
        // 3 * 8^2 = 192, base bits 01
        let content = [0x90, 0x02, 0x03];
        assert_eq!(Real::decode_value(&content, EncodingRule::Ber).unwrap().0, 192.0);
        // 2 * 16^1 = 32, base bits 10
        let content = [0xa0, 0x01, 0x02];
        assert_eq!(Real::decode_value(&content, EncodingRule::Ber).unwrap().0, 32.0);
        // 7 * 10^-1 = 0.7, base bits 11
        let content = [0xb0, 0xff, 0x07];
        assert!((Real::decode_value(&content, EncodingRule::Ber).unwrap().0 - 0.7).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_content() {
        assert!(Real(f64::NAN).encode_value(EncodingRule::Ber).is_err());
        // decimal NR form marker
        assert!(Real::decode_value(&[0x03, 0x31], EncodingRule::Ber).is_err());
        // missing mantissa
        assert!(Real::decode_value(&[0x80, 0x00], EncodingRule::Ber).is_err());
        // extended exponent length of zero
        assert!(Real::decode_value(&[0x83, 0x00, 0x01, 0x01], EncodingRule::Ber).is_err());
    }
}
