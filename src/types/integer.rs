//! INTEGER and ENUMERATED: minimal-length big-endian two's complement.
//!
//! The first nine bits of a valid encoding are never all zeros or all
//! ones; that minimality rule is part of the content form and applies
//! under every rule, so the verifier rejects padded encodings outright.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::constraint::{Constraint, Lengthy};
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::{TAG_ENUMERATED, TAG_INTEGER};
use crate::types::{AsnType, constrained};

/// Emits the minimal two's-complement content octets for an integer.
pub(crate) fn encode_twos_complement(value: i128) -> Vec<u8> {
    let octets = value.to_be_bytes();
    let mut skip = 0;
    while skip + 1 < octets.len() {
        let lead = octets[skip];
        let next_msb = octets[skip + 1] & 0x80;
        let redundant = (lead == 0x00 && next_msb == 0) || (lead == 0xff && next_msb != 0);
        if !redundant {
            break;
        }
        skip += 1;
    }
    octets[skip..].to_vec()
}

/// Reads two's-complement content octets, enforcing minimality.
pub(crate) fn decode_twos_complement(type_name: &'static str, content: &[u8]) -> Result<i128> {
    if content.is_empty() {
        return Err(Error::InvalidLength { type_name, len: 0, reason: "at least one content octet required" });
    }
    if content.len() > 16 {
        return Err(Error::InvalidLength {
            type_name,
            len: content.len(),
            reason: "value exceeds 128 bits",
        });
    }
    if content.len() >= 2 {
        let lead = content[0];
        let next_msb = content[1] & 0x80;
        if (lead == 0x00 && next_msb == 0) || (lead == 0xff && next_msb != 0) {
            return Err(Error::invalid_content(type_name, "non-minimal two's-complement encoding"));
        }
    }
    let negative = content[0] & 0x80 != 0;
    let mut octets = [if negative { 0xff } else { 0x00 }; 16];
    octets[16 - content.len()..].copy_from_slice(content);
    Ok(i128::from_be_bytes(octets))
}

/// An ASN.1 INTEGER backed by `i128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Integer(pub i128);

impl Integer {
    pub fn new(value: i128, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: i128, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("INTEGER construction failed: {e}"))
    }

    pub fn value(self) -> i128 {
        self.0
    }
}

impl AsnType for Integer {
    const TAG: u32 = TAG_INTEGER;
    const NAME: &'static str = "INTEGER";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(encode_twos_complement(self.0))
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        decode_twos_complement(Self::NAME, content).map(Self)
    }

    fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

macro_rules! integer_conversions {
    ($($from:ty),+) => {
        $(
            impl From<$from> for Integer {
                fn from(value: $from) -> Self {
                    Self(value as i128)
                }
            }
        )+
    };
}

integer_conversions!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<Integer> for i128 {
    fn from(value: Integer) -> Self {
        value.0
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Lengthy for Integer {
    fn size(&self) -> usize {
        encode_twos_complement(self.0).len()
    }
}

#[cfg(feature = "serde")]
impl Serialize for Integer {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i128(self.0)
    }
}

/// An ASN.1 ENUMERATED: an integer on the wire under its own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Enumerated(pub i64);

impl Enumerated {
    pub fn new(value: i64, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: i64, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("ENUMERATED construction failed: {e}"))
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl AsnType for Enumerated {
    const TAG: u32 = TAG_ENUMERATED;
    const NAME: &'static str = "ENUMERATED";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(encode_twos_complement(self.0 as i128))
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let n = decode_twos_complement(Self::NAME, content)?;
        i64::try_from(n)
            .map(Self)
            .map_err(|_| Error::invalid_content(Self::NAME, "value exceeds 64 bits"))
    }
}

impl From<i64> for Enumerated {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Enumerated> for i128 {
    fn from(value: Enumerated) -> Self {
        value.0 as i128
    }
}

impl fmt::Display for Enumerated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Enumerated {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_positive_forms() {
        assert_eq!(encode_twos_complement(0), [0x00]);
        assert_eq!(encode_twos_complement(127), [0x7f]);
        assert_eq!(encode_twos_complement(128), [0x00, 0x80]);
        assert_eq!(encode_twos_complement(256), [0x01, 0x00]);
        assert_eq!(encode_twos_complement(65535), [0x00, 0xff, 0xff]);
    }

    #[test]
    fn minimal_negative_forms() {
        assert_eq!(encode_twos_complement(-1), [0xff]);
        assert_eq!(encode_twos_complement(-128), [0x80]);
        assert_eq!(encode_twos_complement(-129), [0xff, 0x7f]);
        assert_eq!(encode_twos_complement(-32768), [0x80, 0x00]);
    }

    #[test]
    fn round_trip_extremes() {
        for v in [0i128, 1, -1, 127, 128, -128, -129, i64::MAX as i128, i64::MIN as i128, i128::MAX, i128::MIN] {
            let enc = encode_twos_complement(v);
            assert_eq!(decode_twos_complement("INTEGER", &enc).unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn rejects_padded_encodings() {
        assert!(decode_twos_complement("INTEGER", &[0x00, 0x7f]).is_err());
        assert!(decode_twos_complement("INTEGER", &[0xff, 0x80]).is_err());
        // 0x00 0x80 is the canonical form of 128, not padding
        assert_eq!(decode_twos_complement("INTEGER", &[0x00, 0x80]).unwrap(), 128);
        assert!(decode_twos_complement("INTEGER", &[]).is_err());
    }

    #[test]
    fn enumerated_fits_in_64_bits() {
        let enc = encode_twos_complement(i128::from(i64::MAX) + 1);
        assert!(Enumerated::decode_value(&enc, EncodingRule::Ber).is_err());
        let enc = Enumerated(-3).encode_value(EncodingRule::Ber).unwrap();
        assert_eq!(Enumerated::decode_value(&enc, EncodingRule::Ber).unwrap(), Enumerated(-3));
    }
}
