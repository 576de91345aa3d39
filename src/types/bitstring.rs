//! BIT STRING: a leading unused-bits octet followed by the bit payload,
//! most significant bit first.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::constraint::{Constraint, Lengthy};
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::TAG_BIT_STRING;
use crate::types::{AsnType, constrained};

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitString {
    octets: Vec<u8>,
    bit_len: usize,
}

impl BitString {
    /// Builds a bit string from whole octets plus a count of unused
    /// trailing bits in the final octet.
    pub fn new(octets: impl Into<Vec<u8>>, unused: u8, constraints: &[Constraint<Self>]) -> Result<Self> {
        let octets = octets.into();
        if unused > 7 {
            return Err(Error::invalid_content("BIT STRING", "unused bit count above 7"));
        }
        if octets.is_empty() && unused != 0 {
            return Err(Error::invalid_content("BIT STRING", "unused bits in an empty payload"));
        }
        let bit_len = octets.len() * 8 - usize::from(unused);
        constrained(Self { octets, bit_len }, constraints)
    }

    pub fn must_new(octets: impl Into<Vec<u8>>, unused: u8, constraints: &[Constraint<Self>]) -> Self {
        Self::new(octets, unused, constraints)
            .unwrap_or_else(|e| panic!("BIT STRING construction failed: {e}"))
    }

    /// Builds a bit string from individual bits, most significant first.
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        let mut value = Self::default();
        for bit in bits {
            value.push_bit(bit);
        }
        value
    }

    pub fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.octets.push(0);
        }
        if bit {
            let last = self.octets.len() - 1;
            self.octets[last] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some(self.octets[index / 8] & (0x80 >> (index % 8)) != 0)
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn octets(&self) -> &[u8] {
        &self.octets
    }

    pub fn unused_bits(&self) -> u8 {
        (self.octets.len() * 8 - self.bit_len) as u8
    }
}

impl AsnType for BitString {
    const TAG: u32 = TAG_BIT_STRING;
    const NAME: &'static str = "BIT STRING";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.octets.len() + 1);
        out.push(self.unused_bits());
        out.extend_from_slice(&self.octets);
        Ok(out)
    }

    fn decode_verify(content: &[u8], rule: EncodingRule) -> Result<()> {
        let Some((&unused, payload)) = content.split_first() else {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: 0,
                reason: "missing unused-bits octet",
            });
        };
        if unused > 7 {
            return Err(Error::invalid_content(Self::NAME, "unused bit count above 7"));
        }
        if payload.is_empty() && unused != 0 {
            return Err(Error::invalid_content(Self::NAME, "unused bits in an empty payload"));
        }
        if rule.is_canonical() && unused > 0 {
            let mask = (1u8 << unused) - 1;
            if payload.last().is_some_and(|last| last & mask != 0) {
                return Err(Error::invalid_content(Self::NAME, "unused bits must be zero under CER/DER"));
            }
        }
        Ok(())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let unused = content[0];
        let octets = content[1..].to_vec();
        let bit_len = octets.len() * 8 - usize::from(unused);
        Ok(Self { octets, bit_len })
    }

    fn is_empty(&self) -> bool {
        self.bit_len == 0
    }
}

impl Lengthy for BitString {
    fn size(&self) -> usize {
        self.bit_len
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString(")?;
        for i in 0..self.bit_len {
            write!(f, "{}", if self.bit(i) == Some(true) { '1' } else { '0' })?;
        }
        write!(f, ")")
    }
}

#[cfg(feature = "serde")]
impl Serialize for BitString {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{self:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_bits_prefix() {
        let bs = BitString::new(vec![0x80], 7, &[]).unwrap();
        assert_eq!(bs.encode_value(EncodingRule::Ber).unwrap(), [0x07, 0x80]);
        assert_eq!(bs.bit_len(), 1);
        assert_eq!(bs.bit(0), Some(true));
        assert_eq!(bs.bit(1), None);
    }

    #[test]
    fn from_bits_round_trip() {
        let bs = BitString::from_bits([true, false, true, true, false, false, true, false, true]);
        assert_eq!(bs.bit_len(), 9);
        assert_eq!(bs.unused_bits(), 7);
        let content = bs.encode_value(EncodingRule::Der).unwrap();
        assert_eq!(content, [0x07, 0xb2, 0x80]);
        let back = BitString::decode_value(&content, EncodingRule::Der).unwrap();
        assert_eq!(back, bs);
    }

    #[test]
    fn empty_bit_string() {
        let bs = BitString::default();
        assert_eq!(bs.encode_value(EncodingRule::Der).unwrap(), [0x00]);
        assert!(BitString::decode_verify(&[0x00], EncodingRule::Der).is_ok());
    }

    #[test]
    fn verify_rejects_malformed_content() {
        assert!(BitString::decode_verify(&[], EncodingRule::Ber).is_err());
        assert!(BitString::decode_verify(&[0x08, 0xff], EncodingRule::Ber).is_err());
        assert!(BitString::decode_verify(&[0x01], EncodingRule::Ber).is_err());
    }

    #[test]
    fn der_requires_zero_padding_bits() {
        // low bit set inside the unused region
        assert!(BitString::decode_verify(&[0x07, 0x81], EncodingRule::Der).is_err());
        assert!(BitString::decode_verify(&[0x07, 0x81], EncodingRule::Ber).is_ok());
        assert!(BitString::decode_verify(&[0x07, 0x80], EncodingRule::Der).is_ok());
    }
}
