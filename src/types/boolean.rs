//! BOOLEAN: one content octet. Zero is false and any non-zero octet is
//! true under BER; CER and DER require `0xFF` for true, and the encoder
//! always emits the canonical octet.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::TAG_BOOLEAN;
use crate::types::{AsnType, constrained};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Boolean(pub bool);

impl Boolean {
    pub fn new(value: bool, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: bool, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("BOOLEAN construction failed: {e}"))
    }

    pub fn value(self) -> bool {
        self.0
    }
}

impl AsnType for Boolean {
    const TAG: u32 = TAG_BOOLEAN;
    const NAME: &'static str = "BOOLEAN";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(vec![if self.0 { 0xff } else { 0x00 }])
    }

    fn decode_verify(content: &[u8], rule: EncodingRule) -> Result<()> {
        if content.len() != 1 {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: content.len(),
                reason: "exactly one content octet required",
            });
        }
        if rule.is_canonical() && content[0] != 0x00 && content[0] != 0xff {
            return Err(Error::invalid_content(Self::NAME, "true must be 0xFF under CER/DER"));
        }
        Ok(())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        Ok(Self(content[0] != 0))
    }
}

impl From<bool> for Boolean {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl From<Boolean> for bool {
    fn from(value: Boolean) -> Self {
        value.0
    }
}

impl fmt::Display for Boolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "TRUE" } else { "FALSE" })
    }
}

#[cfg(feature = "serde")]
impl Serialize for Boolean {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bool(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_true_octet() {
        assert_eq!(Boolean(true).encode_value(EncodingRule::Ber).unwrap(), [0xff]);
        assert_eq!(Boolean(false).encode_value(EncodingRule::Der).unwrap(), [0x00]);
    }

    #[test]
    fn ber_accepts_any_nonzero() {
        assert!(Boolean::decode_verify(&[0x01], EncodingRule::Ber).is_ok());
        assert_eq!(Boolean::decode_value(&[0x01], EncodingRule::Ber).unwrap(), Boolean(true));
        assert_eq!(Boolean::decode_value(&[0x00], EncodingRule::Ber).unwrap(), Boolean(false));
    }

    #[test]
    fn der_rejects_non_canonical_true() {
        assert!(Boolean::decode_verify(&[0x01], EncodingRule::Der).is_err());
        assert!(Boolean::decode_verify(&[0xff], EncodingRule::Der).is_ok());
        assert!(Boolean::decode_verify(&[], EncodingRule::Der).is_err());
        assert!(Boolean::decode_verify(&[0, 0], EncodingRule::Der).is_err());
    }
}
