//! NULL: zero content octets.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::TAG_NULL;
use crate::types::AsnType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Null;

impl AsnType for Null {
    const TAG: u32 = TAG_NULL;
    const NAME: &'static str = "NULL";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn decode_verify(content: &[u8], _rule: EncodingRule) -> Result<()> {
        if !content.is_empty() {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: content.len(),
                reason: "content must be empty",
            });
        }
        Ok(())
    }

    fn decode_value(_content: &[u8], _rule: EncodingRule) -> Result<Self> {
        Ok(Self)
    }
}

impl fmt::Display for Null {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NULL")
    }
}

#[cfg(feature = "serde")]
impl Serialize for Null {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_only() {
        assert!(Null.encode_value(EncodingRule::Ber).unwrap().is_empty());
        assert!(Null::decode_verify(&[], EncodingRule::Der).is_ok());
        assert!(Null::decode_verify(&[0x00], EncodingRule::Der).is_err());
    }
}
