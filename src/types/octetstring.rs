//! OCTET STRING: raw content octets.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::constraint::{Constraint, Lengthy};
use crate::error::Result;
use crate::pdu::EncodingRule;
use crate::tag::TAG_OCTET_STRING;
use crate::types::{AsnType, constrained};

#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct OctetString(pub Vec<u8>);

impl OctetString {
    pub fn new(value: impl Into<Vec<u8>>, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value.into()), constraints)
    }

    pub fn must_new(value: impl Into<Vec<u8>>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints)
            .unwrap_or_else(|e| panic!("OCTET STRING construction failed: {e}"))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsnType for OctetString {
    const TAG: u32 = TAG_OCTET_STRING;
    const NAME: &'static str = "OCTET STRING";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        Ok(Self(content.to_vec()))
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for OctetString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for OctetString {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for OctetString {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for OctetString {
    fn from(value: &[u8; N]) -> Self {
        Self(value.to_vec())
    }
}

impl From<OctetString> for Vec<u8> {
    fn from(value: OctetString) -> Self {
        value.0
    }
}

impl Lengthy for OctetString {
    fn size(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for OctetString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OctetString(")?;
        for octet in &self.0 {
            write!(f, "{octet:02x}")?;
        }
        write!(f, ")")
    }
}

#[cfg(feature = "serde")]
impl Serialize for OctetString {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}
