//! OBJECT IDENTIFIER and RELATIVE-OID: base-128 arc encoding with MSB
//! continuation; the first two arcs of an absolute OID fold into one
//! sub-identifier as `first * 40 + second`.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

use crate::constraint::{Constraint, Lengthy};
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::{TAG_OBJECT_IDENTIFIER, TAG_RELATIVE_OID};
use crate::types::{AsnType, constrained};

/// Appends one sub-identifier in base-128 with MSB continuation.
pub(crate) fn encode_arc(mut arc: u64, out: &mut Vec<u8>) {
    let mut chunks = [0u8; 10];
    let mut i = chunks.len();
    loop {
        i -= 1;
        chunks[i] = (arc & 0x7f) as u8;
        arc >>= 7;
        if arc == 0 {
            break;
        }
    }
    let last = chunks.len() - 1;
    for (pos, chunk) in chunks[i..].iter().enumerate() {
        out.push(if i + pos < last { chunk | 0x80 } else { *chunk });
    }
}

/// Reads one sub-identifier, returning (arc, consumed).
pub(crate) fn decode_arc(type_name: &'static str, input: &[u8]) -> Result<(u64, usize)> {
    let mut arc: u64 = 0;
    for (i, octet) in input.iter().enumerate() {
        if i >= 10 {
            return Err(Error::invalid_content(type_name, "sub-identifier exceeds 64 bits"));
        }
        arc = (arc << 7) | u64::from(octet & 0x7f);
        if octet & 0x80 == 0 {
            return Ok((arc, i + 1));
        }
    }
    Err(Error::invalid_content(type_name, "truncated sub-identifier"))
}

fn parse_dotted(type_name: &'static str, s: &str) -> Result<Vec<u64>> {
    s.split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| Error::invalid_content(type_name, format!("bad arc {part:?}")))
        })
        .collect()
}

fn fmt_dotted(arcs: &[u64], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, arc) in arcs.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write!(f, "{arc}")?;
    }
    Ok(())
}

/// An absolute OBJECT IDENTIFIER.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectIdentifier(Vec<u64>);

impl ObjectIdentifier {
    pub fn new(arcs: impl Into<Vec<u64>>, constraints: &[Constraint<Self>]) -> Result<Self> {
        let arcs = arcs.into();
        Self::check_arcs(&arcs)?;
        constrained(Self(arcs), constraints)
    }

    pub fn must_new(arcs: impl Into<Vec<u64>>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(arcs, constraints)
            .unwrap_or_else(|e| panic!("OBJECT IDENTIFIER construction failed: {e}"))
    }

    fn check_arcs(arcs: &[u64]) -> Result<()> {
        if arcs.len() < 2 {
            return Err(Error::invalid_content(Self::NAME, "at least two arcs required"));
        }
        if arcs[0] > 2 {
            return Err(Error::invalid_content(Self::NAME, "first arc must be 0, 1 or 2"));
        }
        if arcs[0] < 2 && arcs[1] >= 40 {
            return Err(Error::invalid_content(
                Self::NAME,
                "second arc must be below 40 when the first is 0 or 1",
            ));
        }
        Ok(())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }
}

impl AsnType for ObjectIdentifier {
    const TAG: u32 = TAG_OBJECT_IDENTIFIER;
    const NAME: &'static str = "OBJECT IDENTIFIER";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        Self::check_arcs(&self.0)?;
        let mut out = Vec::with_capacity(self.0.len() + 1);
        encode_arc(self.0[0] * 40 + self.0[1], &mut out);
        for arc in &self.0[2..] {
            encode_arc(*arc, &mut out);
        }
        Ok(out)
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: 0,
                reason: "at least one sub-identifier required",
            });
        }
        let (first, mut pos) = decode_arc(Self::NAME, content)?;
        let mut arcs = if first < 40 {
            vec![0, first]
        } else if first < 80 {
            vec![1, first - 40]
        } else {
            vec![2, first - 80]
        };
        while pos < content.len() {
            let (arc, used) = decode_arc(Self::NAME, &content[pos..])?;
            arcs.push(arc);
            pos += used;
        }
        Ok(Self(arcs))
    }
}

impl TryFrom<&str> for ObjectIdentifier {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(parse_dotted(Self::NAME, s)?, &[])
    }
}

impl FromStr for ObjectIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s)
    }
}

impl AsRef<[u64]> for ObjectIdentifier {
    fn as_ref(&self) -> &[u64] {
        &self.0
    }
}

impl Lengthy for ObjectIdentifier {
    fn size(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_dotted(&self.0, f)
    }
}

impl fmt::Debug for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectIdentifier({self})")
    }
}

#[cfg(feature = "serde")]
impl Serialize for ObjectIdentifier {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A RELATIVE-OID: arcs without the absolute-root folding.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RelativeOid(Vec<u64>);

impl RelativeOid {
    pub fn new(arcs: impl Into<Vec<u64>>, constraints: &[Constraint<Self>]) -> Result<Self> {
        let arcs = arcs.into();
        if arcs.is_empty() {
            return Err(Error::invalid_content(Self::NAME, "at least one arc required"));
        }
        constrained(Self(arcs), constraints)
    }

    pub fn must_new(arcs: impl Into<Vec<u64>>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(arcs, constraints)
            .unwrap_or_else(|e| panic!("RELATIVE-OID construction failed: {e}"))
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }
}

impl AsnType for RelativeOid {
    const TAG: u32 = TAG_RELATIVE_OID;
    const NAME: &'static str = "RELATIVE-OID";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        if self.0.is_empty() {
            return Err(Error::invalid_content(Self::NAME, "at least one arc required"));
        }
        let mut out = Vec::with_capacity(self.0.len());
        for arc in &self.0 {
            encode_arc(*arc, &mut out);
        }
        Ok(out)
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: 0,
                reason: "at least one sub-identifier required",
            });
        }
        let mut arcs = Vec::new();
        let mut pos = 0;
        while pos < content.len() {
            let (arc, used) = decode_arc(Self::NAME, &content[pos..])?;
            arcs.push(arc);
            pos += used;
        }
        Ok(Self(arcs))
    }
}

impl TryFrom<&str> for RelativeOid {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(parse_dotted(Self::NAME, s)?, &[])
    }
}

impl AsRef<[u64]> for RelativeOid {
    fn as_ref(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for RelativeOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_dotted(&self.0, f)
    }
}

impl fmt::Debug for RelativeOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelativeOid({self})")
    }
}

#[cfg(feature = "serde")]
impl Serialize for RelativeOid {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let oid: ObjectIdentifier = "1.3.6.1.4.1.56521".parse().unwrap();
        let content = oid.encode_value(EncodingRule::Der).unwrap();
        assert_eq!(content, [0x2b, 0x06, 0x01, 0x04, 0x01, 0x83, 0xb9, 0x49]);
        assert_eq!(ObjectIdentifier::decode_value(&content, EncodingRule::Der).unwrap(), oid);
    }

    #[test]
    fn first_arc_folding() {
        let oid = ObjectIdentifier::new(vec![2, 100, 3], &[]).unwrap();
        let content = oid.encode_value(EncodingRule::Der).unwrap();
        // 2*40 + 100 = 180 = 0x81 0x34 in base-128
        assert_eq!(content, [0x81, 0x34, 0x03]);
        assert_eq!(ObjectIdentifier::decode_value(&content, EncodingRule::Der).unwrap(), oid);
    }

    #[test]
    fn arc_rules_enforced() {
        assert!(ObjectIdentifier::new(vec![3, 1], &[]).is_err());
        assert!(ObjectIdentifier::new(vec![1, 40], &[]).is_err());
        assert!(ObjectIdentifier::new(vec![2, 40], &[]).is_ok());
        assert!(ObjectIdentifier::new(vec![1], &[]).is_err());
        assert!(ObjectIdentifier::new(vec![0, 39], &[]).is_ok());
    }

    #[test]
    fn relative_oid_round_trip() {
        let roid = RelativeOid::new(vec![8571, 3, 2], &[]).unwrap();
        let content = roid.encode_value(EncodingRule::Der).unwrap();
        assert_eq!(content, [0xc2, 0x7b, 0x03, 0x02]);
        assert_eq!(RelativeOid::decode_value(&content, EncodingRule::Der).unwrap(), roid);
        assert!(RelativeOid::new(Vec::new(), &[]).is_err());
    }

    #[test]
    fn truncated_sub_identifier() {
        assert!(ObjectIdentifier::decode_value(&[0x2b, 0x83], EncodingRule::Ber).is_err());
        assert!(ObjectIdentifier::decode_value(&[], EncodingRule::Ber).is_err());
    }

    #[test]
    fn display_round_trip() {
        let oid: ObjectIdentifier = "1.2.840.113549.1.1.5".parse().unwrap();
        assert_eq!(oid.to_string(), "1.2.840.113549.1.1.5");
        assert!("1.99.1".parse::<ObjectIdentifier>().is_err());
    }
}
