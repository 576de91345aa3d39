//! A catch-all value preserving an arbitrary TLV verbatim.
//!
//! `Any` lets a composite carry fields whose type is not known to the
//! schema: the raw element survives a decode and re-encodes untouched.

use core::fmt;

use crate::error::Result;
use crate::options::Options;
use crate::pdu::Pdu;
use crate::tag::Class;
use crate::tlv::Tlv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Any {
    tlv: Tlv,
}

impl Any {
    pub fn new(tlv: Tlv) -> Self {
        Self { tlv }
    }

    pub fn tlv(&self) -> &Tlv {
        &self.tlv
    }

    pub fn class(&self) -> Class {
        self.tlv.class
    }

    pub fn tag(&self) -> u32 {
        self.tlv.tag
    }

    pub fn into_tlv(self) -> Tlv {
        self.tlv
    }

    pub(crate) fn write(&self, pdu: &mut Pdu, _opts: &Options) -> Result<usize> {
        pdu.write_tlv(&self.tlv)
    }

    pub(crate) fn read(pdu: &mut Pdu, _opts: &Options) -> Result<Self> {
        pdu.read_tlv().map(Self::new)
    }
}

impl Default for Any {
    fn default() -> Self {
        Self { tlv: Tlv::new(Class::Universal, crate::tag::TAG_NULL, false, Vec::new()) }
    }
}

impl From<Tlv> for Any {
    fn from(tlv: Tlv) -> Self {
        Self::new(tlv)
    }
}

impl fmt::Display for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ANY [{} {}] ({} octets)", self.tlv.class, self.tlv.tag, self.tlv.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::EncodingRule;

    #[test]
    fn survives_unknown_elements() {
        let mut pdu = Pdu::from_bytes(EncodingRule::Ber, vec![0xdf, 0x55, 0x02, 0xab, 0xcd]);
        let any = Any::read(&mut pdu, &Options::default()).unwrap();
        assert_eq!(any.class(), Class::Private);
        assert_eq!(any.tag(), 0x55);
        let mut out = Pdu::new(EncodingRule::Ber);
        any.write(&mut out, &Options::default()).unwrap();
        assert_eq!(out.as_bytes(), [0xdf, 0x55, 0x02, 0xab, 0xcd]);
    }
}
