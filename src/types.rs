//! The primitive type family and the shared TLV framing paths.
//!
//! Each ASN.1 primitive implements [`AsnType`]: a universal tag, a name,
//! and a content codec. The framing around the content octets (identifier
//! and length emission, tag overrides, explicit wrapping, constraint
//! phasing) is common to every primitive and lives here.

pub mod any;
pub mod bitstring;
pub mod boolean;
pub mod duration;
pub mod integer;
pub mod null;
pub mod octetstring;
pub mod oid;
pub mod real;
pub mod strings;
pub mod time;

pub use any::Any;
pub use bitstring::BitString;
pub use boolean::Boolean;
pub use duration::Duration;
pub use integer::{Enumerated, Integer};
pub use null::Null;
pub use octetstring::OctetString;
pub use oid::{ObjectIdentifier, RelativeOid};
pub use real::Real;
pub use strings::{
    BmpString, GeneralString, GraphicString, Ia5String, NumericString, ObjectDescriptor,
    PrintableString, T61String, UniversalString, Utf8String, VideotexString, VisibleString,
};
pub use time::{AsnTime, Date, DateTime, GeneralizedTime, TimeOfDay, UtcTime};

use std::any as stdany;

use crate::constraint::{self, Constraint};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::pdu::{EncodingRule, Pdu};
use crate::tag::{self, Class};
use crate::tlv::Tlv;

/// CER restricts primitive string encodings to 1000 content octets;
/// longer values would require the constructed segmented form.
pub const CER_SEGMENT_CEILING: usize = 1000;

/// One ASN.1 primitive: a universal tag plus a content-octet codec.
pub trait AsnType: Sized + stdany::Any + core::fmt::Debug {
    /// Universal tag number.
    const TAG: u32;
    /// Canonical ASN.1 name, e.g. `"INTEGER"`.
    const NAME: &'static str;

    /// Produces the content octets for this value.
    fn encode_value(&self, rule: EncodingRule) -> Result<Vec<u8>>;

    /// Rebuilds a value from content octets.
    fn decode_value(content: &[u8], rule: EncodingRule) -> Result<Self>;

    /// Raw-content checks run before [`AsnType::decode_value`].
    fn decode_verify(content: &[u8], rule: EncodingRule) -> Result<()> {
        let _ = (content, rule);
        Ok(())
    }

    /// The "empty" notion used by the `omit-empty` directive.
    fn is_empty(&self) -> bool {
        false
    }
}

/// Applies inline constraints at construction time.
pub(crate) fn constrained<T>(value: T, constraints: &[Constraint<T>]) -> Result<T> {
    for constraint in constraints {
        constraint.check(&value)?;
    }
    Ok(value)
}

fn is_string_like(tag: u32) -> bool {
    matches!(
        tag,
        tag::TAG_BIT_STRING
            | tag::TAG_OCTET_STRING
            | tag::TAG_OBJECT_DESCRIPTOR
            | tag::TAG_UTF8_STRING
            | tag::TAG_NUMERIC_STRING
            | tag::TAG_PRINTABLE_STRING
            | tag::TAG_T61_STRING
            | tag::TAG_VIDEOTEX_STRING
            | tag::TAG_IA5_STRING
            | tag::TAG_GRAPHIC_STRING
            | tag::TAG_VISIBLE_STRING
            | tag::TAG_GENERAL_STRING
            | tag::TAG_UNIVERSAL_STRING
            | tag::TAG_BMP_STRING
    )
}

/// Encode path shared by every primitive: encode-phase constraints, the
/// content codec, then identifier/length framing with any tag override.
pub(crate) fn write_primitive<T: AsnType>(value: &T, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
    constraint::apply_registered(&opts.constraints, value, true)?;
    let rule = pdu.rule();
    let content = value.encode_value(rule)?;
    if rule == EncodingRule::Cer && is_string_like(T::TAG) && content.len() > CER_SEGMENT_CEILING {
        return Err(Error::InvalidLength {
            type_name: T::NAME,
            len: content.len(),
            reason: "primitive string exceeds the CER segment ceiling",
        });
    }
    match opts.tag {
        // explicit: constructed wrapper around the untouched native TLV
        Some(tag) if opts.explicit => {
            let inner = Tlv::new(Class::Universal, T::TAG, false, content);
            let wrapped = inner.encode(rule)?;
            pdu.write_tlv(&Tlv::new(opts.override_class(), tag, true, wrapped))
        }
        // implicit: only the identifier changes
        Some(tag) => pdu.write_tlv(&Tlv::new(opts.override_class(), tag, false, content)),
        None => pdu.write_tlv(&Tlv::new(Class::Universal, T::TAG, false, content)),
    }
}

/// Identity expected for a primitive under the given options.
fn expected_identity<T: AsnType>(opts: &Options) -> (Class, u32, bool) {
    match opts.tag {
        Some(tag) => (opts.override_class(), tag, opts.explicit),
        None => (Class::Universal, T::TAG, false),
    }
}

fn check_identity<T: AsnType>(tlv: &Tlv, opts: &Options) -> Result<()> {
    let expected = expected_identity::<T>(opts);
    if tlv.identity() != expected {
        return Err(Error::tag_mismatch(expected, tlv.identity()));
    }
    Ok(())
}

/// Parses exactly one TLV out of an explicit wrapper's content.
fn unwrap_explicit(content: &[u8], rule: EncodingRule) -> Result<Tlv> {
    let mut inner = Pdu::from_bytes(rule, content.to_vec());
    let tlv = inner.read_tlv()?;
    if !inner.at_end() {
        return Err(Error::invalid_content("EXPLICIT", "trailing data after the wrapped value"));
    }
    Ok(tlv)
}

/// Decode path shared by every primitive, applied to an already-read TLV.
pub(crate) fn decode_primitive<T: AsnType>(tlv: &Tlv, rule: EncodingRule, opts: &Options) -> Result<T> {
    check_identity::<T>(tlv, opts)?;
    let inner_tlv;
    let content: &[u8] = if opts.has_override() && opts.explicit {
        inner_tlv = unwrap_explicit(tlv.content(), rule)?;
        let expected = (Class::Universal, T::TAG, false);
        if inner_tlv.identity() != expected {
            return Err(Error::tag_mismatch(expected, inner_tlv.identity()));
        }
        inner_tlv.content()
    } else {
        // Tlv::content strips the 00 00 suffix of a BER indefinite region
        tlv.content()
    };
    T::decode_verify(content, rule)?;
    let value = T::decode_value(content, rule)?;
    constraint::apply_registered(&opts.constraints, &value, false)?;
    Ok(value)
}

/// Reads and decodes one primitive at the cursor. The tag is checked
/// before the cursor moves, so a mismatch leaves the PDU untouched; on
/// success the cursor has advanced by the outer TLV's full length.
pub(crate) fn read_primitive<T: AsnType>(pdu: &mut Pdu, opts: &Options) -> Result<T> {
    let probe = pdu.peek_tlv()?;
    check_identity::<T>(&probe, opts)?;
    let tlv = pdu.read_tlv()?;
    decode_primitive::<T>(&tlv, pdu.rule(), opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_override_changes_identifier_only() {
        let value = Integer::from(5);
        let opts = Options::parse("tag:3").unwrap();
        let mut pdu = Pdu::new(EncodingRule::Der);
        write_primitive(&value, &mut pdu, &opts).unwrap();
        // 0x83 = context-specific primitive 3; content unchanged
        assert_eq!(pdu.as_bytes(), [0x83, 0x01, 0x05]);

        pdu.reset();
        let back: Integer = read_primitive(&mut pdu, &opts).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn explicit_override_wraps_untouched_tlv() {
        let value = Integer::from(5);
        let opts = Options::parse("tag:3,explicit").unwrap();
        let mut pdu = Pdu::new(EncodingRule::Der);
        write_primitive(&value, &mut pdu, &opts).unwrap();
        assert_eq!(pdu.as_bytes(), [0xa3, 0x03, 0x02, 0x01, 0x05]);

        pdu.reset();
        let back: Integer = read_primitive(&mut pdu, &opts).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn tag_mismatch_leaves_cursor_in_place() {
        let mut pdu = Pdu::from_bytes(EncodingRule::Der, vec![0x04, 0x01, 0xff]);
        let opts = Options::default();
        let err = read_primitive::<Integer>(&mut pdu, &opts).unwrap_err();
        assert!(matches!(err, Error::TagMismatch { .. }));
        assert_eq!(pdu.offset(), 0);
    }

    #[test]
    fn ber_indefinite_suffix_is_stripped() {
        // OCTET STRING "hi" under an (irregular) indefinite length
        let mut pdu = Pdu::from_bytes(EncodingRule::Ber, vec![0x04, 0x80, b'h', b'i', 0x00, 0x00]);
        let opts = Options::default();
        let value: OctetString = read_primitive(&mut pdu, &opts).unwrap();
        assert_eq!(value.as_ref(), b"hi");
        assert_eq!(pdu.offset(), 6);
    }

    #[test]
    fn cer_rejects_oversize_primitive_strings() {
        let value = OctetString::from(vec![0u8; CER_SEGMENT_CEILING + 1]);
        let mut pdu = Pdu::new(EncodingRule::Cer);
        let err = write_primitive(&value, &mut pdu, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidLength { .. }));
        // BER and DER have no such ceiling
        let mut pdu = Pdu::new(EncodingRule::Der);
        write_primitive(&value, &mut pdu, &Options::default()).unwrap();
    }
}
