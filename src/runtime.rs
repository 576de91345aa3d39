//! The top-level drivers and the marshal/unmarshal dispatch traits.
//!
//! Dispatch order mirrors the value's shape: CHOICE envelopes go through
//! the choice engine, the primitive family through the shared framing
//! path, host primitives through the adapter registry, and structs and
//! collections through the SEQUENCE/SET engine. All of those surfaces
//! implement the two traits below, so the drivers reduce to option
//! validation plus one virtual call.

use crate::error::{Error, Result};
use crate::options::Options;
use crate::pdu::{EncodingRule, Pdu};
use crate::types::{
    Any, AsnTime, BitString, BmpString, Boolean, Date, DateTime, Duration, Enumerated,
    GeneralString, GeneralizedTime, GraphicString, Ia5String, Integer, Null, NumericString,
    ObjectDescriptor, ObjectIdentifier, OctetString, PrintableString, Real, RelativeOid, T61String,
    TimeOfDay, UniversalString, UtcTime, Utf8String, VideotexString, VisibleString,
};

/// Values that can be encoded into a PDU.
pub trait Marshal {
    fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize>;

    /// False only for absent optionals (`Option::None`).
    fn is_present(&self) -> bool {
        true
    }

    /// The `omit-empty` notion of emptiness for this value.
    fn is_empty_value(&self) -> bool {
        false
    }

    /// Encodes the declared fields without the outer wrapper, for
    /// `components-of` inlining. Only structural values support this.
    fn marshal_fields_inline(&self, rule: EncodingRule, opts: &Options) -> Result<Vec<u8>> {
        let _ = (rule, opts);
        Err(Error::AnonymousExpected)
    }
}

/// Values that can be decoded out of a PDU.
pub trait Unmarshal: Sized {
    fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self>;

    /// Decodes in place; composites override this to mutate field by
    /// field so partially-decoded state survives an error.
    fn unmarshal_into(&mut self, pdu: &mut Pdu, opts: &Options) -> Result<()> {
        *self = Self::unmarshal_value(pdu, opts)?;
        Ok(())
    }

    /// Decodes the declared fields without an outer wrapper, for
    /// `components-of` inlining. Only structural values support this.
    fn unmarshal_fields_inline(&mut self, pdu: &mut Pdu, opts: &Options) -> Result<()> {
        let _ = (pdu, opts);
        Err(Error::AnonymousExpected)
    }
}

/// The native universal identity of a value, used when a CHOICE
/// alternative was re-tagged implicitly and the original identifier must
/// be reconstructed.
pub trait AsnIdentity {
    const NATIVE_TAG: u32;
    const NATIVE_COMPOUND: bool;
    const TYPE_LABEL: &'static str;
}

macro_rules! primitive_codec {
    ($($t:ty),+ $(,)?) => {
        $(
            impl Marshal for $t {
                fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
                    crate::types::write_primitive(self, pdu, opts)
                }

                fn is_empty_value(&self) -> bool {
                    <$t as crate::types::AsnType>::is_empty(self)
                }
            }

            impl Unmarshal for $t {
                fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self> {
                    crate::types::read_primitive(pdu, opts)
                }
            }

            impl AsnIdentity for $t {
                const NATIVE_TAG: u32 = <$t as crate::types::AsnType>::TAG;
                const NATIVE_COMPOUND: bool = false;
                const TYPE_LABEL: &'static str = <$t as crate::types::AsnType>::NAME;
            }
        )+
    };
}

primitive_codec!(
    Boolean,
    Integer,
    Enumerated,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    RelativeOid,
    Real,
    Utf8String,
    NumericString,
    PrintableString,
    T61String,
    VideotexString,
    Ia5String,
    GraphicString,
    VisibleString,
    GeneralString,
    ObjectDescriptor,
    BmpString,
    UniversalString,
    UtcTime,
    GeneralizedTime,
    Date,
    TimeOfDay,
    DateTime,
    AsnTime,
    Duration,
);

impl Marshal for Any {
    fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
        self.write(pdu, opts)
    }
}

impl Unmarshal for Any {
    fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self> {
        Any::read(pdu, opts)
    }
}

impl<T: Marshal> Marshal for Option<T> {
    fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
        match self {
            Some(value) => value.marshal_value(pdu, opts),
            None => Err(Error::NilValue),
        }
    }

    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn is_empty_value(&self) -> bool {
        self.as_ref().is_none_or(Marshal::is_empty_value)
    }
}

impl<T: Unmarshal> Unmarshal for Option<T> {
    fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self> {
        T::unmarshal_value(pdu, opts).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Encodes a value under BER with default options.
pub fn marshal<T: Marshal>(value: &T) -> Result<Pdu> {
    marshal_with(value, EncodingRule::default(), &Options::default())
}

/// Encodes a value under the given rule and options. The returned PDU's
/// cursor is rewound, ready for a decode pass.
pub fn marshal_with<T: Marshal>(value: &T, rule: EncodingRule, opts: &Options) -> Result<Pdu> {
    opts.validate(rule)?;
    let mut pdu = Pdu::new(rule);
    value.marshal_value(&mut pdu, opts)?;
    pdu.reset();
    Ok(pdu)
}

/// [`marshal`] for call sites that prefer a panic over a `Result`.
pub fn must_marshal<T: Marshal>(value: &T) -> Pdu {
    marshal(value).unwrap_or_else(|e| panic!("marshal failed: {e}"))
}

/// Decodes a PDU into `dest` with default options. On failure `dest` may
/// hold partially-decoded state.
pub fn unmarshal<T: Unmarshal>(pdu: &mut Pdu, dest: &mut T) -> Result<()> {
    unmarshal_with(pdu, dest, &Options::default())
}

/// Decodes a PDU into `dest` under explicit options. The cursor is
/// rewound first, so a freshly-marshaled PDU decodes without ceremony.
pub fn unmarshal_with<T: Unmarshal>(pdu: &mut Pdu, dest: &mut T, opts: &Options) -> Result<()> {
    opts.validate(pdu.rule())?;
    pdu.reset();
    dest.unmarshal_into(pdu, opts)
}

/// [`unmarshal`] for call sites that prefer a panic over a `Result`.
pub fn must_unmarshal<T: Unmarshal>(pdu: &mut Pdu, dest: &mut T) {
    if let Err(e) = unmarshal(pdu, dest) {
        panic!("unmarshal failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_rewinds_the_cursor() {
        let pdu = marshal(&Integer::from(300)).unwrap();
        assert_eq!(pdu.offset(), 0);
        assert_eq!(pdu.as_bytes(), [0x02, 0x02, 0x01, 0x2c]);
    }

    #[test]
    fn unmarshal_round_trip() {
        let mut pdu = marshal(&PrintableString::must_new("hi", &[])).unwrap();
        let mut back = PrintableString::default();
        unmarshal(&mut pdu, &mut back).unwrap();
        assert_eq!(back.as_str(), "hi");
    }

    #[test]
    fn absent_required_value() {
        let value: Option<Integer> = None;
        assert!(matches!(marshal(&value), Err(Error::NilValue)));
        assert!(marshal(&Some(Integer::from(1))).is_ok());
    }

    #[test]
    fn indefinite_option_needs_ber() {
        let opts = Options::parse("indefinite").unwrap();
        let err = marshal_with(&Null, EncodingRule::Der, &opts).unwrap_err();
        assert!(matches!(err, Error::OptionIncompatibleWithRule { .. }));
    }

    #[test]
    #[should_panic(expected = "marshal failed")]
    fn must_marshal_panics() {
        let value: Option<Integer> = None;
        let _ = must_marshal(&value);
    }
}
