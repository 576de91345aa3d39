//! An ASN.1 codec library implementing a subset of ITU-T X.680 (abstract
//! syntax) and X.690 (BER/CER/DER transfer syntaxes).
//!
//! The crate converts between in-memory values and tag-length-value byte
//! sequences. Its pieces, leaves first:
//!
//! - [`pdu`]: the byte buffer plus cursor one pass works over, bound to
//!   an [`EncodingRule`]
//! - [`tlv`]: the TLV model and the identifier/length codec
//! - [`types`]: one codec per ASN.1 primitive (INTEGER through
//!   DURATION) behind the [`types::AsnType`] contract
//! - [`constraint`]: composable, phase-aware value predicates and their
//!   process-wide registry
//! - [`adapter`]: host primitives (`i64`, `String`, `Vec<u8>`, chrono
//!   types) bridged onto the primitive codecs
//! - [`choice`] / [`factory`]: named CHOICE alternative sets with
//!   dynamic dispatch on both passes
//! - [`seq`]: the SEQUENCE/SET engine: descriptor-table struct walking,
//!   `SET OF`/`SEQUENCE OF`, registered defaults
//! - [`runtime`]: the `marshal`/`unmarshal` drivers
//!
//! # Example
//!
//! ```
//! use asn1_codec::{marshal, unmarshal, Integer};
//!
//! let mut pdu = marshal(&Integer::from(128)).unwrap();
//! assert_eq!(pdu.as_bytes(), [0x02, 0x02, 0x00, 0x80]);
//!
//! let mut back = Integer::default();
//! unmarshal(&mut pdu, &mut back).unwrap();
//! assert_eq!(back, Integer::from(128));
//! ```
//!
//! Structs map onto SEQUENCE/SET through [`asn_struct!`]/[`asn_set!`],
//! with per-field directives (`tag:N`, `explicit`, `optional`,
//! `default:NAME`, `constraint:NAME`, `choices:NAME`, ...) carried as
//! metadata strings; see [`options::Options`] for the full token set.
//!
//! # Features
//!
//! - `serde`: `Serialize` impls on the primitive value types
//! - `jiff-conversions`: jiff bridges for the time family

pub mod adapter;
pub mod choice;
pub mod constraint;
pub mod error;
pub mod factory;
pub mod options;
pub mod pdu;
pub mod runtime;
pub mod seq;
pub mod tag;
pub mod tlv;
pub mod types;

#[cfg(test)]
mod lib_tests;

pub use adapter::{AdapterInfo, register_adapter, register_adapter_or_panic, registered_adapters};
pub use choice::{Choice, ChoicesBuilder, register_choices, register_choices_or_panic};
pub use constraint::{
    Constraint, ConstraintGroup, Phase, register_constraint, register_constraint_group,
    register_constraint_group_or_panic, register_constraint_or_panic,
};
pub use error::{ConstraintViolation, Error, Result};
pub use factory::{DynValue, TypeFactory, register_type};
pub use options::Options;
pub use pdu::{EncodingRule, Pdu, pool_stats};
pub use runtime::{
    AsnIdentity, Marshal, Unmarshal, marshal, marshal_with, must_marshal, must_unmarshal,
    unmarshal, unmarshal_with,
};
pub use seq::{
    AsnStruct, FieldDescriptor, SequenceOf, SetOf, register_default, register_default_or_panic,
};
pub use tag::Class;
pub use tlv::Tlv;
pub use types::{
    Any, AsnTime, AsnType, BitString, BmpString, Boolean, Date, DateTime, Duration, Enumerated,
    GeneralString, GeneralizedTime, GraphicString, Ia5String, Integer, Null, NumericString,
    ObjectDescriptor, ObjectIdentifier, OctetString, PrintableString, Real, RelativeOid, T61String,
    TimeOfDay, UniversalString, UtcTime, Utf8String, VideotexString, VisibleString,
};
