//! The SEQUENCE/SET engine: descriptor-table struct walking, the
//! homogeneous collections, and the registered-defaults store.
//!
//! A struct participates by implementing [`AsnStruct`], normally through
//! the [`asn_struct!`]/[`asn_set!`] macros which build the field
//! descriptor table at compile time. The engine walks that table in
//! declaration order: encode resolves each field's metadata into
//! [`Options`], applies the skip rules (absent, default, omit-empty),
//! and concatenates the field encodings into the constructed wrapper;
//! decode mirrors the walk, with SET structs additionally accepting
//! their components in any wire order.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::pdu::{EncodingRule, Pdu};
use crate::runtime::{AsnIdentity, Marshal, Unmarshal};
use crate::tag::{Class, TAG_SEQUENCE, TAG_SET};
use crate::tlv::Tlv;

/// One field of a composite type: accessors plus its metadata string.
pub struct FieldDescriptor<S: 'static> {
    pub name: &'static str,
    pub meta: &'static str,
    pub write: fn(&S, &mut Pdu, &Options) -> Result<usize>,
    pub write_inline: fn(&S, EncodingRule, &Options) -> Result<Vec<u8>>,
    pub read: fn(&mut S, &mut Pdu, &Options) -> Result<()>,
    pub read_inline: fn(&mut S, &mut Pdu, &Options) -> Result<()>,
    pub present: fn(&S) -> bool,
    pub empty: fn(&S) -> bool,
    pub as_any: fn(&S) -> &dyn Any,
    pub as_any_mut: fn(&mut S) -> &mut dyn Any,
}

/// A struct with a compile-time field descriptor table.
pub trait AsnStruct: Default + 'static {
    const NAME: &'static str;
    /// Struct-level metadata (outer tag override, `automatic`, ...).
    const META: &'static str = "";
    /// True for SET semantics (tag 17, sorted under DER).
    const SET: bool = false;

    fn descriptors() -> &'static [FieldDescriptor<Self>];
}

// ---------------------------------------------------------------------------
// Registered default values
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct DefaultEntry {
    type_label: &'static str,
    matches: Arc<dyn Fn(&dyn Any) -> Option<bool> + Send + Sync>,
    assign: Arc<dyn Fn(&mut dyn Any) -> bool + Send + Sync>,
}

lazy_static! {
    static ref DEFAULTS: RwLock<HashMap<String, DefaultEntry>> = RwLock::new(HashMap::new());
}

/// Registers a named default value, referenced from field metadata as
/// `default:NAME`. A field equal to its default is skipped on encode and
/// restored on decode when absent.
pub fn register_default<T>(name: &str, value: T) -> Result<()>
where
    T: Any + Clone + PartialEq + Send + Sync,
{
    let key = name.to_ascii_lowercase();
    let mut registry = DEFAULTS.write().expect("defaults registry poisoned");
    if registry.contains_key(&key) {
        return Err(Error::DuplicateRegistration(key));
    }
    let anchor = value.clone();
    registry.insert(
        key,
        DefaultEntry {
            type_label: std::any::type_name::<T>(),
            matches: Arc::new(move |any| any.downcast_ref::<T>().map(|v| *v == anchor)),
            assign: Arc::new(move |any| {
                if let Some(slot) = any.downcast_mut::<T>() {
                    *slot = value.clone();
                    true
                } else {
                    false
                }
            }),
        },
    );
    Ok(())
}

/// [`register_default`] for module-init call sites that prefer a panic.
pub fn register_default_or_panic<T>(name: &str, value: T)
where
    T: Any + Clone + PartialEq + Send + Sync,
{
    if let Err(e) = register_default(name, value) {
        panic!("default registration failed: {e}");
    }
}

fn default_entry(name: &str) -> Result<DefaultEntry> {
    DEFAULTS
        .read()
        .expect("defaults registry poisoned")
        .get(&name.to_ascii_lowercase())
        .cloned()
        .ok_or_else(|| Error::UnknownOption(format!("default:{name}")))
}

fn default_matches(name: &str, value: &dyn Any) -> Result<bool> {
    let entry = default_entry(name)?;
    (entry.matches)(value).ok_or(Error::TypeMismatch {
        expected: entry.type_label,
        got: "mismatched field type",
    })
}

fn default_assign(name: &str, dest: &mut dyn Any) -> Result<()> {
    let entry = default_entry(name)?;
    if (entry.assign)(dest) {
        Ok(())
    } else {
        Err(Error::TypeMismatch { expected: entry.type_label, got: "mismatched field type" })
    }
}

// ---------------------------------------------------------------------------
// Constructed framing shared by structs and collections
// ---------------------------------------------------------------------------

/// Wraps already-encoded content in the constructed outer TLV, honoring
/// tag/class overrides, explicit wrapping and BER indefinite emission.
pub(crate) fn write_constructed(
    pdu: &mut Pdu,
    opts: &Options,
    native_tag: u32,
    content: Vec<u8>,
    indefinite: bool,
) -> Result<usize> {
    let rule = pdu.rule();
    if indefinite && !rule.allows_indefinite() {
        return Err(Error::OptionIncompatibleWithRule { option: "indefinite", rule });
    }
    let native = |content: Vec<u8>| {
        if indefinite {
            Tlv::indefinite(Class::Universal, native_tag, content)
        } else {
            Tlv::new(Class::Universal, native_tag, true, content)
        }
    };
    match opts.tag {
        Some(tag) if opts.explicit => {
            let wrapped = native(content).encode(rule)?;
            pdu.write_tlv(&Tlv::new(opts.override_class(), tag, true, wrapped))
        }
        Some(tag) => {
            let tlv = if indefinite {
                Tlv::indefinite(opts.override_class(), tag, content)
            } else {
                Tlv::new(opts.override_class(), tag, true, content)
            };
            pdu.write_tlv(&tlv)
        }
        None => pdu.write_tlv(&native(content)),
    }
}

/// Reads the constructed outer TLV for a composite, validating identity
/// before the cursor moves, and returns the content region.
pub(crate) fn read_constructed(pdu: &mut Pdu, opts: &Options, native_tag: u32) -> Result<Vec<u8>> {
    let probe = pdu.peek_tlv()?;
    let expected = match opts.tag {
        Some(tag) => (opts.override_class(), tag, true),
        None => (Class::Universal, native_tag, true),
    };
    if probe.identity() != expected {
        return Err(Error::tag_mismatch(expected, probe.identity()));
    }
    let tlv = pdu.read_tlv()?;
    if opts.has_override() && opts.explicit {
        let mut inner = Pdu::from_bytes(pdu.rule(), tlv.content().to_vec());
        let unwrapped = inner.read_tlv()?;
        inner.skip_eoc();
        if !inner.remaining().is_empty() {
            return Err(Error::invalid_content("EXPLICIT", "trailing data after the wrapped value"));
        }
        let inner_expected = (Class::Universal, native_tag, true);
        if unwrapped.identity() != inner_expected {
            return Err(Error::tag_mismatch(inner_expected, unwrapped.identity()));
        }
        Ok(unwrapped.content().to_vec())
    } else {
        Ok(tlv.content().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Struct walk: encode
// ---------------------------------------------------------------------------

fn field_options(meta: &str, name: &'static str, index: usize, walk: &Options) -> Result<Options> {
    let mut fopts = Options::parse(meta).map_err(|e| e.in_field(name))?;
    fopts.depth = walk.depth + 1;
    // automatic tagging: fields without a tag take their ordinal as a
    // context tag; CHOICE fields keep their own dispatch
    if walk.automatic && fopts.tag.is_none() && fopts.choices.is_none() {
        fopts.tag = Some(index as u32);
        fopts.class = Some(Class::ContextSpecific);
    }
    Ok(fopts)
}

/// Encodes the declared fields in order, without the outer wrapper.
pub fn encode_fields<S: AsnStruct>(value: &S, rule: EncodingRule, walk: &Options) -> Result<Vec<u8>> {
    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(S::descriptors().len());
    for (index, field) in S::descriptors().iter().enumerate() {
        let fopts = field_options(field.meta, field.name, index, walk)?;
        if fopts.absent {
            continue;
        }
        if fopts.components_of {
            let inline = (field.write_inline)(value, rule, &fopts).map_err(|e| e.in_field(field.name))?;
            parts.push(inline);
            continue;
        }
        if !(field.present)(value) {
            if fopts.optional || fopts.default_value.is_some() {
                continue;
            }
            return Err(Error::MissingRequiredField(field.name));
        }
        if let Some(default_name) = &fopts.default_value {
            if default_matches(default_name, (field.as_any)(value)).map_err(|e| e.in_field(field.name))? {
                continue;
            }
        }
        if fopts.omit_empty && (field.empty)(value) {
            continue;
        }
        let mut child = Pdu::new(rule);
        (field.write)(value, &mut child, &fopts).map_err(|e| e.in_field(field.name))?;
        parts.push(child.into_bytes());
    }
    if S::SET && rule == EncodingRule::Der {
        // canonical component order, keyed by the leading identifier octets
        parts.sort();
    }
    Ok(parts.concat())
}

/// Encodes a struct with its outer SEQUENCE/SET wrapper.
pub fn marshal_struct<S: AsnStruct>(value: &S, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
    let (eff, walk, indefinite) = resolve_struct_options::<S>(opts)?;
    let content = encode_fields(value, pdu.rule(), &walk)?;
    let native_tag = if S::SET { TAG_SET } else { TAG_SEQUENCE };
    write_constructed(pdu, &eff, native_tag, content, indefinite)
}

/// Merges struct-level metadata with the caller's field-level options;
/// the caller wins where both speak.
fn resolve_struct_options<S: AsnStruct>(opts: &Options) -> Result<(Options, Options, bool)> {
    let struct_opts = Options::parse(S::META)?;
    let mut eff = opts.clone();
    if eff.tag.is_none() {
        eff.tag = struct_opts.tag;
        if eff.class.is_none() {
            eff.class = struct_opts.class;
        }
        eff.explicit |= struct_opts.explicit;
    }
    let automatic = opts.automatic || struct_opts.automatic;
    let indefinite = opts.indefinite || struct_opts.indefinite;
    let walk = Options { automatic, depth: opts.depth, ..Options::default() };
    Ok((eff, walk, indefinite))
}

// ---------------------------------------------------------------------------
// Struct walk: decode
// ---------------------------------------------------------------------------

fn handle_absent<S: AsnStruct>(dest: &mut S, field: &FieldDescriptor<S>, fopts: &Options) -> Result<()> {
    if let Some(default_name) = &fopts.default_value {
        return default_assign(default_name, (field.as_any_mut)(dest)).map_err(|e| e.in_field(field.name));
    }
    if fopts.optional {
        return Ok(());
    }
    Err(Error::MissingRequiredField(field.name))
}

/// Decodes the declared fields in order from an already-unwrapped
/// content region. Used for SEQUENCE bodies and `components-of`.
pub fn decode_fields_in_order<S: AsnStruct>(dest: &mut S, pdu: &mut Pdu, walk: &Options) -> Result<()> {
    for (index, field) in S::descriptors().iter().enumerate() {
        let fopts = field_options(field.meta, field.name, index, walk)?;
        if fopts.absent {
            continue;
        }
        if fopts.components_of {
            (field.read_inline)(dest, pdu, &fopts).map_err(|e| e.in_field(field.name))?;
            continue;
        }
        if pdu.at_end() {
            handle_absent(dest, field, &fopts)?;
            continue;
        }
        let before = pdu.offset();
        match (field.read)(dest, pdu, &fopts) {
            Ok(()) => {}
            Err(_) if pdu.offset() == before && (fopts.optional || fopts.default_value.is_some()) => {
                handle_absent(dest, field, &fopts)?;
            }
            Err(e) => return Err(e.in_field(field.name)),
        }
    }
    Ok(())
}

/// Decodes SET components in whatever order the wire presents them:
/// every element is tried against every still-unfilled field.
fn decode_fields_any_order<S: AsnStruct>(dest: &mut S, pdu: &mut Pdu, walk: &Options) -> Result<()> {
    let rule = pdu.rule();
    let mut elements: Vec<Vec<u8>> = Vec::new();
    while !pdu.at_end() {
        let before = pdu.offset();
        pdu.read_tlv()?;
        elements.push(pdu.as_bytes()[before..pdu.offset()].to_vec());
    }
    let mut used = vec![false; elements.len()];
    for (index, field) in S::descriptors().iter().enumerate() {
        let fopts = field_options(field.meta, field.name, index, walk)?;
        if fopts.absent || fopts.components_of {
            continue;
        }
        let mut found = false;
        for (slot, element) in elements.iter().enumerate() {
            if used[slot] {
                continue;
            }
            let mut probe = Pdu::from_bytes(rule, element.clone());
            if (field.read)(dest, &mut probe, &fopts).is_ok() && probe.at_end() {
                used[slot] = true;
                found = true;
                break;
            }
        }
        if !found {
            handle_absent(dest, field, &fopts)?;
        }
    }
    if used.iter().any(|u| !u) {
        return Err(Error::invalid_content(S::NAME, "unexpected component in SET"));
    }
    Ok(())
}

/// Decodes a struct including its outer SEQUENCE/SET wrapper.
pub fn unmarshal_struct<S: AsnStruct>(dest: &mut S, pdu: &mut Pdu, opts: &Options) -> Result<()> {
    let (eff, walk, _) = resolve_struct_options::<S>(opts)?;
    let native_tag = if S::SET { TAG_SET } else { TAG_SEQUENCE };
    let content = read_constructed(pdu, &eff, native_tag)?;
    let mut body = Pdu::from_bytes(pdu.rule(), content);
    if S::SET {
        decode_fields_any_order(dest, &mut body, &walk)?;
    } else {
        decode_fields_in_order(dest, &mut body, &walk)?;
        body.skip_eoc();
        if !body.remaining().is_empty() {
            return Err(Error::invalid_content(S::NAME, "trailing data after the last component"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SET OF and SEQUENCE OF
// ---------------------------------------------------------------------------

macro_rules! collection_type {
    ($(#[$doc:meta])* $name:ident, $default_set:expr, $native_tag:expr, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name<T>(pub Vec<T>);

        impl<T> $name<T> {
            pub fn new() -> Self {
                Self(Vec::new())
            }

            pub fn into_vec(self) -> Vec<T> {
                self.0
            }
        }

        impl<T> From<Vec<T>> for $name<T> {
            fn from(items: Vec<T>) -> Self {
                Self(items)
            }
        }

        impl<T> FromIterator<T> for $name<T> {
            fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
                Self(iter.into_iter().collect())
            }
        }

        impl<T> core::ops::Deref for $name<T> {
            type Target = Vec<T>;

            fn deref(&self) -> &Vec<T> {
                &self.0
            }
        }

        impl<T> core::ops::DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut Vec<T> {
                &mut self.0
            }
        }

        impl<T: Marshal> Marshal for $name<T> {
            fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
                write_collection(&self.0, pdu, opts, $default_set)
            }

            fn is_empty_value(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl<T: Unmarshal> Unmarshal for $name<T> {
            fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self> {
                read_collection(pdu, opts, $default_set).map(Self)
            }
        }

        impl<T: 'static> AsnIdentity for $name<T> {
            const NATIVE_TAG: u32 = $native_tag;
            const NATIVE_COMPOUND: bool = true;
            const TYPE_LABEL: &'static str = $label;
        }
    };
}

collection_type!(
    /// A homogeneous unordered collection (universal tag 17). Under DER
    /// the element encodings are sorted bytewise on the wire.
    SetOf, true, TAG_SET, "SET OF"
);
collection_type!(
    /// A homogeneous ordered collection (universal tag 16); element
    /// order is preserved on the wire.
    SequenceOf, false, TAG_SEQUENCE, "SEQUENCE OF"
);

fn write_collection<T: Marshal>(items: &[T], pdu: &mut Pdu, opts: &Options, default_set: bool) -> Result<usize> {
    let rule = pdu.rule();
    let as_set = if opts.sequence { false } else { default_set };
    let element_opts = opts.child();
    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(items.len());
    for item in items {
        let mut child = Pdu::new(rule);
        item.marshal_value(&mut child, &element_opts)?;
        parts.push(child.into_bytes());
    }
    if as_set && rule == EncodingRule::Der {
        parts.sort();
    }
    let native_tag = if as_set { TAG_SET } else { TAG_SEQUENCE };
    write_constructed(pdu, opts, native_tag, parts.concat(), opts.indefinite)
}

fn read_collection<T: Unmarshal>(pdu: &mut Pdu, opts: &Options, default_set: bool) -> Result<Vec<T>> {
    let rule = pdu.rule();
    let as_set = if opts.sequence { false } else { default_set };
    let native_tag = if as_set { TAG_SET } else { TAG_SEQUENCE };
    let content = read_constructed(pdu, opts, native_tag)?;
    let mut body = Pdu::from_bytes(rule, content);
    let element_opts = opts.child();
    let mut items = Vec::new();
    let mut previous: Option<Vec<u8>> = None;
    while !body.at_end() {
        let before = body.offset();
        items.push(T::unmarshal_value(&mut body, &element_opts)?);
        if as_set && rule == EncodingRule::Der {
            let encoded = body.as_bytes()[before..body.offset()].to_vec();
            if previous.as_ref().is_some_and(|prev| *prev > encoded) {
                return Err(Error::invalid_content("SET OF", "elements not in canonical order"));
            }
            previous = Some(encoded);
        }
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Composite declaration macros
// ---------------------------------------------------------------------------

/// Declares a SEQUENCE struct with per-field metadata:
///
/// ```ignore
/// asn_struct! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct AlgorithmIdentifier {
///         algorithm: ObjectIdentifier => "",
///         parameters: Option<Any> => "optional",
///     }
/// }
/// ```
///
/// A struct-level metadata string may follow the name
/// (`pub struct Pdv: "class:application,tag:11" { ... }`). Deriving
/// `Default` is required; fields become `pub`.
#[macro_export]
macro_rules! asn_struct {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident $(: $smeta:literal)? {
            $( $fname:ident : $ftype:ty => $fmeta:literal ),+ $(,)?
        }
    ) => {
        $crate::__asn_composite! {
            @set false;
            $(#[$attr])* $vis struct $name $(: $smeta)? { $( $fname : $ftype => $fmeta ),+ }
        }
    };
}

/// [`asn_struct!`] with SET semantics (universal tag 17; components
/// sorted under DER, accepted in any order on decode).
#[macro_export]
macro_rules! asn_set {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident $(: $smeta:literal)? {
            $( $fname:ident : $ftype:ty => $fmeta:literal ),+ $(,)?
        }
    ) => {
        $crate::__asn_composite! {
            @set true;
            $(#[$attr])* $vis struct $name $(: $smeta)? { $( $fname : $ftype => $fmeta ),+ }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __asn_meta {
    () => {
        ""
    };
    ($meta:literal) => {
        $meta
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __asn_composite {
    (
        @set $is_set:expr;
        $(#[$attr:meta])*
        $vis:vis struct $name:ident $(: $smeta:literal)? {
            $( $fname:ident : $ftype:ty => $fmeta:literal ),+
        }
    ) => {
        $(#[$attr])*
        $vis struct $name {
            $( pub $fname : $ftype, )+
        }

        impl $crate::seq::AsnStruct for $name {
            const NAME: &'static str = stringify!($name);
            const META: &'static str = $crate::__asn_meta!($($smeta)?);
            const SET: bool = $is_set;

            fn descriptors() -> &'static [$crate::seq::FieldDescriptor<Self>] {
                const FIELDS: &[$crate::seq::FieldDescriptor<$name>] = &[
                    $(
                        $crate::seq::FieldDescriptor {
                            name: stringify!($fname),
                            meta: $fmeta,
                            write: |s, pdu, opts| {
                                $crate::runtime::Marshal::marshal_value(&s.$fname, pdu, opts)
                            },
                            write_inline: |s, rule, opts| {
                                $crate::runtime::Marshal::marshal_fields_inline(&s.$fname, rule, opts)
                            },
                            read: |s, pdu, opts| {
                                $crate::runtime::Unmarshal::unmarshal_into(&mut s.$fname, pdu, opts)
                            },
                            read_inline: |s, pdu, opts| {
                                $crate::runtime::Unmarshal::unmarshal_fields_inline(&mut s.$fname, pdu, opts)
                            },
                            present: |s| $crate::runtime::Marshal::is_present(&s.$fname),
                            empty: |s| $crate::runtime::Marshal::is_empty_value(&s.$fname),
                            as_any: |s| &s.$fname,
                            as_any_mut: |s| &mut s.$fname,
                        },
                    )+
                ];
                FIELDS
            }
        }

        impl $crate::runtime::Marshal for $name {
            fn marshal_value(
                &self,
                pdu: &mut $crate::pdu::Pdu,
                opts: &$crate::options::Options,
            ) -> $crate::error::Result<usize> {
                $crate::seq::marshal_struct(self, pdu, opts)
            }

            fn marshal_fields_inline(
                &self,
                rule: $crate::pdu::EncodingRule,
                opts: &$crate::options::Options,
            ) -> $crate::error::Result<::std::vec::Vec<u8>> {
                $crate::seq::encode_fields(self, rule, opts)
            }
        }

        impl $crate::runtime::Unmarshal for $name {
            fn unmarshal_value(
                pdu: &mut $crate::pdu::Pdu,
                opts: &$crate::options::Options,
            ) -> $crate::error::Result<Self> {
                let mut value = <$name as ::core::default::Default>::default();
                $crate::seq::unmarshal_struct(&mut value, pdu, opts)?;
                Ok(value)
            }

            fn unmarshal_into(
                &mut self,
                pdu: &mut $crate::pdu::Pdu,
                opts: &$crate::options::Options,
            ) -> $crate::error::Result<()> {
                $crate::seq::unmarshal_struct(self, pdu, opts)
            }

            fn unmarshal_fields_inline(
                &mut self,
                pdu: &mut $crate::pdu::Pdu,
                opts: &$crate::options::Options,
            ) -> $crate::error::Result<()> {
                $crate::seq::decode_fields_in_order(self, pdu, opts)
            }
        }

        impl $crate::runtime::AsnIdentity for $name {
            const NATIVE_TAG: u32 = if $is_set { 17 } else { 16 };
            const NATIVE_COMPOUND: bool = true;
            const TYPE_LABEL: &'static str = stringify!($name);
        }
    };
}
