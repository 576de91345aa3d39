//! The CHOICE engine: named alternative sets, tag↔type descriptors, and
//! dynamic dispatch on both passes.
//!
//! A choices set is registered process-wide under a name and referenced
//! from field metadata (`choices:NAME`). Each alternative binds a
//! concrete type to a (class, tag, explicit) triple; an alternative
//! registered without a tag appears on the wire as its plain universal
//! self. Decoding looks the outer identifier up in the set and
//! synthesizes a fresh concrete value through the type factory registry.

use core::fmt;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::factory::{self, DecodeShape, DynValue};
use crate::options::Options;
use crate::pdu::{EncodingRule, Pdu};
use crate::runtime::{AsnIdentity, Marshal, Unmarshal};
use crate::tag::Class;
use crate::tlv::Tlv;
use crate::types::Null;

#[derive(Debug, Clone)]
struct Alternative {
    tag: u32,
    class: Class,
    explicit: bool,
    /// False when the alternative rides under its own universal tag.
    tagged: bool,
    type_id: TypeId,
    type_label: &'static str,
}

/// A named set of CHOICE alternatives under construction.
#[derive(Debug, Clone, Default)]
pub struct ChoicesBuilder {
    automatic: bool,
    alternatives: Vec<Alternative>,
}

impl ChoicesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables automatic tagging: alternatives registered without a tag
    /// take the next unused context tag, wrapped explicitly.
    pub fn automatic(mut self) -> Self {
        self.automatic = true;
        self
    }

    /// Adds an alternative with defaults: context-specific class and
    /// explicit wrapping when a tag is given.
    pub fn alternative<T>(self, tag: Option<u32>) -> Result<Self>
    where
        T: Marshal + Unmarshal + AsnIdentity + Default + Clone + Any + fmt::Debug + Send + Sync,
    {
        self.alternative_with::<T>(tag, None, None)
    }

    /// Adds an alternative with full control over class and explicitness.
    pub fn alternative_with<T>(
        mut self,
        tag: Option<u32>,
        class: Option<Class>,
        explicit: Option<bool>,
    ) -> Result<Self>
    where
        T: Marshal + Unmarshal + AsnIdentity + Default + Clone + Any + fmt::Debug + Send + Sync,
    {
        factory::register_type::<T>();
        let type_id = TypeId::of::<T>();
        let alt = match tag {
            Some(tag) => Alternative {
                tag,
                class: class.unwrap_or(Class::ContextSpecific),
                explicit: explicit.unwrap_or(true),
                tagged: true,
                type_id,
                type_label: T::TYPE_LABEL,
            },
            None if self.automatic => {
                let next = self
                    .alternatives
                    .iter()
                    .filter(|a| a.tagged && a.class == Class::ContextSpecific)
                    .map(|a| a.tag + 1)
                    .max()
                    .unwrap_or(0);
                Alternative {
                    tag: next,
                    class: Class::ContextSpecific,
                    // automatic allocation always wraps explicitly
                    explicit: true,
                    tagged: true,
                    type_id,
                    type_label: T::TYPE_LABEL,
                }
            }
            None => {
                if self.alternatives.iter().any(|a| !a.tagged && a.type_id == type_id) {
                    return Err(Error::AmbiguousChoice { type_name: T::TYPE_LABEL });
                }
                Alternative {
                    tag: T::NATIVE_TAG,
                    class: Class::Universal,
                    explicit: false,
                    tagged: false,
                    type_id,
                    type_label: T::TYPE_LABEL,
                }
            }
        };
        if self.alternatives.iter().any(|a| a.class == alt.class && a.tag == alt.tag) {
            return Err(Error::DuplicateTag { context: "choices set".to_string(), tag: alt.tag });
        }
        self.alternatives.push(alt);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
struct ChoiceSet {
    alternatives: Vec<Alternative>,
}

impl ChoiceSet {
    fn by_wire(&self, class: Class, tag: u32) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.class == class && a.tag == tag)
    }

    fn by_type(&self, type_id: TypeId) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.type_id == type_id)
    }

    fn by_tag(&self, tag: u32) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.tag == tag)
    }
}

lazy_static! {
    static ref CHOICES: RwLock<HashMap<String, ChoiceSet>> = RwLock::new(HashMap::new());
}

/// Registers a choices set under a name. Duplicate names are an error;
/// an empty set is rejected outright.
pub fn register_choices(name: &str, builder: ChoicesBuilder) -> Result<()> {
    if builder.alternatives.is_empty() {
        return Err(Error::NoChoicesAvailable(name.to_string()));
    }
    let key = name.to_ascii_lowercase();
    let mut registry = CHOICES.write().expect("choices registry poisoned");
    if registry.contains_key(&key) {
        return Err(Error::DuplicateRegistration(key));
    }
    registry.insert(key, ChoiceSet { alternatives: builder.alternatives });
    Ok(())
}

/// [`register_choices`] for module-init call sites that prefer a panic.
pub fn register_choices_or_panic(name: &str, builder: ChoicesBuilder) {
    if let Err(e) = register_choices(name, builder) {
        panic!("choices registration failed: {e}");
    }
}

fn set_for(name: &str) -> Result<ChoiceSet> {
    CHOICES
        .read()
        .expect("choices registry poisoned")
        .get(&name.to_ascii_lowercase())
        .cloned()
        .ok_or_else(|| Error::NoChoicesAvailable(name.to_string()))
}

/// A CHOICE envelope: exactly one concrete alternative value.
pub struct Choice {
    set_name: Option<String>,
    tag_override: Option<u32>,
    value: Box<dyn DynValue>,
}

impl Choice {
    pub fn new<T: DynValue>(value: T) -> Self {
        Self { set_name: None, tag_override: None, value: Box::new(value) }
    }

    /// Pins the envelope to a registered set, for marshalling without a
    /// `choices:` directive in field metadata.
    pub fn for_set<T: DynValue>(name: impl Into<String>, value: T) -> Self {
        Self { set_name: Some(name.into()), tag_override: None, value: Box::new(value) }
    }

    /// Overrides the alternative tag used when marshalling.
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag_override = Some(tag);
        self
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }

    pub fn type_label(&self) -> &'static str {
        self.value.type_label()
    }

    /// The pinned alternative tag, when one was set with [`Choice::with_tag`].
    pub fn tag(&self) -> Option<u32> {
        self.tag_override
    }

    /// The native encoding of the carried value, without choice framing.
    fn native_bytes(&self, rule: EncodingRule, opts: &Options) -> Result<Vec<u8>> {
        let mut inner = Pdu::new(rule);
        self.value.write_native(&mut inner, &opts.child())?;
        Ok(inner.into_bytes())
    }
}

impl Default for Choice {
    fn default() -> Self {
        Self::new(Null)
    }
}

impl Clone for Choice {
    fn clone(&self) -> Self {
        Self {
            set_name: self.set_name.clone(),
            tag_override: self.tag_override,
            value: self.value.clone_box(),
        }
    }
}

impl fmt::Debug for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choice")
            .field("set", &self.set_name)
            .field("value", &self.value)
            .finish()
    }
}

impl PartialEq for Choice {
    fn eq(&self, other: &Self) -> bool {
        if self.value.as_any().type_id() != other.value.as_any().type_id() {
            return false;
        }
        let opts = Options::default();
        match (self.native_bytes(EncodingRule::Ber, &opts), other.native_bytes(EncodingRule::Ber, &opts)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl Marshal for Choice {
    fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
        let name = opts
            .choices
            .as_deref()
            .or(self.set_name.as_deref())
            .ok_or_else(|| Error::NoChoicesAvailable(String::new()))?;
        let set = set_for(name)?;
        let alt = match self.tag_override {
            Some(tag) => set.by_tag(tag).ok_or(Error::NoChoiceForTag(tag))?,
            None => set
                .by_type(self.value.as_any().type_id())
                .ok_or(Error::NoChoiceForType { type_name: self.value.type_label() })?,
        }
        .clone();
        let rule = pdu.rule();
        let native = self.native_bytes(rule, opts)?;
        if !alt.tagged {
            pdu.append(&native);
            return Ok(native.len());
        }
        if alt.explicit {
            pdu.write_tlv(&Tlv::new(alt.class, alt.tag, true, native))
        } else {
            // implicit re-tag: replace the identifier, keep the content
            let mut scratch = Pdu::from_bytes(rule, native);
            let inner = scratch.read_tlv()?;
            pdu.write_tlv(&Tlv::new(alt.class, alt.tag, inner.compound, inner.value))
        }
    }
}

impl Unmarshal for Choice {
    fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self> {
        let name = opts.choices.as_deref().ok_or_else(|| Error::NoChoicesAvailable(String::new()))?;
        let set = set_for(name)?;
        let probe = pdu.peek_tlv()?;
        let alt = set
            .by_wire(probe.class, probe.tag)
            .ok_or(Error::NoChoiceForTag(probe.tag))?
            .clone();
        let tlv = pdu.read_tlv()?;
        let factory = factory::factory_for(alt.type_id)
            .ok_or(Error::NoChoiceForType { type_name: alt.type_label })?;
        let shape = if !alt.tagged {
            DecodeShape::Native
        } else if alt.explicit {
            DecodeShape::ExplicitContent
        } else {
            DecodeShape::Implicit
        };
        let value = factory.decode(&tlv, pdu.rule(), shape)?;
        Ok(Self { set_name: Some(name.to_string()), tag_override: None, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{marshal_with, unmarshal_with};
    use crate::types::{Ia5String, Integer, OctetString};

    fn sample_set() -> ChoicesBuilder {
        ChoicesBuilder::new()
            .alternative::<Integer>(Some(0))
            .unwrap()
            .alternative_with::<OctetString>(Some(1), None, Some(false))
            .unwrap()
    }

    #[test]
    fn explicit_and_implicit_alternatives() {
        register_choices("test-basic", sample_set()).unwrap();
        let opts = Options::parse("choices:test-basic").unwrap();

        let envelope = Choice::new(Integer::from(5));
        let mut pdu = marshal_with(&envelope, EncodingRule::Ber, &opts).unwrap();
        // explicit: constructed context-0 wrapping the native INTEGER
        assert_eq!(pdu.as_bytes(), [0xa0, 0x03, 0x02, 0x01, 0x05]);
        let mut back = Choice::default();
        unmarshal_with(&mut pdu, &mut back, &opts).unwrap();
        assert_eq!(back.downcast_ref::<Integer>(), Some(&Integer(5)));

        let envelope = Choice::new(OctetString::from(b"hi"));
        let mut pdu = marshal_with(&envelope, EncodingRule::Ber, &opts).unwrap();
        // implicit: primitive context-1 with raw content
        assert_eq!(pdu.as_bytes(), [0x81, 0x02, b'h', b'i']);
        let mut back = Choice::default();
        unmarshal_with(&mut pdu, &mut back, &opts).unwrap();
        assert_eq!(back.downcast_ref::<OctetString>(), Some(&OctetString::from(b"hi")));
    }

    #[test]
    fn untagged_alternatives_ride_their_universal_tags() {
        register_choices(
            "test-untagged",
            ChoicesBuilder::new()
                .alternative::<Integer>(None)
                .unwrap()
                .alternative::<Ia5String>(None)
                .unwrap(),
        )
        .unwrap();
        let opts = Options::parse("choices:test-untagged").unwrap();
        let mut pdu = marshal_with(&Choice::new(Integer::from(7)), EncodingRule::Der, &opts).unwrap();
        assert_eq!(pdu.as_bytes(), [0x02, 0x01, 0x07]);
        let mut back = Choice::default();
        unmarshal_with(&mut pdu, &mut back, &opts).unwrap();
        assert_eq!(back.downcast_ref::<Integer>(), Some(&Integer(7)));
    }

    #[test]
    fn automatic_tagging_allocates_in_order() {
        register_choices(
            "test-auto",
            ChoicesBuilder::new()
                .automatic()
                .alternative::<Integer>(None)
                .unwrap()
                .alternative::<OctetString>(None)
                .unwrap()
                .alternative::<Ia5String>(Some(7))
                .unwrap()
                .alternative::<crate::types::Boolean>(None)
                .unwrap(),
        )
        .unwrap();
        let opts = Options::parse("choices:test-auto").unwrap();
        // OctetString was the second registration: automatic tag 1, explicit
        let pdu = marshal_with(&Choice::new(OctetString::from(b"x")), EncodingRule::Ber, &opts).unwrap();
        assert_eq!(pdu.as_bytes(), [0xa1, 0x03, 0x04, 0x01, b'x']);
        // after the supplied tag 7, the next automatic tag is 8
        let pdu =
            marshal_with(&Choice::new(crate::types::Boolean(true)), EncodingRule::Ber, &opts).unwrap();
        assert_eq!(pdu.as_bytes()[0], 0xa8);
    }

    #[test]
    fn registration_failures() {
        // duplicate tag
        let err = ChoicesBuilder::new()
            .alternative::<Integer>(Some(0))
            .unwrap()
            .alternative::<OctetString>(Some(0))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateTag { .. }));

        // the same concrete type twice without tags is ambiguous
        let err = ChoicesBuilder::new()
            .alternative::<Integer>(None)
            .unwrap()
            .alternative::<Integer>(None)
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousChoice { .. }));

        // distinct tags for the same type are fine
        assert!(
            ChoicesBuilder::new()
                .alternative::<Integer>(Some(0))
                .unwrap()
                .alternative::<Integer>(Some(1))
                .is_ok()
        );

        // empty sets and duplicate names are rejected
        assert!(matches!(
            register_choices("test-empty", ChoicesBuilder::new()),
            Err(Error::NoChoicesAvailable(_))
        ));
        register_choices("test-dup", sample_set()).unwrap();
        assert!(matches!(
            register_choices("test-dup", sample_set()),
            Err(Error::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn decode_of_unregistered_tag_fails_in_place() {
        register_choices("test-miss", sample_set()).unwrap();
        let opts = Options::parse("choices:test-miss").unwrap();
        let mut pdu = Pdu::from_bytes(EncodingRule::Ber, vec![0xa5, 0x03, 0x02, 0x01, 0x05]);
        let mut back = Choice::default();
        let err = unmarshal_with(&mut pdu, &mut back, &opts).unwrap_err();
        assert!(matches!(err, Error::NoChoiceForTag(5)));
        assert_eq!(pdu.offset(), 0);
    }

    #[test]
    fn marshal_without_set_fails() {
        let envelope = Choice::new(Integer::from(1));
        let err = marshal_with(&envelope, EncodingRule::Ber, &Options::default()).unwrap_err();
        assert!(matches!(err, Error::NoChoicesAvailable(_)));
    }
}
