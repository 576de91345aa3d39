//! The type factory registry: from a type identity to codec
//! constructors, for the dispatch points where the concrete type is only
//! known at runtime (CHOICE alternatives above all).

use core::fmt;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::pdu::{EncodingRule, Pdu};
use crate::runtime::{AsnIdentity, Marshal, Unmarshal};
use crate::tag::Class;
use crate::tlv::Tlv;

/// A type-erased codec value: anything that can encode itself in its
/// native form and be inspected back out.
pub trait DynValue: Any + fmt::Debug + Send + Sync {
    fn write_native(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize>;
    fn as_any(&self) -> &dyn Any;
    fn type_label(&self) -> &'static str;
    fn clone_box(&self) -> Box<dyn DynValue>;
}

impl<T> DynValue for T
where
    T: Marshal + AsnIdentity + Clone + Any + fmt::Debug + Send + Sync,
{
    fn write_native(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
        self.marshal_value(pdu, opts)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_label(&self) -> &'static str {
        T::TYPE_LABEL
    }

    fn clone_box(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }
}

/// How the wire bytes relate to the concrete type's native encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeShape {
    /// The TLV is the native encoding itself (an untagged alternative).
    Native,
    /// The TLV is an explicit wrapper; its content is the native TLV.
    ExplicitContent,
    /// The identifier was replaced implicitly; the content octets are
    /// native but the identifier must be reconstructed.
    Implicit,
}

type DecodeFn = Arc<dyn Fn(&Tlv, EncodingRule, DecodeShape) -> Result<Box<dyn DynValue>> + Send + Sync>;

/// Constructors for one registered type.
#[derive(Clone)]
pub struct TypeFactory {
    label: &'static str,
    native_tag: u32,
    native_compound: bool,
    new_empty: fn() -> Box<dyn DynValue>,
    decode: DecodeFn,
}

impl TypeFactory {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn native_tag(&self) -> u32 {
        self.native_tag
    }

    /// A fresh default-initialized value of the registered type.
    pub fn new_empty(&self) -> Box<dyn DynValue> {
        (self.new_empty)()
    }

    pub(crate) fn decode(&self, tlv: &Tlv, rule: EncodingRule, shape: DecodeShape) -> Result<Box<dyn DynValue>> {
        (self.decode)(tlv, rule, shape)
    }
}

impl fmt::Debug for TypeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeFactory")
            .field("label", &self.label)
            .field("native_tag", &self.native_tag)
            .finish_non_exhaustive()
    }
}

fn factory_of<T>() -> TypeFactory
where
    T: Marshal + Unmarshal + AsnIdentity + Default + Clone + Any + fmt::Debug + Send + Sync,
{
    TypeFactory {
        label: T::TYPE_LABEL,
        native_tag: T::NATIVE_TAG,
        native_compound: T::NATIVE_COMPOUND,
        new_empty: || Box::new(T::default()),
        decode: Arc::new(|tlv, rule, shape| {
            let bytes = match shape {
                DecodeShape::Native => tlv.encode(rule)?,
                DecodeShape::ExplicitContent => tlv.content().to_vec(),
                DecodeShape::Implicit => {
                    let native = Tlv::new(
                        Class::Universal,
                        T::NATIVE_TAG,
                        T::NATIVE_COMPOUND,
                        tlv.content().to_vec(),
                    );
                    native.encode(rule)?
                }
            };
            let mut pdu = Pdu::from_bytes(rule, bytes);
            let value = T::unmarshal_value(&mut pdu, &Options::default())?;
            if !pdu.at_end() {
                return Err(Error::invalid_content(T::TYPE_LABEL, "trailing data after the value"));
            }
            Ok(Box::new(value) as Box<dyn DynValue>)
        }),
    }
}

fn builtin_factories() -> HashMap<TypeId, TypeFactory> {
    use crate::types::*;

    let mut map = HashMap::new();
    macro_rules! builtin {
        ($($t:ty),+ $(,)?) => {
            $( map.insert(TypeId::of::<$t>(), factory_of::<$t>()); )+
        };
    }
    builtin!(
        Boolean, Integer, Enumerated, BitString, OctetString, Null, ObjectIdentifier, RelativeOid,
        Real, Utf8String, NumericString, PrintableString, T61String, VideotexString, Ia5String,
        GraphicString, VisibleString, GeneralString, ObjectDescriptor, BmpString, UniversalString,
        UtcTime, GeneralizedTime, Date, TimeOfDay, DateTime, AsnTime, Duration,
    );
    map
}

lazy_static! {
    static ref FACTORIES: RwLock<HashMap<TypeId, TypeFactory>> = RwLock::new(builtin_factories());
}

/// Registers (idempotently) the codec constructors for a type, making it
/// reachable from runtime dispatch points such as CHOICE decoding. The
/// primitive family is pre-registered.
pub fn register_type<T>()
where
    T: Marshal + Unmarshal + AsnIdentity + Default + Clone + Any + fmt::Debug + Send + Sync,
{
    let mut factories = FACTORIES.write().expect("type factory registry poisoned");
    factories.entry(TypeId::of::<T>()).or_insert_with(factory_of::<T>);
}

pub(crate) fn factory_for(id: TypeId) -> Option<TypeFactory> {
    FACTORIES.read().expect("type factory registry poisoned").get(&id).cloned()
}
