//! The adapter registry: host primitives in and out of the codec.
//!
//! An adapter binds a host type and an optional keyword to a primitive
//! codec plus converters in both directions, so a `String` or an `i64`
//! round-trips without being wrapped in its ASN.1 value type first. The
//! empty keyword is the host type's default; `identifier:KEYWORD` in
//! field metadata selects an alternate, e.g. `identifier:printable` to
//! carry a `String` as a PrintableString.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::pdu::Pdu;
use crate::runtime::{AsnIdentity, Marshal, Unmarshal};
use crate::types::{
    AsnTime, AsnType, BmpString, Boolean, Date, DateTime, Duration, GeneralString,
    GeneralizedTime, GraphicString, Ia5String, Integer, NumericString, ObjectDescriptor,
    ObjectIdentifier, OctetString, PrintableString, Real, RelativeOid, T61String, TimeOfDay,
    UniversalString, UtcTime, Utf8String, VideotexString, VisibleString,
};

#[derive(Clone)]
struct AdapterEntry {
    host: &'static str,
    keyword: String,
    codec: &'static str,
    write: Arc<dyn Fn(&dyn Any, &mut Pdu, &Options) -> Result<usize> + Send + Sync>,
    read: Arc<dyn Fn(&mut Pdu, &Options) -> Result<Box<dyn Any>> + Send + Sync>,
}

/// One row of the adapter listing: (host type, keyword, codec identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub host: &'static str,
    pub keyword: String,
    pub codec: &'static str,
}

fn make_entry<H, T, F, G>(keyword: &str, to_asn: F, from_asn: G) -> AdapterEntry
where
    H: Any,
    T: AsnType + Marshal + Unmarshal,
    F: Fn(&H) -> Result<T> + Send + Sync + 'static,
    G: Fn(T) -> Result<H> + Send + Sync + 'static,
{
    AdapterEntry {
        host: type_name::<H>(),
        keyword: keyword.to_string(),
        codec: T::NAME,
        write: Arc::new(move |any, pdu, opts| {
            let host = any.downcast_ref::<H>().ok_or(Error::TypeMismatch {
                expected: type_name::<H>(),
                got: "mismatched host value",
            })?;
            to_asn(host)?.marshal_value(pdu, opts)
        }),
        read: Arc::new(move |pdu, opts| {
            let value = T::unmarshal_value(pdu, opts)?;
            Ok(Box::new(from_asn(value)?) as Box<dyn Any>)
        }),
    }
}

type AdapterMap = HashMap<(TypeId, String), AdapterEntry>;

fn add<H, T, F, G>(map: &mut AdapterMap, keyword: &str, to_asn: F, from_asn: G)
where
    H: Any,
    T: AsnType + Marshal + Unmarshal,
    F: Fn(&H) -> Result<T> + Send + Sync + 'static,
    G: Fn(T) -> Result<H> + Send + Sync + 'static,
{
    map.insert((TypeId::of::<H>(), keyword.to_string()), make_entry::<H, T, F, G>(keyword, to_asn, from_asn));
}

fn out_of_range(_: impl Sized) -> Error {
    Error::invalid_content("INTEGER", "value outside the host type range")
}

fn builtins() -> AdapterMap {
    let mut map = AdapterMap::new();

    add::<bool, Boolean, _, _>(&mut map, "", |b| Ok(Boolean(*b)), |v| Ok(v.0));

    macro_rules! int_adapters {
        ($($t:ty),+) => {
            $(
                add::<$t, Integer, _, _>(
                    &mut map,
                    "",
                    |n| Ok(Integer::from(*n)),
                    |v| <$t>::try_from(v.0).map_err(out_of_range),
                );
            )+
        };
    }
    int_adapters!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

    add::<f64, Real, _, _>(&mut map, "", |n| Ok(Real(*n)), |v| Ok(v.0));
    add::<f32, Real, _, _>(&mut map, "", |n| Ok(Real(f64::from(*n))), |v| Ok(v.0 as f32));

    add::<Vec<u8>, OctetString, _, _>(&mut map, "", |b| Ok(OctetString(b.clone())), |v| Ok(v.into_vec()));

    // string family; UTF8String is the default carrier
    add::<String, Utf8String, _, _>(&mut map, "", |s| Utf8String::new(s.clone(), &[]), |v| {
        Ok(v.into_string())
    });
    macro_rules! string_adapters {
        ($($kw:literal => $t:ty),+ $(,)?) => {
            $(
                add::<String, $t, _, _>(
                    &mut map,
                    $kw,
                    |s| <$t>::new(s.clone(), &[]),
                    |v| Ok(v.into_string()),
                );
            )+
        };
    }
    string_adapters!(
        "utf8" => Utf8String,
        "printable" => PrintableString,
        "numeric" => NumericString,
        "ia5" => Ia5String,
        "visible" => VisibleString,
        "graphic" => GraphicString,
        "general" => GeneralString,
        "bmp" => BmpString,
        "universal" => UniversalString,
        "t61" => T61String,
        "videotex" => VideotexString,
        "descriptor" => ObjectDescriptor,
    );
    add::<String, ObjectIdentifier, _, _>(&mut map, "oid", |s| s.parse(), |v| Ok(v.to_string()));
    add::<String, RelativeOid, _, _>(&mut map, "reloid", |s| RelativeOid::try_from(s.as_str()), |v| {
        Ok(v.to_string())
    });
    add::<String, Duration, _, _>(&mut map, "duration", |s| Duration::try_from(s.as_str()), |v| {
        Ok(v.to_string())
    });
    add::<String, AsnTime, _, _>(&mut map, "time", |s| AsnTime::new(s.clone(), &[]), |v| {
        Ok(v.as_str().to_string())
    });

    // the chrono hosts
    add::<chrono::NaiveDate, Date, _, _>(&mut map, "", |d| Ok(Date(*d)), |v| Ok(v.0));
    add::<chrono::NaiveTime, TimeOfDay, _, _>(&mut map, "", |t| Ok(TimeOfDay(*t)), |v| Ok(v.0));
    add::<chrono::NaiveDateTime, DateTime, _, _>(&mut map, "", |dt| Ok(DateTime(*dt)), |v| Ok(v.0));
    add::<chrono::NaiveDateTime, GeneralizedTime, _, _>(
        &mut map,
        "generalized",
        |dt| Ok(GeneralizedTime(dt.and_utc().fixed_offset())),
        |v| Ok(v.0.naive_utc()),
    );
    add::<chrono::NaiveDateTime, UtcTime, _, _>(
        &mut map,
        "utc",
        |dt| Ok(UtcTime(dt.and_utc().fixed_offset())),
        |v| Ok(v.0.naive_utc()),
    );

    map
}

lazy_static! {
    static ref ADAPTERS: RwLock<AdapterMap> = RwLock::new(builtins());
}

/// Registers an adapter for a host type under a keyword (lowercased; the
/// empty keyword makes it the type's default). Duplicate registration of
/// the same (type, keyword) pair is an error.
pub fn register_adapter<H, T, F, G>(keyword: &str, to_asn: F, from_asn: G) -> Result<()>
where
    H: Any,
    T: AsnType + Marshal + Unmarshal,
    F: Fn(&H) -> Result<T> + Send + Sync + 'static,
    G: Fn(T) -> Result<H> + Send + Sync + 'static,
{
    let keyword = keyword.to_ascii_lowercase();
    let mut adapters = ADAPTERS.write().expect("adapter registry poisoned");
    let key = (TypeId::of::<H>(), keyword.clone());
    if adapters.contains_key(&key) {
        return Err(Error::DuplicateRegistration(format!("{}/{keyword}", type_name::<H>())));
    }
    adapters.insert(key, make_entry::<H, T, F, G>(&keyword, to_asn, from_asn));
    Ok(())
}

/// [`register_adapter`] for module-init call sites that prefer a panic.
pub fn register_adapter_or_panic<H, T, F, G>(keyword: &str, to_asn: F, from_asn: G)
where
    H: Any,
    T: AsnType + Marshal + Unmarshal,
    F: Fn(&H) -> Result<T> + Send + Sync + 'static,
    G: Fn(T) -> Result<H> + Send + Sync + 'static,
{
    if let Err(e) = register_adapter::<H, T, F, G>(keyword, to_asn, from_asn) {
        panic!("adapter registration failed: {e}");
    }
}

/// Lists the registered adapters, sorted by host type and keyword.
pub fn registered_adapters() -> Vec<AdapterInfo> {
    let adapters = ADAPTERS.read().expect("adapter registry poisoned");
    let mut rows: Vec<AdapterInfo> = adapters
        .values()
        .map(|entry| AdapterInfo {
            host: entry.host,
            keyword: entry.keyword.clone(),
            codec: entry.codec,
        })
        .collect();
    rows.sort_by(|a, b| (a.host, &a.keyword).cmp(&(b.host, &b.keyword)));
    rows
}

/// Exact (type, keyword) match first, then the type's default adapter.
fn find_entry(host: TypeId, host_name: &'static str, keyword: &str) -> Result<AdapterEntry> {
    let adapters = ADAPTERS.read().expect("adapter registry poisoned");
    if let Some(entry) = adapters.get(&(host, keyword.to_string())) {
        return Ok(entry.clone());
    }
    if !keyword.is_empty() {
        if let Some(entry) = adapters.get(&(host, String::new())) {
            return Ok(entry.clone());
        }
    }
    Err(Error::NoAdapter { type_name: host_name, keyword: keyword.to_string() })
}

pub(crate) fn marshal_host<H: Any>(value: &H, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
    let keyword = opts.identifier.as_deref().unwrap_or_default();
    let entry = find_entry(TypeId::of::<H>(), type_name::<H>(), keyword)?;
    (entry.write)(value, pdu, opts)
}

pub(crate) fn unmarshal_host<H: Any>(pdu: &mut Pdu, opts: &Options) -> Result<H> {
    let keyword = opts.identifier.as_deref().unwrap_or_default();
    let entry = find_entry(TypeId::of::<H>(), type_name::<H>(), keyword)?;
    let boxed = (entry.read)(pdu, opts)?;
    boxed
        .downcast::<H>()
        .map(|host| *host)
        .map_err(|_| Error::TypeMismatch { expected: type_name::<H>(), got: "adapter produced another type" })
}

macro_rules! host_codec {
    ($($t:ty => $codec:ty),+ $(,)?) => {
        $(
            impl Marshal for $t {
                fn marshal_value(&self, pdu: &mut Pdu, opts: &Options) -> Result<usize> {
                    marshal_host(self, pdu, opts)
                }

                fn is_empty_value(&self) -> bool {
                    *self == <$t>::default()
                }
            }

            impl Unmarshal for $t {
                fn unmarshal_value(pdu: &mut Pdu, opts: &Options) -> Result<Self> {
                    unmarshal_host(pdu, opts)
                }
            }

            impl AsnIdentity for $t {
                const NATIVE_TAG: u32 = <$codec as AsnType>::TAG;
                const NATIVE_COMPOUND: bool = false;
                const TYPE_LABEL: &'static str = <$codec as AsnType>::NAME;
            }
        )+
    };
}

host_codec!(
    bool => Boolean,
    i8 => Integer,
    i16 => Integer,
    i32 => Integer,
    i64 => Integer,
    i128 => Integer,
    u8 => Integer,
    u16 => Integer,
    u32 => Integer,
    u64 => Integer,
    f32 => Real,
    f64 => Real,
    String => Utf8String,
    Vec<u8> => OctetString,
    chrono::NaiveDate => Date,
    chrono::NaiveTime => TimeOfDay,
    chrono::NaiveDateTime => DateTime,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::EncodingRule;
    use crate::runtime::{marshal, marshal_with, unmarshal};

    #[test]
    fn default_adapters_round_trip() {
        let mut pdu = marshal(&42i64).unwrap();
        assert_eq!(pdu.as_bytes(), [0x02, 0x01, 0x2a]);
        let mut back = 0i64;
        unmarshal(&mut pdu, &mut back).unwrap();
        assert_eq!(back, 42);

        let mut pdu = marshal(&String::from("hi")).unwrap();
        assert_eq!(pdu.as_bytes(), [0x0c, 0x02, b'h', b'i']);
        let mut back = String::new();
        unmarshal(&mut pdu, &mut back).unwrap();
        assert_eq!(back, "hi");

        let mut pdu = marshal(&vec![0xde_u8, 0xad]).unwrap();
        assert_eq!(pdu.as_bytes(), [0x04, 0x02, 0xde, 0xad]);
        let mut back: Vec<u8> = Vec::new();
        unmarshal(&mut pdu, &mut back).unwrap();
        assert_eq!(back, [0xde, 0xad]);
    }

    #[test]
    fn keyword_selects_alternate_codec() {
        let opts = Options::parse("identifier:printable").unwrap();
        let pdu = marshal_with(&String::from("hi"), EncodingRule::Der, &opts).unwrap();
        assert_eq!(pdu.as_bytes(), [0x13, 0x02, b'h', b'i']);
        // the printable repertoire is enforced on the way in
        assert!(marshal_with(&String::from("no;pe"), EncodingRule::Der, &opts).is_err());
    }

    #[test]
    fn unknown_keyword_falls_back_to_default() {
        let opts = Options::parse("identifier:nosuch").unwrap();
        let pdu = marshal_with(&String::from("hi"), EncodingRule::Der, &opts).unwrap();
        assert_eq!(pdu.as_bytes()[0], 0x0c);
    }

    #[test]
    fn no_adapter_for_unknown_host() {
        struct Exotic;
        let err =
            marshal_host(&Exotic, &mut Pdu::new(EncodingRule::Ber), &Options::default()).unwrap_err();
        assert!(matches!(err, Error::NoAdapter { .. }));
    }

    #[test]
    fn narrowing_decode_is_checked() {
        let mut pdu = marshal(&Integer::from(300)).unwrap();
        let mut dest = 0i8;
        assert!(unmarshal(&mut pdu, &mut dest).is_err());
        pdu.reset();
        let mut dest = 0i16;
        unmarshal(&mut pdu, &mut dest).unwrap();
        assert_eq!(dest, 300);
    }

    #[test]
    fn chrono_hosts() {
        let date = chrono::NaiveDate::from_ymd_opt(2021, 9, 18).unwrap();
        let mut pdu = marshal(&date).unwrap();
        assert_eq!(&pdu.as_bytes()[2..], b"2021-09-18");
        let mut back = chrono::NaiveDate::default();
        unmarshal(&mut pdu, &mut back).unwrap();
        assert_eq!(back, date);
    }

    #[test]
    fn oid_keyword_on_strings() {
        let opts = Options::parse("identifier:oid").unwrap();
        let pdu = marshal_with(&String::from("1.3.6.1.4.1.56521"), EncodingRule::Der, &opts).unwrap();
        assert_eq!(
            pdu.as_bytes(),
            [0x06, 0x08, 0x2b, 0x06, 0x01, 0x04, 0x01, 0x83, 0xb9, 0x49]
        );
    }

    #[test]
    fn introspection_lists_builtins() {
        let rows = registered_adapters();
        assert!(rows.iter().any(|r| r.keyword == "printable" && r.codec == "PrintableString"));
        assert!(rows.iter().any(|r| r.keyword.is_empty() && r.codec == "OCTET STRING"));
        // sorted output
        let mut sorted = rows.clone();
        sorted.sort_by(|a, b| (a.host, &a.keyword).cmp(&(b.host, &b.keyword)));
        assert_eq!(rows, sorted);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        register_adapter::<u64, Real, _, _>("seconds-real", |n| Ok(Real(*n as f64)), |v| Ok(v.0 as u64))
            .unwrap();
        assert!(matches!(
            register_adapter::<u64, Real, _, _>("seconds-real", |n| Ok(Real(*n as f64)), |v| Ok(v.0 as u64)),
            Err(Error::DuplicateRegistration(_))
        ));
    }
}
