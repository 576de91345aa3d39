//! Cross-module scenarios exercised end to end through the public
//! drivers: wire vectors, canonicality, tagging and dispatch.

use crate::constraint::{self, Phase};
use crate::options::Options;
use crate::pdu::{EncodingRule, Pdu};
use crate::runtime::{marshal, marshal_with, unmarshal, unmarshal_with};
use crate::types::*;
use crate::{Choice, ChoicesBuilder, SetOf, register_choices};

const ALL_RULES: [EncodingRule; 3] = [EncodingRule::Ber, EncodingRule::Cer, EncodingRule::Der];

fn wire<T: crate::Marshal>(value: &T, rule: EncodingRule) -> Vec<u8> {
    marshal_with(value, rule, &Options::default()).unwrap().into_bytes()
}

#[test]
fn integer_wire_vectors() {
    assert_eq!(wire(&Integer(0), EncodingRule::Der), [0x02, 0x01, 0x00]);
    assert_eq!(wire(&Integer(127), EncodingRule::Der), [0x02, 0x01, 0x7f]);
    assert_eq!(wire(&Integer(128), EncodingRule::Der), [0x02, 0x02, 0x00, 0x80]);
    assert_eq!(wire(&Integer(-1), EncodingRule::Der), [0x02, 0x01, 0xff]);
    assert_eq!(wire(&Integer(-128), EncodingRule::Der), [0x02, 0x01, 0x80]);
}

#[test]
fn oid_wire_vector() {
    let oid: ObjectIdentifier = "1.3.6.1.4.1.56521".parse().unwrap();
    assert_eq!(wire(&oid, EncodingRule::Der), hex::decode("06082B0601040183B949").unwrap());
}

#[test]
fn null_and_boolean_wire_vectors() {
    for rule in [EncodingRule::Ber, EncodingRule::Der] {
        assert_eq!(wire(&Null, rule), [0x05, 0x00]);
        assert_eq!(wire(&Boolean(true), rule), [0x01, 0x01, 0xff]);
    }
}

#[test]
fn date_native_and_retagged_vectors() {
    let date = Date::try_from("2021-09-18").unwrap();
    // DATE's own tag is universal 31, which already needs the
    // high-tag-number identifier form
    assert_eq!(wire(&date, EncodingRule::Der), hex::decode("1F1F0A323032312D30392D3138").unwrap());

    let opts = Options::parse("tag:31").unwrap();
    let pdu = marshal_with(&date, EncodingRule::Der, &opts).unwrap();
    assert_eq!(pdu.as_bytes(), hex::decode("9F1F0A323032312D30392D3138").unwrap());
}

#[test]
fn primitive_round_trips_under_every_rule() {
    for rule in ALL_RULES {
        macro_rules! round_trip {
            ($t:ty, $value:expr) => {{
                let value: $t = $value;
                let mut pdu = marshal_with(&value, rule, &Options::default()).unwrap();
                let mut back = <$t>::default();
                unmarshal_with(&mut pdu, &mut back, &Options::default()).unwrap();
                assert_eq!(back, value, "{} under {rule}", stringify!($t));
            }};
        }

        round_trip!(Boolean, Boolean(true));
        round_trip!(Integer, Integer(-72_057_594_037_927_936));
        round_trip!(Enumerated, Enumerated(4));
        round_trip!(BitString, BitString::from_bits([true, false, true]));
        round_trip!(OctetString, OctetString::from(b"blarg"));
        round_trip!(Null, Null);
        round_trip!(ObjectIdentifier, "1.2.840.113549.1.1.5".parse().unwrap());
        round_trip!(RelativeOid, RelativeOid::try_from("8571.3.2").unwrap());
        round_trip!(Real, Real(-3.25));
        round_trip!(Utf8String, Utf8String::must_new("grüße", &[]));
        round_trip!(PrintableString, PrintableString::must_new("Test User", &[]));
        round_trip!(Ia5String, Ia5String::must_new("user@example.com", &[]));
        round_trip!(NumericString, NumericString::must_new("123 45", &[]));
        round_trip!(VisibleString, VisibleString::must_new("visible", &[]));
        round_trip!(BmpString, BmpString::must_new("σigma", &[]));
        round_trip!(UniversalString, UniversalString::must_new("wide 🌍", &[]));
        round_trip!(ObjectDescriptor, ObjectDescriptor::must_new("test", &[]));
        round_trip!(UtcTime, UtcTime::try_from("910506234540Z").unwrap());
        round_trip!(GeneralizedTime, GeneralizedTime::try_from("20210918064500.25Z").unwrap());
        round_trip!(Date, Date::try_from("2021-09-18").unwrap());
        round_trip!(TimeOfDay, TimeOfDay::try_from("06:45:00").unwrap());
        round_trip!(DateTime, DateTime::try_from("2021-09-18T06:45:00").unwrap());
        round_trip!(AsnTime, AsnTime::try_from("2021-09-18T06:45:00").unwrap());
        round_trip!(Duration, Duration::try_from("P1Y2M3DT4H5M6S").unwrap());
    }
}

#[test]
fn composite_round_trips_under_every_rule() {
    crate::asn_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Record {
            serial: Integer => "",
            issuer: PrintableString => "",
            extensions: Option<OctetString> => "tag:0,optional",
        }
    }

    for rule in ALL_RULES {
        let value = Record {
            serial: Integer(830),
            issuer: PrintableString::must_new("Example CA", &[]),
            extensions: Some(OctetString::from(b"ext")),
        };
        let mut pdu = marshal_with(&value, rule, &Options::default()).unwrap();
        let mut back = Record::default();
        unmarshal_with(&mut pdu, &mut back, &Options::default()).unwrap();
        assert_eq!(back, value, "record under {rule}");

        let sparse = Record { extensions: None, ..value.clone() };
        let mut pdu = marshal_with(&sparse, rule, &Options::default()).unwrap();
        let mut back = Record::default();
        unmarshal_with(&mut pdu, &mut back, &Options::default()).unwrap();
        assert_eq!(back, sparse, "sparse record under {rule}");
    }
}

crate::asn_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Syntaxes {
        abstract_syntax: ObjectIdentifier => "",
        transfer: ObjectIdentifier => "",
    }
}

crate::asn_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct EmbeddedPdv: "class:application,tag:11" {
        identification: Choice => "choices:pdv-identification",
        data_value_descriptor: Option<ObjectDescriptor> => "optional",
        data_value: OctetString => "",
    }
}

#[test]
fn embedded_pdv_choice_scenario() {
    register_choices(
        "pdv-identification",
        ChoicesBuilder::new().alternative::<Syntaxes>(Some(0)).unwrap(),
    )
    .unwrap();

    let value = EmbeddedPdv {
        identification: Choice::new(Syntaxes {
            abstract_syntax: "2.1.2.1.2.1.2.1".parse().unwrap(),
            transfer: "2.0.2.0.2.0.2.0".parse().unwrap(),
        }),
        data_value_descriptor: Some(ObjectDescriptor::must_new("test", &[])),
        data_value: OctetString::from(b"blarg"),
    };

    let expected = hex::decode(
        "6B23A01430120607510201020102010607500200020002000704746573740405626C617267",
    )
    .unwrap();
    let mut pdu = marshal(&value).unwrap();
    assert_eq!(pdu.as_bytes(), expected);

    let mut back = EmbeddedPdv::default();
    unmarshal(&mut pdu, &mut back).unwrap();
    assert_eq!(back, value);
    assert_eq!(
        back.identification.downcast_ref::<Syntaxes>().unwrap().transfer.to_string(),
        "2.0.2.0.2.0.2.0"
    );
}

#[test]
fn set_of_scenario_preserves_ber_order() {
    let words: SetOf<OctetString> = ["Zero", "One", "Two", "Three", "Four", "Five"]
        .iter()
        .map(|w| OctetString::from(w.as_bytes()))
        .collect();

    let expected = hex::decode(
        "312304045A65726F04034F6E65040354776F040554687265650404466F7572040446697665",
    )
    .unwrap();
    assert_eq!(wire(&words, EncodingRule::Ber), expected);
}

#[test]
fn der_set_of_is_permutation_invariant() {
    let a: SetOf<OctetString> =
        ["Zero", "One", "Two"].iter().map(|w| OctetString::from(w.as_bytes())).collect();
    let b: SetOf<OctetString> =
        ["Two", "Zero", "One"].iter().map(|w| OctetString::from(w.as_bytes())).collect();

    let der_a = wire(&a, EncodingRule::Der);
    let der_b = wire(&b, EncodingRule::Der);
    assert_eq!(der_a, der_b);
    // and BER keeps them distinct
    assert_ne!(wire(&a, EncodingRule::Ber), wire(&b, EncodingRule::Ber));
}

#[test]
fn der_lengths_are_minimal() {
    let long = OctetString::from(vec![0xaa; 200]);
    let bytes = wire(&long, EncodingRule::Der);
    assert_eq!(&bytes[..3], [0x04, 0x81, 0xc8]);

    let short = OctetString::from(vec![0xaa; 127]);
    let bytes = wire(&short, EncodingRule::Der);
    assert_eq!(&bytes[..2], [0x04, 0x7f]);
}

#[test]
fn explicit_wrapper_holds_untouched_tlv() {
    let value = OctetString::from(b"ab");
    let native = wire(&value, EncodingRule::Der);

    let implicit = marshal_with(&value, EncodingRule::Der, &Options::parse("tag:5").unwrap())
        .unwrap()
        .into_bytes();
    // implicit: only the identifier octet differs
    assert_eq!(implicit[0], 0x85);
    assert_eq!(implicit[1..], native[1..]);

    let explicit =
        marshal_with(&value, EncodingRule::Der, &Options::parse("tag:5,explicit").unwrap())
            .unwrap()
            .into_bytes();
    // explicit: a constructed wrapper whose content is the native TLV
    assert_eq!(explicit[0], 0xa5);
    assert_eq!(&explicit[2..], native.as_slice());
}

#[test]
fn field_constraint_phasing() {
    constraint::register_constraint::<Utf8String>(
        "e2e-short",
        constraint::property("short", |s: &Utf8String| s.as_str().len() <= 3),
    )
    .unwrap();

    crate::asn_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Note {
            body: Utf8String => "constraint:^e2e-short",
        }
    }

    let long = Note { body: Utf8String::must_new("too long for the rule", &[]) };
    // encode-only marker: marshal enforces it
    assert!(marshal(&long).is_err());

    // but a wire value that breaks the rule still decodes
    let mut forged = Pdu::from_bytes(EncodingRule::Ber, {
        let mut bytes = vec![0x30, 0x08, 0x0c, 0x06];
        bytes.extend_from_slice(b"forged");
        bytes
    });
    let mut back = Note::default();
    unmarshal(&mut forged, &mut back).unwrap();
    assert_eq!(back.body.as_str(), "forged");
}

#[test]
fn decode_only_constraint_phasing() {
    constraint::register_constraint::<Integer>(
        "e2e-positive",
        constraint::property("positive", |n: &Integer| n.0 > 0).with_phase(Phase::Decode),
    )
    .unwrap();

    let opts = Options::parse("constraint:e2e-positive").unwrap();
    // the registered phase alone keeps it off the encode pass
    let mut pdu = marshal_with(&Integer(-5), EncodingRule::Ber, &opts).unwrap();
    let mut back = Integer::default();
    assert!(unmarshal_with(&mut pdu, &mut back, &opts).is_err());
}

#[test]
fn ber_indefinite_round_trip_through_driver() {
    crate::asn_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Pair {
            a: Integer => "",
            b: OctetString => "",
        }
    }

    let value = Pair { a: Integer(1), b: OctetString::from(b"hi") };
    let opts = Options::parse("indefinite").unwrap();
    let mut pdu = marshal_with(&value, EncodingRule::Ber, &opts).unwrap();
    assert_eq!(pdu.as_bytes()[1], 0x80);
    assert!(pdu.as_bytes().ends_with(&[0x00, 0x00]));

    let mut back = Pair::default();
    unmarshal_with(&mut pdu, &mut back, &opts).unwrap();
    assert_eq!(back, value);

    // the same option is rejected outright under DER
    assert!(marshal_with(&value, EncodingRule::Der, &opts).is_err());
}

#[test]
fn host_typed_struct_fields() {
    crate::asn_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Person {
            name: String => "identifier:printable",
            age: i64 => "",
            photo: Vec<u8> => "omit-empty,optional",
        }
    }

    let value = Person { name: "Test User".into(), age: 42, photo: Vec::new() };
    let mut pdu = marshal(&value).unwrap();
    // PrintableString carrier for the name, INTEGER for the age, photo omitted
    assert_eq!(pdu.as_bytes()[2], 0x13);
    let mut back = Person::default();
    unmarshal(&mut pdu, &mut back).unwrap();
    assert_eq!(back, value);
}

#[test]
fn partial_destination_survives_failure() {
    crate::asn_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct TwoInts {
            first: Integer => "",
            second: Integer => "",
        }
    }

    // first component decodes, second is a BOOLEAN: the destination
    // keeps the decoded first field
    let mut pdu =
        Pdu::from_bytes(EncodingRule::Ber, vec![0x30, 0x06, 0x02, 0x01, 0x2a, 0x01, 0x01, 0xff]);
    let mut dest = TwoInts::default();
    assert!(unmarshal(&mut pdu, &mut dest).is_err());
    assert_eq!(dest.first, Integer(42));
}

#[test]
fn free_returns_buffers_to_the_pool() {
    let pdu = marshal(&Integer(1)).unwrap();
    pdu.free();
    // a freed buffer is recycled rather than reallocated
    let recycled = Pdu::new(EncodingRule::Ber);
    assert!(recycled.is_empty());
    let (pooled, capacity) = crate::pool_stats();
    assert!(pooled <= 32);
    let _ = capacity;
}
