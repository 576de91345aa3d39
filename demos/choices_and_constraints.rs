//! Registry Example
//!
//! This example demonstrates the process-wide registries:
//! 1. A choices set with explicit, implicit and automatic alternatives
//! 2. A named constraint referenced from field metadata
//! 3. A registered default value
//! 4. Adapter introspection

use asn1_codec::{
    asn_struct, constraint, marshal, register_choices, register_constraint, register_default,
    registered_adapters, unmarshal, Choice, ChoicesBuilder, Ia5String, Integer, OctetString,
    Utf8String,
};

asn_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Envelope {
        body: Choice => "choices:payload",
        hops: Integer => "default:envelope-hops",
        note: Utf8String => "constraint:^note-length,omit-empty,optional",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Registry Example ===\n");

    register_choices(
        "payload",
        ChoicesBuilder::new()
            .alternative::<Ia5String>(Some(0))?
            .alternative_with::<OctetString>(Some(1), None, Some(false))?
            .alternative::<Integer>(None)?,
    )?;
    register_constraint::<Utf8String>(
        "note-length",
        constraint::size(0, 64),
    )?;
    register_default("envelope-hops", Integer(0))?;

    let envelope = Envelope {
        body: Choice::new(Ia5String::must_new("ping", &[])),
        hops: Integer(0),
        note: Utf8String::must_new("first contact", &[]),
    };

    let mut pdu = marshal(&envelope)?;
    // hops equals its registered default, so only body and note appear
    println!("BER ({} bytes): {:02X?}", pdu.len(), pdu.as_bytes());

    let mut back = Envelope::default();
    unmarshal(&mut pdu, &mut back)?;
    assert_eq!(back, envelope);
    println!("alternative on the wire: {}", back.body.type_label());

    println!("\nregistered adapters:");
    for row in registered_adapters().iter().take(8) {
        println!("  {:>28}  {:12}  {}", row.host, row.keyword, row.codec);
    }

    Ok(())
}
