//! Structural Encoding Example
//!
//! This example demonstrates the SEQUENCE engine on an X.509-flavoured
//! shape:
//! 1. Declare nested structs with per-field directives
//! 2. Marshal under DER and inspect the canonical bytes
//! 3. Unmarshal back and compare

use asn1_codec::{
    asn_struct, marshal_with, unmarshal_with, BitString, EncodingRule, Integer, ObjectIdentifier,
    OctetString, Options, PrintableString, UtcTime,
};

asn_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct AlgorithmIdentifier {
        algorithm: ObjectIdentifier => "",
        parameters: Option<OctetString> => "optional",
    }
}

asn_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Validity {
        not_before: UtcTime => "",
        not_after: UtcTime => "",
    }
}

asn_struct! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct CertificateShape {
        version: Integer => "tag:0,explicit",
        serial: Integer => "",
        signature: AlgorithmIdentifier => "",
        issuer: PrintableString => "",
        validity: Validity => "",
        subject_key: BitString => "",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Structural Encoding Example ===\n");

    let cert = CertificateShape {
        version: Integer::from(2),
        serial: Integer::from(0x01_0203),
        signature: AlgorithmIdentifier {
            algorithm: "1.2.840.113549.1.1.11".parse()?,
            parameters: None,
        },
        issuer: PrintableString::must_new("Example CA", &[]),
        validity: Validity {
            not_before: UtcTime::try_from("240101000000Z")?,
            not_after: UtcTime::try_from("250101000000Z")?,
        },
        subject_key: BitString::new(vec![0x5a, 0x1c], 0, &[])?,
    };

    let pdu = marshal_with(&cert, EncodingRule::Der, &Options::default())?;
    println!("DER ({} bytes):", pdu.len());
    for chunk in pdu.as_bytes().chunks(16) {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        println!("  {}", hex.join(" "));
    }

    let mut back = CertificateShape::default();
    let mut pdu = pdu;
    unmarshal_with(&mut pdu, &mut back, &Options::default())?;
    assert_eq!(back, cert);
    println!("\nround-trip ok: serial = {}", back.serial);

    pdu.free();
    Ok(())
}
