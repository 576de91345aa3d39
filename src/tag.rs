//! Tag classes and the universal tag numbers of ITU-T X.680.

use core::fmt;

use derive_try_from_primitive::TryFromPrimitive;

/// Identifier-octet class, bits 8-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Class {
    /// Universal (0b00)
    Universal = 0,
    /// Application (0b01)
    Application = 1,
    /// Context-specific (0b10)
    ContextSpecific = 2,
    /// Private (0b11)
    Private = 3,
}

impl Class {
    /// Encode the class into the upper 2 bits of an identifier octet.
    pub const fn to_bits(self) -> u8 {
        (self as u8) << 6
    }

    /// Extract the class from an identifier octet.
    pub const fn from_bits(octet: u8) -> Self {
        match octet >> 6 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }
}

impl Default for Class {
    fn default() -> Self {
        Class::Universal
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Class::Universal => "universal",
            Class::Application => "application",
            Class::ContextSpecific => "context-specific",
            Class::Private => "private",
        })
    }
}

// Universal tag numbers, X.680 table 1.
pub const TAG_EOC: u32 = 0;
pub const TAG_BOOLEAN: u32 = 1;
pub const TAG_INTEGER: u32 = 2;
pub const TAG_BIT_STRING: u32 = 3;
pub const TAG_OCTET_STRING: u32 = 4;
pub const TAG_NULL: u32 = 5;
pub const TAG_OBJECT_IDENTIFIER: u32 = 6;
pub const TAG_OBJECT_DESCRIPTOR: u32 = 7;
pub const TAG_EXTERNAL: u32 = 8;
pub const TAG_REAL: u32 = 9;
pub const TAG_ENUMERATED: u32 = 10;
pub const TAG_EMBEDDED_PDV: u32 = 11;
pub const TAG_UTF8_STRING: u32 = 12;
pub const TAG_RELATIVE_OID: u32 = 13;
pub const TAG_TIME: u32 = 14;
pub const TAG_SEQUENCE: u32 = 16;
pub const TAG_SET: u32 = 17;
pub const TAG_NUMERIC_STRING: u32 = 18;
pub const TAG_PRINTABLE_STRING: u32 = 19;
pub const TAG_T61_STRING: u32 = 20;
pub const TAG_VIDEOTEX_STRING: u32 = 21;
pub const TAG_IA5_STRING: u32 = 22;
pub const TAG_UTC_TIME: u32 = 23;
pub const TAG_GENERALIZED_TIME: u32 = 24;
pub const TAG_GRAPHIC_STRING: u32 = 25;
pub const TAG_VISIBLE_STRING: u32 = 26;
pub const TAG_GENERAL_STRING: u32 = 27;
pub const TAG_UNIVERSAL_STRING: u32 = 28;
pub const TAG_BMP_STRING: u32 = 30;
pub const TAG_DATE: u32 = 31;
pub const TAG_TIME_OF_DAY: u32 = 32;
pub const TAG_DATE_TIME: u32 = 33;
pub const TAG_DURATION: u32 = 34;

/// Human-readable name for a universal tag number.
pub fn universal_tag_name(tag: u32) -> &'static str {
    match tag {
        TAG_EOC => "END-OF-CONTENTS",
        TAG_BOOLEAN => "BOOLEAN",
        TAG_INTEGER => "INTEGER",
        TAG_BIT_STRING => "BIT STRING",
        TAG_OCTET_STRING => "OCTET STRING",
        TAG_NULL => "NULL",
        TAG_OBJECT_IDENTIFIER => "OBJECT IDENTIFIER",
        TAG_OBJECT_DESCRIPTOR => "ObjectDescriptor",
        TAG_EXTERNAL => "EXTERNAL",
        TAG_REAL => "REAL",
        TAG_ENUMERATED => "ENUMERATED",
        TAG_EMBEDDED_PDV => "EMBEDDED PDV",
        TAG_UTF8_STRING => "UTF8String",
        TAG_RELATIVE_OID => "RELATIVE-OID",
        TAG_TIME => "TIME",
        TAG_SEQUENCE => "SEQUENCE",
        TAG_SET => "SET",
        TAG_NUMERIC_STRING => "NumericString",
        TAG_PRINTABLE_STRING => "PrintableString",
        TAG_T61_STRING => "T61String",
        TAG_VIDEOTEX_STRING => "VideotexString",
        TAG_IA5_STRING => "IA5String",
        TAG_UTC_TIME => "UTCTime",
        TAG_GENERALIZED_TIME => "GeneralizedTime",
        TAG_GRAPHIC_STRING => "GraphicString",
        TAG_VISIBLE_STRING => "VisibleString",
        TAG_GENERAL_STRING => "GeneralString",
        TAG_UNIVERSAL_STRING => "UniversalString",
        TAG_BMP_STRING => "BMPString",
        TAG_DATE => "DATE",
        TAG_TIME_OF_DAY => "TIME-OF-DAY",
        TAG_DATE_TIME => "DATE-TIME",
        TAG_DURATION => "DURATION",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_bit_round_trip() {
        for class in [Class::Universal, Class::Application, Class::ContextSpecific, Class::Private] {
            assert_eq!(Class::from_bits(class.to_bits()), class);
        }
    }

    #[test]
    fn class_try_from_primitive() {
        assert_eq!(Class::try_from(2u8).unwrap(), Class::ContextSpecific);
        assert!(Class::try_from(4u8).is_err());
    }

    #[test]
    fn universal_names() {
        assert_eq!(universal_tag_name(TAG_INTEGER), "INTEGER");
        assert_eq!(universal_tag_name(TAG_SET), "SET");
        assert_eq!(universal_tag_name(99), "UNKNOWN");
    }
}
