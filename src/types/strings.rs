//! The restricted character string family, plus ObjectDescriptor.
//!
//! Most members put their text on the wire as raw UTF-8 octets and only
//! differ in which characters they admit; BMPString is UTF-16BE and
//! UniversalString UCS-4BE. Alphabet checks run at construction and
//! again when decoding, so a value of one of these types is always
//! well-formed.

use core::fmt;

use crate::constraint::{Constraint, Lengthy};
use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::{
    TAG_BMP_STRING, TAG_GENERAL_STRING, TAG_GRAPHIC_STRING, TAG_IA5_STRING, TAG_NUMERIC_STRING,
    TAG_OBJECT_DESCRIPTOR, TAG_PRINTABLE_STRING, TAG_T61_STRING, TAG_UNIVERSAL_STRING,
    TAG_UTF8_STRING, TAG_VIDEOTEX_STRING, TAG_VISIBLE_STRING,
};
use crate::types::{AsnType, constrained};

fn is_printable_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z' | '0'..='9'
        | ' ' | '\'' | '(' | ')' | '+' | ',' | '-' | '.' | '/' | ':' | '=' | '?')
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || c == ' '
}

fn is_ia5_char(c: char) -> bool {
    (c as u32) <= 0x7f
}

fn is_visible_char(c: char) -> bool {
    matches!(c as u32, 0x20..=0x7e)
}

fn is_bmp_char(c: char) -> bool {
    (c as u32) <= 0xffff
}

fn any_char(_c: char) -> bool {
    true
}

fn check_chars(type_name: &'static str, value: &str, permitted: fn(char) -> bool) -> Result<()> {
    for ch in value.chars() {
        if !permitted(ch) {
            return Err(Error::InvalidCharacter { type_name, ch });
        }
    }
    Ok(())
}

macro_rules! string_type {
    ($(#[$doc:meta])* $name:ident, $tag:expr, $asn:literal, $check:expr) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Result<Self> {
                let value = value.into();
                check_chars($asn, &value, $check)?;
                constrained(Self(value), constraints)
            }

            pub fn must_new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Self {
                Self::new(value, constraints)
                    .unwrap_or_else(|e| panic!(concat!($asn, " construction failed: {}"), e))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl AsnType for $name {
            const TAG: u32 = $tag;
            const NAME: &'static str = $asn;

            fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
                Ok(self.0.clone().into_bytes())
            }

            fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
                let s = core::str::from_utf8(content)
                    .map_err(|_| Error::invalid_content($asn, "content is not valid UTF-8"))?;
                check_chars($asn, s, $check)?;
                Ok(Self(s.to_string()))
            }

            fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<&str> for $name {
            type Error = Error;

            fn try_from(value: &str) -> Result<Self> {
                Self::new(value, &[])
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value, &[])
            }
        }

        impl Lengthy for $name {
            fn size(&self) -> usize {
                self.0.chars().count()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }
    };
}

string_type!(
    /// UTF8String: any Unicode text.
    Utf8String, TAG_UTF8_STRING, "UTF8String", any_char
);
string_type!(
    /// NumericString: digits and space.
    NumericString, TAG_NUMERIC_STRING, "NumericString", is_numeric_char
);
string_type!(
    /// PrintableString: the X.680 printable subset.
    PrintableString, TAG_PRINTABLE_STRING, "PrintableString", is_printable_char
);
string_type!(
    /// T61String (TeletexString). The full T.61 repertoire is not
    /// policed; any text is accepted and carried as raw octets.
    T61String, TAG_T61_STRING, "T61String", any_char
);
string_type!(
    /// VideotexString; carried as raw octets.
    VideotexString, TAG_VIDEOTEX_STRING, "VideotexString", any_char
);
string_type!(
    /// IA5String: the 7-bit repertoire.
    Ia5String, TAG_IA5_STRING, "IA5String", is_ia5_char
);
string_type!(
    /// GraphicString; carried as raw octets.
    GraphicString, TAG_GRAPHIC_STRING, "GraphicString", any_char
);
string_type!(
    /// VisibleString: printable ASCII without control characters.
    VisibleString, TAG_VISIBLE_STRING, "VisibleString", is_visible_char
);
string_type!(
    /// GeneralString; carried as raw octets.
    GeneralString, TAG_GENERAL_STRING, "GeneralString", any_char
);
string_type!(
    /// ObjectDescriptor: a human-readable designation (GraphicString
    /// repertoire under its own tag).
    ObjectDescriptor, TAG_OBJECT_DESCRIPTOR, "ObjectDescriptor", any_char
);

/// BMPString: UTF-16BE code units, basic multilingual plane only.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BmpString(String);

impl BmpString {
    pub fn new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Result<Self> {
        let value = value.into();
        check_chars("BMPString", &value, is_bmp_char)?;
        constrained(Self(value), constraints)
    }

    pub fn must_new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints).unwrap_or_else(|e| panic!("BMPString construction failed: {e}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsnType for BmpString {
    const TAG: u32 = TAG_BMP_STRING;
    const NAME: &'static str = "BMPString";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.0.len() * 2);
        for unit in self.0.encode_utf16() {
            out.extend_from_slice(&unit.to_be_bytes());
        }
        Ok(out)
    }

    fn decode_verify(content: &[u8], _rule: EncodingRule) -> Result<()> {
        if content.len() % 2 != 0 {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: content.len(),
                reason: "content must be a whole number of UTF-16 code units",
            });
        }
        Ok(())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let units: Vec<u16> = content
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        let s = String::from_utf16(&units)
            .map_err(|_| Error::invalid_content(Self::NAME, "unpaired surrogate"))?;
        check_chars(Self::NAME, &s, is_bmp_char)?;
        Ok(Self(s))
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for BmpString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BmpString {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value, &[])
    }
}

impl Lengthy for BmpString {
    fn size(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for BmpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BmpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BmpString({:?})", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for BmpString {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// UniversalString: UCS-4BE code points.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct UniversalString(String);

impl UniversalString {
    pub fn new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Result<Self> {
        constrained(Self(value.into()), constraints)
    }

    pub fn must_new(value: impl Into<String>, constraints: &[Constraint<Self>]) -> Self {
        Self::new(value, constraints)
            .unwrap_or_else(|e| panic!("UniversalString construction failed: {e}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsnType for UniversalString {
    const TAG: u32 = TAG_UNIVERSAL_STRING;
    const NAME: &'static str = "UniversalString";

    fn encode_value(&self, _rule: EncodingRule) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.0.len() * 4);
        for ch in self.0.chars() {
            out.extend_from_slice(&(ch as u32).to_be_bytes());
        }
        Ok(out)
    }

    fn decode_verify(content: &[u8], _rule: EncodingRule) -> Result<()> {
        if content.len() % 4 != 0 {
            return Err(Error::InvalidLength {
                type_name: Self::NAME,
                len: content.len(),
                reason: "content must be a whole number of UCS-4 code points",
            });
        }
        Ok(())
    }

    fn decode_value(content: &[u8], _rule: EncodingRule) -> Result<Self> {
        let mut s = String::with_capacity(content.len() / 4);
        for quad in content.chunks_exact(4) {
            let code = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
            let ch = char::from_u32(code)
                .ok_or_else(|| Error::invalid_content(Self::NAME, format!("bad code point {code:#x}")))?;
            s.push(ch);
        }
        Ok(Self(s))
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for UniversalString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for UniversalString {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value, &[])
    }
}

impl Lengthy for UniversalString {
    fn size(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for UniversalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UniversalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniversalString({:?})", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for UniversalString {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}
