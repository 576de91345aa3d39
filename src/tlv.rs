//! The TLV model and the identifier/length codec of ITU-T X.690.
//!
//! Identifier octet layout: bits 8-7 carry the class, bit 6 the
//! constructed flag, bits 5-1 the tag number when it is below 31;
//! otherwise bits 5-1 are all ones and the tag number follows in base-128
//! octets with MSB continuation. Definite lengths use the short form below
//! 128 and the long form (`0x80 | n` followed by `n` big-endian octets)
//! above; `0x80` alone marks the indefinite form, which only BER permits.

use crate::error::{Error, Result};
use crate::pdu::EncodingRule;
use crate::tag::Class;

/// Tag numbers are limited to 28 bits (4 continuation octets).
pub const MAX_TAG_OCTETS: usize = 4;
/// Definite lengths are limited to 4 content-length octets.
pub const MAX_LENGTH_OCTETS: usize = 4;

/// One tag-length-value triple.
///
/// `length` is the decoded content length; `-1` marks the indefinite form.
/// For an indefinite TLV, `value` holds the raw content region including
/// the two `00 00` end-of-contents octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub class: Class,
    pub tag: u32,
    pub compound: bool,
    pub length: i64,
    pub value: Vec<u8>,
}

impl Tlv {
    /// A definite-length TLV over `value`.
    pub fn new(class: Class, tag: u32, compound: bool, value: Vec<u8>) -> Self {
        let length = value.len() as i64;
        Self { class, tag, compound, length, value }
    }

    /// An indefinite-length constructed TLV. `value` is the content
    /// region without the end-of-contents octets; they are appended here.
    pub fn indefinite(class: Class, tag: u32, mut value: Vec<u8>) -> Self {
        value.extend_from_slice(&[0x00, 0x00]);
        Self { class, tag, compound: true, length: -1, value }
    }

    pub fn is_indefinite(&self) -> bool {
        self.length < 0
    }

    pub fn is_universal(&self) -> bool {
        self.class == Class::Universal
    }

    /// The content octets with any trailing end-of-contents pair removed.
    pub fn content(&self) -> &[u8] {
        if self.is_indefinite() && self.value.ends_with(&[0x00, 0x00]) {
            &self.value[..self.value.len() - 2]
        } else {
            &self.value
        }
    }

    /// Identity triple for mismatch reporting.
    pub(crate) fn identity(&self) -> (Class, u32, bool) {
        (self.class, self.tag, self.compound)
    }

    /// Serializes identifier, length and content octets.
    pub fn encode_into(&self, rule: EncodingRule, out: &mut Vec<u8>) -> Result<usize> {
        let start = out.len();
        encode_identifier(self.class, self.compound, self.tag, out);
        if self.is_indefinite() {
            if rule != EncodingRule::Ber {
                return Err(Error::IndefiniteProhibited(rule));
            }
            out.push(0x80);
            // value already carries the end-of-contents octets
            out.extend_from_slice(&self.value);
        } else {
            encode_length(rule, self.value.len() as i64, out)?;
            out.extend_from_slice(&self.value);
        }
        Ok(out.len() - start)
    }

    pub fn encode(&self, rule: EncodingRule) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.value.len() + 6);
        self.encode_into(rule, &mut out)?;
        Ok(out)
    }
}

/// Emits the identifier octets for (class, constructed, tag).
pub fn encode_identifier(class: Class, compound: bool, tag: u32, out: &mut Vec<u8>) {
    let leading = class.to_bits() | if compound { 0x20 } else { 0x00 };
    if tag < 31 {
        out.push(leading | tag as u8);
        return;
    }
    out.push(leading | 0x1f);
    let mut chunks = [0u8; 5];
    let mut i = chunks.len();
    let mut rest = tag;
    loop {
        i -= 1;
        chunks[i] = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    let last = chunks.len() - 1;
    for (pos, chunk) in chunks[i..].iter().enumerate() {
        let continued = i + pos < last;
        out.push(if continued { chunk | 0x80 } else { *chunk });
    }
}

/// Parses identifier octets, returning (class, constructed, tag, consumed).
pub fn parse_identifier(input: &[u8]) -> Result<(Class, bool, u32, usize)> {
    let first = *input.first().ok_or(Error::EmptyIdentifier)?;
    let class = Class::from_bits(first);
    let compound = first & 0x20 != 0;
    let low = u32::from(first & 0x1f);
    if low < 31 {
        return Ok((class, compound, low, 1));
    }
    let mut tag = 0u32;
    let mut consumed = 1;
    loop {
        let octet = *input.get(consumed).ok_or(Error::TruncatedTag)?;
        consumed += 1;
        if consumed - 1 > MAX_TAG_OCTETS {
            return Err(Error::TagTooLarge(consumed - 1));
        }
        tag = (tag << 7) | u32::from(octet & 0x7f);
        if octet & 0x80 == 0 {
            break;
        }
    }
    Ok((class, compound, tag, consumed))
}

/// Emits length octets. `length == -1` selects the indefinite form,
/// which only BER permits; definite lengths use the minimal form.
pub fn encode_length(rule: EncodingRule, length: i64, out: &mut Vec<u8>) -> Result<()> {
    if length < 0 {
        if rule != EncodingRule::Ber {
            return Err(Error::IndefiniteProhibited(rule));
        }
        out.push(0x80);
        return Ok(());
    }
    let length = length as u64;
    if length < 128 {
        out.push(length as u8);
        return Ok(());
    }
    let octets = length.to_be_bytes();
    let skip = octets.iter().position(|b| *b != 0).unwrap_or(octets.len() - 1);
    out.push(0x80 | (octets.len() - skip) as u8);
    out.extend_from_slice(&octets[skip..]);
    Ok(())
}

/// Parses length octets, returning (length, consumed); `-1` is indefinite.
pub fn parse_length(rule: EncodingRule, input: &[u8]) -> Result<(i64, usize)> {
    let first = *input.first().ok_or(Error::TruncatedLength)?;
    if first & 0x80 == 0 {
        return Ok((i64::from(first), 1));
    }
    let count = usize::from(first & 0x7f);
    if count == 0 {
        if rule != EncodingRule::Ber {
            return Err(Error::IndefiniteProhibited(rule));
        }
        return Ok((-1, 1));
    }
    if count > MAX_LENGTH_OCTETS {
        return Err(Error::LengthTooLarge(count));
    }
    if input.len() < 1 + count {
        return Err(Error::TruncatedLength);
    }
    let mut length: i64 = 0;
    for octet in &input[1..=count] {
        length = (length << 8) | i64::from(*octet);
    }
    if rule.is_canonical() && (input[1] == 0 || length < 128) {
        return Err(Error::invalid_content("LENGTH", "non-minimal long-form length"));
    }
    Ok((length, 1 + count))
}
