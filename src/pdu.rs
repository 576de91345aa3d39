//! The protocol data unit: an append-only byte buffer with a read cursor,
//! bound to one encoding rule for its lifetime.
//!
//! Buffers are pooled: [`Pdu::new`] takes a recycled buffer when one is
//! available and [`Pdu::free`] returns it. Freeing is a hint, not a
//! requirement; a dropped `Pdu` simply releases its buffer to the
//! allocator.

use core::fmt;
use core::str::FromStr;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::tlv::{self, Tlv};

/// The transfer syntax in force for one encode or decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncodingRule {
    /// Basic Encoding Rules: any legal form, indefinite lengths included.
    #[default]
    Ber,
    /// Canonical Encoding Rules: definite-length primitives only.
    Cer,
    /// Distinguished Encoding Rules: shortest forms, sorted sets.
    Der,
}

impl EncodingRule {
    /// Only BER admits the indefinite length form.
    pub fn allows_indefinite(self) -> bool {
        self == EncodingRule::Ber
    }

    /// CER and DER impose canonical restrictions on encodings.
    pub fn is_canonical(self) -> bool {
        self != EncodingRule::Ber
    }
}

impl fmt::Display for EncodingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncodingRule::Ber => "BER",
            EncodingRule::Cer => "CER",
            EncodingRule::Der => "DER",
        })
    }
}

impl FromStr for EncodingRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BER" => Ok(EncodingRule::Ber),
            "CER" => Ok(EncodingRule::Cer),
            "DER" => Ok(EncodingRule::Der),
            other => Err(Error::UnknownOption(other.to_string())),
        }
    }
}

const POOL_MAX_BUFFERS: usize = 32;

lazy_static! {
    static ref BUFFER_POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());
}

fn take_buffer() -> Vec<u8> {
    BUFFER_POOL.lock().map(|mut pool| pool.pop()).ok().flatten().unwrap_or_default()
}

fn put_buffer(mut buf: Vec<u8>) {
    buf.clear();
    if let Ok(mut pool) = BUFFER_POOL.lock() {
        if pool.len() < POOL_MAX_BUFFERS {
            pool.push(buf);
        }
    }
}

/// Pooled-buffer statistics: (buffers pooled, total pooled capacity).
pub fn pool_stats() -> (usize, usize) {
    BUFFER_POOL
        .lock()
        .map(|pool| (pool.len(), pool.iter().map(Vec::capacity).sum()))
        .unwrap_or((0, 0))
}

/// A byte buffer plus read cursor, bound to an encoding rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    rule: EncodingRule,
    data: Vec<u8>,
    offset: usize,
}

impl Pdu {
    /// An empty PDU, reusing a pooled buffer when one is available.
    pub fn new(rule: EncodingRule) -> Self {
        Self { rule, data: take_buffer(), offset: 0 }
    }

    pub fn with_capacity(rule: EncodingRule, capacity: usize) -> Self {
        let mut data = take_buffer();
        data.reserve(capacity);
        Self { rule, data, offset: 0 }
    }

    /// Wraps existing wire bytes for decoding.
    pub fn from_bytes(rule: EncodingRule, data: impl Into<Vec<u8>>) -> Self {
        Self { rule, data: data.into(), offset: 0 }
    }

    pub fn rule(&self) -> EncodingRule {
        self.rule
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(Error::OutOfBounds { offset, len: self.data.len() });
        }
        self.offset = offset;
        Ok(())
    }

    /// Rewinds the cursor to the start of the buffer.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// The unread remainder of the buffer.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    /// True when the cursor sits at the end of input or at an
    /// end-of-contents pair (the terminator of an indefinite region).
    pub fn at_end(&self) -> bool {
        let rest = self.remaining();
        rest.is_empty() || rest.starts_with(&[0x00, 0x00])
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Serializes a TLV at the end of the buffer.
    pub fn write_tlv(&mut self, tlv: &Tlv) -> Result<usize> {
        tlv.encode_into(self.rule, &mut self.data)
    }

    /// Reads the TLV at the cursor and advances past it.
    pub fn read_tlv(&mut self) -> Result<Tlv> {
        let (tlv, next) = self.tlv_at(self.offset)?;
        self.offset = next;
        Ok(tlv)
    }

    /// Reads the TLV at the cursor without advancing.
    pub fn peek_tlv(&self) -> Result<Tlv> {
        self.tlv_at(self.offset).map(|(tlv, _)| tlv)
    }

    /// Consumes an end-of-contents pair at the cursor, if present.
    pub(crate) fn skip_eoc(&mut self) {
        if self.remaining().starts_with(&[0x00, 0x00]) {
            self.offset += 2;
        }
    }

    fn tlv_at(&self, offset: usize) -> Result<(Tlv, usize)> {
        if offset > self.data.len() {
            return Err(Error::OutOfBounds { offset, len: self.data.len() });
        }
        let input = &self.data[offset..];
        let (class, compound, tag, id_len) = tlv::parse_identifier(input)?;
        let (length, len_len) = tlv::parse_length(self.rule, &input[id_len..])?;
        let header = id_len + len_len;
        let rest = &input[header..];
        if length >= 0 {
            let needed = length as usize;
            if rest.len() < needed {
                return Err(Error::TruncatedContent { needed, available: rest.len() });
            }
            let value = rest[..needed].to_vec();
            Ok((Tlv { class, tag, compound, length, value }, offset + header + needed))
        } else {
            let content_len = indefinite_content_len(rest, compound)?;
            // keep the end-of-contents pair inside the raw content region
            let value = rest[..content_len + 2].to_vec();
            Ok((Tlv { class, tag, compound, length: -1, value }, offset + header + content_len + 2))
        }
    }

    /// Returns the underlying buffer to the pool.
    pub fn free(self) {
        put_buffer(self.data);
    }
}

/// Octets preceding the end-of-contents pair that terminates an
/// indefinite-length region. Constructed content is walked TLV by TLV so
/// that nested terminators are attributed to their own regions.
fn indefinite_content_len(data: &[u8], compound: bool) -> Result<usize> {
    if !compound {
        // no inner structure to walk; take the first terminator
        let mut pos = 0;
        while pos + 1 < data.len() {
            if data[pos] == 0 && data[pos + 1] == 0 {
                return Ok(pos);
            }
            pos += 1;
        }
        return Err(Error::TruncatedContent { needed: data.len() + 2, available: data.len() });
    }
    let mut pos = 0;
    loop {
        if data.len() < pos + 2 {
            return Err(Error::TruncatedContent { needed: pos + 2, available: data.len() });
        }
        if data[pos] == 0 && data[pos + 1] == 0 {
            return Ok(pos);
        }
        let child = &data[pos..];
        let (_, child_compound, _, id_len) = tlv::parse_identifier(child)?;
        let (length, len_len) = tlv::parse_length(EncodingRule::Ber, &child[id_len..])?;
        let header = id_len + len_len;
        if length >= 0 {
            let needed = length as usize;
            if child.len() < header + needed {
                return Err(Error::TruncatedContent { needed: header + needed, available: child.len() });
            }
            pos += header + needed;
        } else {
            let inner = indefinite_content_len(&child[header..], child_compound)?;
            pos += header + inner + 2;
        }
    }
}
