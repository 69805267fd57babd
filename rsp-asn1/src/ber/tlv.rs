//! BER-TLV tree
//!
//! A [`Tlv`] owns its tag, the raw value of a primitive node, and the decoded
//! children of a constructed node. Constructed nodes are always decoded
//! recursively across their whole value region; primitive nodes never are,
//! even when their value happens to look like TLV data.
//!
//! # Usage Example
//!
//! ```rust
//! use rsp_asn1::ber::{Tag, Tlv};
//!
//! let tlv = Tlv::decode(&[0xBF, 0x2E, 0x03, 0x80, 0x01, 0x42]).unwrap();
//! let challenge = tlv.find(Tag::context_specific(false, 0)).unwrap();
//! assert_eq!(&*challenge.value(), &[0x42]);
//! assert_eq!(tlv.encode(), vec![0xBF, 0x2E, 0x03, 0x80, 0x01, 0x42]);
//! ```

use crate::ber::types::{Length, Tag};
use crate::error::{RspError, RspResult};
use std::borrow::Cow;

/// Deepest nesting of constructed nodes accepted by the decoder
pub const MAX_DEPTH: usize = 32;

/// Decoded BER-TLV node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    /// Raw value of a primitive node; empty for constructed nodes
    value: Vec<u8>,
    /// Children of a constructed node; empty for primitive nodes
    children: Vec<Tlv>,
}

impl Tlv {
    /// Create a primitive node holding raw value bytes
    pub fn primitive(tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Create a constructed node from its children
    pub fn constructed(tag: Tag, children: Vec<Tlv>) -> Self {
        Self {
            tag,
            value: Vec::new(),
            children,
        }
    }

    /// Get the tag
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Get the value region
    ///
    /// For primitive nodes this borrows the raw bytes; for constructed nodes
    /// the children are encoded on demand.
    pub fn value(&self) -> Cow<'_, [u8]> {
        if self.tag.is_constructed() {
            Cow::Owned(self.encode_children())
        } else {
            Cow::Borrowed(&self.value)
        }
    }

    /// Get the children of a constructed node
    pub fn children(&self) -> &[Tlv] {
        &self.children
    }

    /// Append a child to a constructed node
    pub fn push(&mut self, child: Tlv) {
        self.children.push(child);
    }

    /// First immediate child with exactly this tag
    pub fn find(&self, tag: Tag) -> Option<&Tlv> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// First immediate child with this tag, or a `Decode` error naming it
    pub fn require(&self, tag: Tag, field: &str) -> RspResult<&Tlv> {
        self.find(tag).ok_or_else(|| {
            RspError::Decode(format!(
                "Missing required field {} (tag {}) in {}",
                field, tag, self.tag
            ))
        })
    }

    /// Fail with `UnexpectedTag` unless this node carries `expected`
    pub fn expect_tag(&self, expected: Tag, context: &'static str) -> RspResult<()> {
        if self.tag == expected {
            Ok(())
        } else {
            Err(RspError::UnexpectedTag {
                context,
                tag: self.tag.to_string(),
            })
        }
    }

    /// Decode exactly one TLV spanning the whole buffer
    ///
    /// # Errors
    /// `MalformedEncoding` if the encoding is truncated or trailing bytes
    /// remain after the node.
    pub fn decode(data: &[u8]) -> RspResult<Self> {
        let (tlv, consumed) = Self::decode_prefix(data)?;
        if consumed != data.len() {
            return Err(RspError::MalformedEncoding(format!(
                "{} trailing bytes after {} TLV",
                data.len() - consumed,
                tlv.tag
            )));
        }
        Ok(tlv)
    }

    /// Decode a concatenation of TLVs until the buffer is exhausted
    pub fn decode_all(data: &[u8]) -> RspResult<Vec<Self>> {
        Self::decode_all_at(data, 0)
    }

    /// Decode one TLV from the start of the buffer
    ///
    /// # Returns
    /// `(Tlv, bytes_consumed)`
    ///
    /// # Errors
    /// `UnsupportedEncoding` when constructed nodes nest deeper than
    /// [`MAX_DEPTH`].
    pub fn decode_prefix(data: &[u8]) -> RspResult<(Self, usize)> {
        Self::decode_prefix_at(data, 0)
    }

    fn decode_all_at(mut data: &[u8], depth: usize) -> RspResult<Vec<Self>> {
        let mut nodes = Vec::new();
        while !data.is_empty() {
            let (tlv, consumed) = Self::decode_prefix_at(data, depth)?;
            nodes.push(tlv);
            data = &data[consumed..];
        }
        Ok(nodes)
    }

    /// Encodings of the immediate children of one constructed TLV, sliced
    /// from `data` as they were received
    ///
    /// Only headers are parsed, so children are never re-encoded.
    ///
    /// # Errors
    /// `MalformedEncoding` if `data` is not exactly one TLV or a child
    /// overruns its parent; `Decode` if the node is primitive.
    pub fn child_encodings(data: &[u8]) -> RspResult<Vec<&[u8]>> {
        let (tag, header_len, value_len) = Self::header(data)?;
        if header_len + value_len != data.len() {
            return Err(RspError::MalformedEncoding(format!(
                "{} trailing bytes after {} TLV",
                data.len() - header_len - value_len,
                tag
            )));
        }
        if !tag.is_constructed() {
            return Err(RspError::Decode(format!("{} is not constructed", tag)));
        }

        let mut value = &data[header_len..];
        let mut children = Vec::new();
        while !value.is_empty() {
            let (_, child_header, child_value) = Self::header(value)?;
            let (child, rest) = value.split_at(child_header + child_value);
            children.push(child);
            value = rest;
        }
        Ok(children)
    }

    /// Tag, header size and value size of the TLV at the start of `data`
    fn header(data: &[u8]) -> RspResult<(Tag, usize, usize)> {
        let (tag, tag_len) = Tag::decode(data)?;
        let (length, length_len) = Length::decode(&data[tag_len..])?;

        let header_len = tag_len + length_len;
        let value_len = length.value();
        let available = data.len() - header_len;
        if value_len > available {
            return Err(RspError::MalformedEncoding(format!(
                "Declared length {} of {} exceeds remaining {} bytes",
                value_len, tag, available
            )));
        }
        Ok((tag, header_len, value_len))
    }

    fn decode_prefix_at(data: &[u8], depth: usize) -> RspResult<(Self, usize)> {
        let (tag, header_len, value_len) = Self::header(data)?;

        let value = &data[header_len..header_len + value_len];
        let tlv = if tag.is_constructed() {
            if depth >= MAX_DEPTH {
                return Err(RspError::UnsupportedEncoding(format!(
                    "Constructed {} nested deeper than {} levels",
                    tag, MAX_DEPTH
                )));
            }
            Self::constructed(tag, Self::decode_all_at(value, depth + 1)?)
        } else {
            Self::primitive(tag, value)
        };

        Ok((tlv, header_len + value_len))
    }

    /// Encode this node with canonical lengths
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Encode only the tag and length header of this node
    ///
    /// Used when a constructed node is streamed child by child.
    pub fn encode_header(&self) -> Vec<u8> {
        let mut out = self.tag.encode();
        out.extend(Length::new(self.value_len()).encode());
        out
    }

    /// Total encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        let value_len = self.value_len();
        self.tag.encode().len() + Length::new(value_len).encode().len() + value_len
    }

    fn value_len(&self) -> usize {
        if self.tag.is_constructed() {
            self.children.iter().map(Tlv::encoded_len).sum()
        } else {
            self.value.len()
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend(self.encode_header());
        if self.tag.is_constructed() {
            for child in &self.children {
                child.encode_into(out);
            }
        } else {
            out.extend_from_slice(&self.value);
        }
    }

    fn encode_children(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.value_len());
        for child in &self.children {
            child.encode_into(&mut out);
        }
        out
    }
}

/// Conversion of a domain structure into its TLV form
pub trait TlvMarshal {
    fn to_tlv(&self) -> RspResult<Tlv>;

    fn to_bytes(&self) -> RspResult<Vec<u8>> {
        Ok(self.to_tlv()?.encode())
    }
}

/// Construction of a domain structure from its TLV form
///
/// Implementations check the root tag, walk the immediate children once,
/// dispatch on the exact tag and skip anything they do not recognise.
pub trait TlvUnmarshal: Sized {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self>;

    fn from_bytes(data: &[u8]) -> RspResult<Self> {
        Self::from_tlv(&Tlv::decode(data)?)
    }
}
