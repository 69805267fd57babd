//! BER encoding types (Tag, Length)

use crate::error::{RspError, RspResult};
use std::fmt;

/// Maximum number of base-128 continuation octets accepted in a tag
const MAX_TAG_CONTINUATION_OCTETS: usize = 4;

/// Maximum number of length octets accepted in the long form
const MAX_LENGTH_OCTETS: usize = 4;

/// BER Tag Class
///
/// Tag classes let different specifications reuse the same tag numbers:
/// context-specific `[4]` and universal OCTET STRING are both number 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl TagClass {
    /// Get tag class from the top two bits of the first tag byte
    pub fn from_bits(byte: u8) -> Self {
        match (byte >> 6) & 0x03 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    /// Convert tag class to bits (for encoding)
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// BER Tag
///
/// Identifies a value by class, form (primitive or constructed) and number.
/// Two tags are equal only when all three agree, which is how the structure
/// layer dispatches children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    class: TagClass,
    constructed: bool,
    number: u32,
}

impl Tag {
    /// Create a new BER tag
    pub const fn new(class: TagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    /// Create a Universal class tag
    pub const fn universal(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Universal, constructed, number)
    }

    /// Create an Application class tag
    pub const fn application(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Application, constructed, number)
    }

    /// Create a Context-specific class tag
    pub const fn context_specific(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::ContextSpecific, constructed, number)
    }

    /// Create a Private class tag
    pub const fn private(constructed: bool, number: u32) -> Self {
        Self::new(TagClass::Private, constructed, number)
    }

    /// Get tag class
    pub fn class(&self) -> TagClass {
        self.class
    }

    /// Check if tag is constructed
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Get tag number
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Match the exact (class, form, number) triple
    pub fn is(&self, class: TagClass, constructed: bool, number: u32) -> bool {
        self.class == class && self.constructed == constructed && self.number == number
    }

    /// Encode tag to bytes
    ///
    /// Numbers up to 30 fit the first byte; larger numbers use the
    /// high-tag-number form.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(2);
        let class_bits = self.class.to_bits();
        let constructed_bit = if self.constructed { 0x20 } else { 0x00 };

        if self.number <= 30 {
            result.push(class_bits | constructed_bit | self.number as u8);
        } else {
            result.push(class_bits | constructed_bit | 0x1F);

            let mut remaining = self.number;
            let mut bytes = Vec::new();
            while remaining > 0 {
                bytes.push((remaining & 0x7F) as u8);
                remaining >>= 7;
            }

            // Continuation bit on all but the last octet
            for (i, &byte) in bytes.iter().rev().enumerate() {
                if i < bytes.len() - 1 {
                    result.push(byte | 0x80);
                } else {
                    result.push(byte);
                }
            }
        }

        result
    }

    /// Decode tag from bytes
    ///
    /// # Returns
    /// `(Tag, bytes_consumed)`
    ///
    /// # Errors
    /// `MalformedEncoding` when the buffer ends inside the tag or the
    /// high-tag-number form is not minimal, `UnsupportedEncoding` when the
    /// number does not fit 28 bits.
    pub fn decode(data: &[u8]) -> RspResult<(Self, usize)> {
        let Some(&first_byte) = data.first() else {
            return Err(RspError::MalformedEncoding(
                "Empty buffer for tag decoding".to_string(),
            ));
        };

        let class = TagClass::from_bits(first_byte);
        let constructed = (first_byte & 0x20) != 0;
        let tag_bits = first_byte & 0x1F;

        if tag_bits < 0x1F {
            return Ok((Self::new(class, constructed, tag_bits as u32), 1));
        }

        let mut number = 0u32;
        let mut pos = 1;
        loop {
            let Some(&byte) = data.get(pos) else {
                return Err(RspError::MalformedEncoding(format!(
                    "Tag runs past end of buffer after {} bytes",
                    pos
                )));
            };
            if pos == 1 && byte == 0x80 {
                return Err(RspError::MalformedEncoding(
                    "Tag number has a leading zero octet".to_string(),
                ));
            }
            pos += 1;
            if pos - 1 > MAX_TAG_CONTINUATION_OCTETS {
                return Err(RspError::UnsupportedEncoding(format!(
                    "Tag number longer than {} octets",
                    MAX_TAG_CONTINUATION_OCTETS
                )));
            }
            number = (number << 7) | (byte & 0x7F) as u32;
            if byte & 0x80 == 0 {
                break;
            }
        }

        if number <= 30 {
            return Err(RspError::MalformedEncoding(format!(
                "Tag number {} in high-tag-number form",
                number
            )));
        }

        Ok((Self::new(class, constructed, number), pos))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.encode()))
    }
}

/// BER Length encoding
///
/// Short form covers 0-127; the long form carries a length-of-length
/// prefix. `Length::new` always picks the shortest form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    /// Short form: length 0-127
    Short(u8),
    /// Long form: length-of-length prefix then big-endian octets
    Long(usize),
}

impl Length {
    /// Create the canonical length for a value
    pub fn new(length: usize) -> Self {
        if length < 0x80 {
            Length::Short(length as u8)
        } else {
            Length::Long(length)
        }
    }

    /// Get the length value
    pub fn value(&self) -> usize {
        match self {
            Length::Short(l) => *l as usize,
            Length::Long(l) => *l,
        }
    }

    /// Encode length to bytes using the minimal number of octets
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Length::Short(length) => vec![*length],
            Length::Long(length) => {
                let octets = length.to_be_bytes();
                let skip = octets.iter().take_while(|&&b| b == 0).count();
                let significant = &octets[skip.min(octets.len() - 1)..];

                let mut result = Vec::with_capacity(1 + significant.len());
                result.push(0x80 | significant.len() as u8);
                result.extend_from_slice(significant);
                result
            }
        }
    }

    /// Decode length from bytes
    ///
    /// # Returns
    /// `(Length, bytes_consumed)`
    ///
    /// # Errors
    /// - `MalformedEncoding` if the buffer is empty or shorter than the
    ///   announced number of length octets
    /// - `UnsupportedEncoding` for the indefinite form or more than four
    ///   length octets
    pub fn decode(data: &[u8]) -> RspResult<(Self, usize)> {
        let Some(&first_byte) = data.first() else {
            return Err(RspError::MalformedEncoding(
                "Empty buffer for length decoding".to_string(),
            ));
        };

        if first_byte & 0x80 == 0 {
            return Ok((Length::Short(first_byte), 1));
        }

        let num_bytes = (first_byte & 0x7F) as usize;
        if num_bytes == 0 {
            return Err(RspError::UnsupportedEncoding(
                "Indefinite length encoding not supported".to_string(),
            ));
        }
        if num_bytes > MAX_LENGTH_OCTETS {
            return Err(RspError::UnsupportedEncoding(format!(
                "Length encoding too large: {} octets (max {})",
                num_bytes, MAX_LENGTH_OCTETS
            )));
        }
        if data.len() < 1 + num_bytes {
            return Err(RspError::MalformedEncoding(format!(
                "Buffer too short for long form length: need {} bytes, got {}",
                1 + num_bytes,
                data.len()
            )));
        }

        let length = data[1..=num_bytes]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);

        Ok((Length::Long(length), 1 + num_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_short_form() {
        let tag = Tag::universal(false, 2);
        assert_eq!(tag.encode(), vec![0x02]);
        assert_eq!(Tag::context_specific(true, 0).encode(), vec![0xA0]);
        assert_eq!(Tag::private(true, 3).encode(), vec![0xE3]);
    }

    #[test]
    fn test_tag_high_number_form() {
        assert_eq!(Tag::context_specific(true, 34).encode(), vec![0xBF, 0x22]);
        assert_eq!(Tag::context_specific(false, 112).encode(), vec![0x9F, 0x70]);
        assert_eq!(Tag::application(false, 55).encode(), vec![0x5F, 0x37]);
        assert_eq!(Tag::universal(false, 200).encode(), vec![0x1F, 0x81, 0x48]);
    }

    #[test]
    fn test_tag_decode() {
        let (tag, consumed) = Tag::decode(&[0xBF, 0x22, 0x00]).unwrap();
        assert_eq!(consumed, 2);
        assert!(tag.is(TagClass::ContextSpecific, true, 34));

        let (tag, consumed) = Tag::decode(&[0x1F, 0x81, 0x48]).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(tag.number(), 200);
        assert_eq!(tag.class(), TagClass::Universal);
    }

    #[test]
    fn test_tag_truncated() {
        assert!(matches!(
            Tag::decode(&[0xBF]),
            Err(RspError::MalformedEncoding(_))
        ));
        assert!(matches!(
            Tag::decode(&[0xBF, 0x81]),
            Err(RspError::MalformedEncoding(_))
        ));
        assert!(matches!(Tag::decode(&[]), Err(RspError::MalformedEncoding(_))));
    }

    #[test]
    fn test_tag_non_minimal_rejected() {
        let fixtures: [&[u8]; 4] = [&[0x1F, 0x05], &[0x1F, 0x1E], &[0x1F, 0x80, 0x85], &[0xBF, 0x80, 0x22]];
        for data in fixtures {
            assert!(
                matches!(Tag::decode(data), Err(RspError::MalformedEncoding(_))),
                "{:02X?}",
                data
            );
        }
        // 31 is the smallest number needing the high form
        let (tag, consumed) = Tag::decode(&[0x1F, 0x1F]).unwrap();
        assert_eq!((tag.number(), consumed), (31, 2));
        assert_eq!(tag.encode(), vec![0x1F, 0x1F]);
    }

    #[test]
    fn test_same_number_different_class() {
        let ctx = Tag::context_specific(false, 4);
        let uni = Tag::universal(false, 4);
        assert_ne!(ctx, uni);
        assert_eq!(ctx.to_string(), "84");
        assert_eq!(uni.to_string(), "04");
    }

    #[test]
    fn test_length_short_and_long() {
        assert_eq!(Length::new(100).encode(), vec![100]);
        assert_eq!(Length::new(0x80).encode(), vec![0x81, 0x80]);
        assert_eq!(Length::new(1000).encode(), vec![0x82, 0x03, 0xE8]);
        assert_eq!(Length::new(0x01_00_00).encode(), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_length_decode() {
        assert_eq!(Length::decode(&[100]).unwrap(), (Length::Short(100), 1));
        let (length, consumed) = Length::decode(&[0x82, 0x03, 0xE8]).unwrap();
        assert_eq!((length.value(), consumed), (1000, 3));
        // Non-canonical long form still decodes
        let (length, consumed) = Length::decode(&[0x81, 0x05]).unwrap();
        assert_eq!((length.value(), consumed), (5, 2));
    }

    #[test]
    fn test_length_errors() {
        assert!(matches!(
            Length::decode(&[0x80]),
            Err(RspError::UnsupportedEncoding(_))
        ));
        assert!(matches!(
            Length::decode(&[0x83, 0x01]),
            Err(RspError::MalformedEncoding(_))
        ));
        assert!(matches!(
            Length::decode(&[0x85, 1, 2, 3, 4, 5]),
            Err(RspError::UnsupportedEncoding(_))
        ));
    }
}
