//! Typed readers and writers over TLV value bytes
//!
//! These helpers operate on the raw value region of a primitive node and
//! know nothing about which structure the value belongs to.

use crate::ber::Tlv;
use crate::error::{RspError, RspResult};

/// Decode a two's complement big-endian INTEGER, sign-extended to `i64`
///
/// # Errors
/// `MalformedEncoding` for an empty value, `UnsupportedEncoding` for more
/// than 8 bytes.
pub fn decode_integer(bytes: &[u8]) -> RspResult<i64> {
    if bytes.is_empty() {
        return Err(RspError::MalformedEncoding("Empty integer encoding".to_string()));
    }
    if bytes.len() > 8 {
        return Err(RspError::UnsupportedEncoding(format!(
            "Integer too large: {} bytes (max 8)",
            bytes.len()
        )));
    }

    let mut value = 0i64;
    for &byte in bytes {
        value = (value << 8) | byte as i64;
    }

    // Sign extend from the declared width
    let shift = 64 - bytes.len() * 8;
    if shift > 0 {
        value = (value << shift) >> shift;
    }

    Ok(value)
}

/// Encode an INTEGER in the minimal number of bytes that preserves its sign
pub fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Decode an unsigned big-endian quantity
///
/// Chips are not consistent about prefixing a zero byte to values whose top
/// bit is set, so the value is read as unsigned regardless of its first bit.
pub fn decode_unsigned(bytes: &[u8]) -> RspResult<u64> {
    if bytes.is_empty() {
        return Err(RspError::MalformedEncoding("Empty integer encoding".to_string()));
    }
    let significant = &bytes[bytes.iter().take_while(|&&b| b == 0).count().min(bytes.len() - 1)..];
    if significant.len() > 8 {
        return Err(RspError::UnsupportedEncoding(format!(
            "Unsigned value too large: {} bytes (max 8)",
            significant.len()
        )));
    }
    Ok(significant.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

/// Decode an unsigned value that must fit 32 bits
pub fn decode_u32(bytes: &[u8]) -> RspResult<u32> {
    let value = decode_unsigned(bytes)?;
    u32::try_from(value).map_err(|_| {
        RspError::UnsupportedEncoding(format!("Value {} does not fit 32 bits", value))
    })
}

/// Encode a non-negative INTEGER
pub fn encode_unsigned(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().take_while(|&&b| b == 0).count().min(7);
    let mut out = Vec::with_capacity(9 - start);
    if bytes[start] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(&bytes[start..]);
    out
}

/// Decode a BOOLEAN
pub fn decode_boolean(bytes: &[u8]) -> RspResult<bool> {
    match bytes {
        [b] => Ok(*b != 0),
        _ => Err(RspError::MalformedEncoding(format!(
            "BOOLEAN must be 1 byte, got {}",
            bytes.len()
        ))),
    }
}

/// Encode a BOOLEAN using DER's canonical true value
pub fn encode_boolean(value: bool) -> Vec<u8> {
    vec![if value { 0xFF } else { 0x00 }]
}

/// Decode a BIT STRING into the names of its set bits
///
/// The first octet is the count of unused low-order bits in the final
/// octet. Bits are read MSB-first; bit position `i` maps to `names[i]`.
/// Set bits beyond the table are dropped.
///
/// # Errors
/// `MalformedEncoding` when the unused-bit count is above 7, or non-zero
/// with no bit octets.
pub fn decode_named_bits(bytes: &[u8], names: &[&'static str]) -> RspResult<Vec<&'static str>> {
    let Some((&unused, bits)) = bytes.split_first() else {
        return Ok(Vec::new());
    };
    if unused > 7 || (bits.is_empty() && unused != 0) {
        return Err(RspError::MalformedEncoding(format!(
            "Invalid unused bit count {} for {} bit octets",
            unused,
            bits.len()
        )));
    }

    let total_bits = bits.len() * 8 - unused as usize;
    let result = (0..total_bits.min(names.len()))
        .filter(|&index| bits[index / 8] & (0x80 >> (index % 8)) != 0)
        .map(|index| names[index])
        .collect();

    Ok(result)
}

/// Encode named flags as a BIT STRING value
///
/// Trailing zero bits are trimmed, as DER does for named bit lists. Names
/// missing from the table are rejected.
pub fn encode_named_bits(set: &[&str], names: &[&'static str]) -> RspResult<Vec<u8>> {
    let mut positions = Vec::with_capacity(set.len());
    for name in set {
        let position = names.iter().position(|n| n == name).ok_or_else(|| {
            RspError::Decode(format!("Unknown flag name '{}'", name))
        })?;
        positions.push(position);
    }

    let Some(&highest) = positions.iter().max() else {
        return Ok(vec![0x00]);
    };

    let octets = highest / 8 + 1;
    let mut out = vec![0u8; 1 + octets];
    out[0] = (7 - highest % 8) as u8;
    for position in positions {
        out[1 + position / 8] |= 0x80 >> (position % 8);
    }
    Ok(out)
}

/// Decode a version value
///
/// Three bytes give `major.minor.patch`. Any other length is joined byte by
/// byte, which tolerates chips that pad or truncate version fields.
pub fn decode_version(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Encode a dotted version as one byte per component
pub fn encode_version(version: &str) -> RspResult<Vec<u8>> {
    version
        .split('.')
        .map(|part| {
            part.parse::<u8>()
                .map_err(|_| RspError::Decode(format!("Invalid version '{}'", version)))
        })
        .collect()
}

/// Decode a UTF-8 text value
pub fn decode_text(bytes: &[u8]) -> RspResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| RspError::MalformedEncoding(format!("Invalid UTF-8 string: {}", e)))
}

/// Map the children of an identifier list to lowercase hex strings
pub fn decode_identifier_list(tlv: &Tlv) -> Vec<String> {
    tlv.children()
        .iter()
        .map(|child| child.value())
        .filter(|value| !value.is_empty())
        .map(|value| hex::encode(&*value))
        .collect()
}

/// Decode nibble-swapped BCD digits, dropping `F` padding
///
/// This is the ICCID and IMEI layout: `98 10 32 F4` reads as `8901234`.
pub fn decode_swapped_bcd(bytes: &[u8]) -> String {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        for nibble in [byte & 0x0F, byte >> 4] {
            if nibble == 0x0F {
                continue;
            }
            digits.push(char::from_digit(nibble as u32, 16).unwrap_or('?').to_ascii_uppercase());
        }
    }
    digits
}

/// Encode digits as nibble-swapped BCD, padding an odd count with `F`
pub fn encode_swapped_bcd(digits: &str) -> RspResult<Vec<u8>> {
    let nibbles = digits
        .chars()
        .map(|c| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| RspError::Decode(format!("Invalid BCD digit '{}' in '{}'", c, digits)))
        })
        .collect::<RspResult<Vec<u8>>>()?;

    Ok(nibbles
        .chunks(2)
        .map(|pair| {
            let low = pair[0];
            let high = pair.get(1).copied().unwrap_or(0x0F);
            (high << 4) | low
        })
        .collect())
}
