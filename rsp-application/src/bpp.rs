//! Bound Profile Package segmentation
//!
//! A BPP (BF36) is loaded as a series of independent STORE DATA sequences.
//! The segments are cut from the received bytes without re-encoding:
//!
//! 1. BF36 header together with InitialiseSecureChannel (BF23)
//! 2. firstSequenceOf87 (A0) with its ConfigureISDP content
//! 3. sequenceOf88 header (A1), then each StoreMetadata block (88)
//! 4. secondSequenceOf87 (A2) with its ReplaceSessionKeys, when present
//! 5. sequenceOf86 header (A3), then each profile element block (86)

use crate::error::{RspError, RspResult};
use crate::tags::{self, ctx_constructed};
use rsp_asn1::{Length, Tag};
use std::fmt;
use std::iter::Peekable;

/// Role of one BPP segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    InitialiseSecureChannel,
    ConfigureIsdp,
    StoreMetadataHeader,
    StoreMetadata,
    ReplaceSessionKeys,
    ProfileElementsHeader,
    ProfileElement,
}

impl SegmentKind {
    /// True once segments start writing profile content to the eUICC
    pub fn is_installing(&self) -> bool {
        matches!(self, SegmentKind::ProfileElementsHeader | SegmentKind::ProfileElement)
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentKind::InitialiseSecureChannel => "InitialiseSecureChannel",
            SegmentKind::ConfigureIsdp => "ConfigureISDP",
            SegmentKind::StoreMetadataHeader => "StoreMetadata header",
            SegmentKind::StoreMetadata => "StoreMetadata",
            SegmentKind::ReplaceSessionKeys => "ReplaceSessionKeys",
            SegmentKind::ProfileElementsHeader => "ProfileElements header",
            SegmentKind::ProfileElement => "ProfileElement",
        };
        f.write_str(name)
    }
}

/// One STORE DATA sequence worth of BPP bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BppSegment {
    pub kind: SegmentKind,
    pub data: Vec<u8>,
}

/// Position of one TLV inside the package buffer
#[derive(Debug, Clone, Copy)]
struct Span {
    tag: Tag,
    start: usize,
    value_start: usize,
    end: usize,
}

fn read_span(data: &[u8], start: usize) -> RspResult<Span> {
    let rest = &data[start..];
    let (tag, tag_len) = Tag::decode(rest)?;
    let (length, length_len) = Length::decode(&rest[tag_len..])?;
    let value_start = start + tag_len + length_len;
    let end = value_start + length.value();
    if end > data.len() {
        return Err(RspError::MalformedEncoding(format!(
            "{} declares {} bytes, {} available",
            tag,
            length.value(),
            data.len() - value_start
        )));
    }
    Ok(Span {
        tag,
        start,
        value_start,
        end,
    })
}

fn children(data: &[u8], parent: Span) -> RspResult<Vec<Span>> {
    let mut spans = Vec::new();
    let mut offset = parent.value_start;
    while offset < parent.end {
        let span = read_span(&data[..parent.end], offset)?;
        offset = span.end;
        spans.push(span);
    }
    Ok(spans)
}

/// Split an encoded BPP into its loading segments, in sending order
///
/// # Errors
/// `UnexpectedTag` if the root is not BF36 or a mandatory part is missing
/// or out of order; codec errors for truncated input.
pub fn segment_bound_profile_package(bpp: &[u8]) -> RspResult<Vec<BppSegment>> {
    let root = read_span(bpp, 0)?;
    if root.tag != tags::BOUND_PROFILE_PACKAGE {
        return Err(RspError::UnexpectedTag {
            context: "BoundProfilePackage",
            tag: root.tag.to_string(),
        });
    }
    if root.end != bpp.len() {
        return Err(RspError::MalformedEncoding(format!(
            "{} trailing bytes after BoundProfilePackage",
            bpp.len() - root.end
        )));
    }

    let mut parts = children(bpp, root)?.into_iter().peekable();
    let mut segments = Vec::new();
    let slice = |from: usize, to: usize| bpp[from..to].to_vec();

    let secure_channel = next_part(&mut parts, tags::INITIALISE_SECURE_CHANNEL, "initialiseSecureChannelRequest")?;
    segments.push(BppSegment {
        kind: SegmentKind::InitialiseSecureChannel,
        data: slice(root.start, secure_channel.end),
    });

    let configure = next_part(&mut parts, ctx_constructed(0), "firstSequenceOf87")?;
    segments.push(BppSegment {
        kind: SegmentKind::ConfigureIsdp,
        data: slice(configure.start, configure.end),
    });

    let metadata = next_part(&mut parts, ctx_constructed(1), "sequenceOf88")?;
    segments.push(BppSegment {
        kind: SegmentKind::StoreMetadataHeader,
        data: slice(metadata.start, metadata.value_start),
    });
    for block in children(bpp, metadata)? {
        segments.push(BppSegment {
            kind: SegmentKind::StoreMetadata,
            data: slice(block.start, block.end),
        });
    }

    if parts.peek().is_some_and(|span| span.tag == ctx_constructed(2)) {
        let keys = next_part(&mut parts, ctx_constructed(2), "secondSequenceOf87")?;
        segments.push(BppSegment {
            kind: SegmentKind::ReplaceSessionKeys,
            data: slice(keys.start, keys.end),
        });
    }

    let elements = next_part(&mut parts, ctx_constructed(3), "sequenceOf86")?;
    segments.push(BppSegment {
        kind: SegmentKind::ProfileElementsHeader,
        data: slice(elements.start, elements.value_start),
    });
    for block in children(bpp, elements)? {
        segments.push(BppSegment {
            kind: SegmentKind::ProfileElement,
            data: slice(block.start, block.end),
        });
    }

    Ok(segments)
}

fn next_part(
    parts: &mut Peekable<std::vec::IntoIter<Span>>,
    tag: Tag,
    context: &'static str,
) -> RspResult<Span> {
    match parts.next() {
        Some(span) if span.tag == tag => Ok(span),
        Some(span) => Err(RspError::UnexpectedTag {
            context,
            tag: span.tag.to_string(),
        }),
        None => Err(RspError::Decode(format!("BoundProfilePackage is missing {}", context))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const BPP: [u8; 31] = hex!(
        "BF36 1C
           BF23 02 8000
           A0 03 870101
           A1 06 880102 880103
           A2 03 870104
           A3 03 860105"
    );

    #[test]
    fn test_segments_in_order() {
        let segments = segment_bound_profile_package(&BPP).unwrap();
        let kinds: Vec<SegmentKind> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::InitialiseSecureChannel,
                SegmentKind::ConfigureIsdp,
                SegmentKind::StoreMetadataHeader,
                SegmentKind::StoreMetadata,
                SegmentKind::StoreMetadata,
                SegmentKind::ReplaceSessionKeys,
                SegmentKind::ProfileElementsHeader,
                SegmentKind::ProfileElement,
            ]
        );
        assert_eq!(segments[0].data, hex!("BF361C BF23028000").to_vec());
        assert_eq!(segments[2].data, hex!("A106").to_vec());
        assert_eq!(segments[6].data, hex!("A303").to_vec());
        assert_eq!(segments[7].data, hex!("860105").to_vec());
    }

    #[test]
    fn test_segments_without_session_keys() {
        let bpp = hex!(
            "BF36 17
               BF23 02 8000
               A0 03 870101
               A1 06 880102 880103
               A3 03 860105"
        );
        let segments = segment_bound_profile_package(&bpp).unwrap();
        assert_eq!(segments.len(), 7);
        assert!(segments.iter().all(|s| s.kind != SegmentKind::ReplaceSessionKeys));
        assert!(segments[5].kind.is_installing());
    }

    #[test]
    fn test_reordered_package_is_rejected() {
        let bpp = hex!("BF36 0A A0 03 870101 BF23 02 8000");
        assert!(matches!(
            segment_bound_profile_package(&bpp),
            Err(RspError::UnexpectedTag { .. })
        ));
    }

    #[test]
    fn test_wrong_root() {
        assert!(matches!(
            segment_bound_profile_package(&hex!("BF3700")),
            Err(RspError::UnexpectedTag { .. })
        ));
    }
}
