//! Discovered events returned by an SM-DS

use crate::error::RspResult;
use crate::tags::{self, ctx};
use rsp_asn1::primitive::decode_text;
use rsp_asn1::{Tlv, TlvMarshal, TlvUnmarshal};
use serde::{Deserialize, Serialize};

/// Pending profile event: an event id and the SM-DP+ holding the profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEntry {
    pub event_id: String,
    pub rsp_server_address: String,
}

impl TlvUnmarshal for EventEntry {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::SEQUENCE, "EventEntries")?;
        Ok(Self {
            event_id: decode_text(&tlv.require(ctx(0), "eventId")?.value())?,
            rsp_server_address: decode_text(&tlv.require(ctx(1), "rspServerAddress")?.value())?,
        })
    }
}

impl TlvMarshal for EventEntry {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(
            tags::SEQUENCE,
            vec![
                Tlv::primitive(ctx(0), self.event_id.as_bytes()),
                Tlv::primitive(ctx(1), self.rsp_server_address.as_bytes()),
            ],
        ))
    }
}
