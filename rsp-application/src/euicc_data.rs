//! Small ES10 identity functions: EID, challenge and configured addresses

use crate::error::RspResult;
use crate::tags::{self, ctx};
use rsp_asn1::primitive::decode_text;
use rsp_asn1::{Tlv, TlvMarshal, TlvUnmarshal};
use rsp_core::Eid;
use serde::Serialize;

/// `GetEuiccData` asking for the EID only
#[derive(Debug, Clone, Copy, Default)]
pub struct GetEidRequest;

impl TlvMarshal for GetEidRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(
            tags::GET_EUICC_DATA,
            vec![Tlv::primitive(tags::TAG_LIST, vec![0x5A])],
        ))
    }
}

/// `GetEuiccData` response carrying the EID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EidResponse(pub Eid);

impl TlvUnmarshal for EidResponse {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::GET_EUICC_DATA, "GetEuiccData")?;
        Ok(Self(Eid::new(tlv.require(tags::EID, "eidValue")?.value().to_vec())))
    }
}

/// `GetEuiccChallenge` request
#[derive(Debug, Clone, Copy, Default)]
pub struct GetEuiccChallengeRequest;

impl TlvMarshal for GetEuiccChallengeRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(tags::GET_EUICC_CHALLENGE, Vec::new()))
    }
}

/// Fresh random challenge generated by the eUICC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EuiccChallenge(pub Vec<u8>);

impl TlvUnmarshal for EuiccChallenge {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::GET_EUICC_CHALLENGE, "GetEuiccChallenge")?;
        Ok(Self(tlv.require(ctx(0), "euiccChallenge")?.value().to_vec()))
    }
}

/// `GetEuiccInfo1` request
#[derive(Debug, Clone, Copy, Default)]
pub struct GetEuiccInfo1Request;

impl TlvMarshal for GetEuiccInfo1Request {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(tags::GET_EUICC_INFO1, Vec::new()))
    }
}

/// `GetEuiccInfo2` request
#[derive(Debug, Clone, Copy, Default)]
pub struct GetEuiccInfo2Request;

impl TlvMarshal for GetEuiccInfo2Request {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(tags::GET_EUICC_INFO2, Vec::new()))
    }
}

/// `GetEuiccConfiguredAddresses` request
#[derive(Debug, Clone, Copy, Default)]
pub struct GetConfiguredAddressesRequest;

impl TlvMarshal for GetConfiguredAddressesRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(tags::GET_CONFIGURED_ADDRESSES, Vec::new()))
    }
}

/// Default SM-DP+ and root SM-DS addresses stored on the eUICC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredAddresses {
    pub default_dp_address: Option<String>,
    pub root_ds_address: Option<String>,
}

impl TlvUnmarshal for ConfiguredAddresses {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::GET_CONFIGURED_ADDRESSES, "EuiccConfiguredAddresses")?;

        let mut addresses = Self::default();
        for child in tlv.children() {
            if child.tag() == ctx(0) {
                addresses.default_dp_address = Some(decode_text(&child.value())?);
            } else if child.tag() == ctx(1) {
                addresses.root_ds_address = Some(decode_text(&child.value())?);
            }
        }
        Ok(addresses)
    }
}

impl TlvMarshal for ConfiguredAddresses {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut tlv = Tlv::constructed(tags::GET_CONFIGURED_ADDRESSES, Vec::new());
        if let Some(address) = &self.default_dp_address {
            tlv.push(Tlv::primitive(ctx(0), address.as_bytes()));
        }
        if let Some(address) = &self.root_ds_address {
            tlv.push(Tlv::primitive(ctx(1), address.as_bytes()));
        }
        Ok(tlv)
    }
}
