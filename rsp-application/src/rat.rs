//! Rules Authorisation Table (`GetRAT`)

use crate::error::RspResult;
use crate::euicc_info::PPR_IDS;
use crate::tags::{self, ctx, ctx_constructed};
use rsp_asn1::primitive::decode_named_bits;
use rsp_asn1::{Tlv, TlvMarshal, TlvUnmarshal};
use serde::Serialize;

/// Flags attached to a policy rule, in bit order
pub const PPR_FLAGS: &[&str] = &["consentRequired"];

/// Operator a rule applies to; values are hex of the raw bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorId {
    pub mcc_mnc: String,
    pub gid1: Option<String>,
    pub gid2: Option<String>,
}

impl TlvUnmarshal for OperatorId {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::SEQUENCE, "OperatorId")?;

        let mut operator = Self::default();
        for child in tlv.children() {
            let value = hex::encode_upper(&*child.value());
            if child.tag() == ctx(0) {
                operator.mcc_mnc = value;
            } else if child.tag() == ctx(1) {
                operator.gid1 = Some(value);
            } else if child.tag() == ctx(2) {
                operator.gid2 = Some(value);
            }
        }
        Ok(operator)
    }
}

/// One `ProfilePolicyAuthorisationRule`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesAuthorisationTable {
    pub ppr_ids: Vec<&'static str>,
    pub allowed_operators: Vec<OperatorId>,
    pub ppr_flags: Vec<&'static str>,
}

impl TlvUnmarshal for RulesAuthorisationTable {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::SEQUENCE, "ProfilePolicyAuthorisationRule")?;

        let mut rule = Self::default();
        for child in tlv.children() {
            if child.tag() == ctx(0) {
                rule.ppr_ids = decode_named_bits(&child.value(), PPR_IDS)?;
            } else if child.tag() == ctx_constructed(1) {
                rule.allowed_operators = child
                    .children()
                    .iter()
                    .map(OperatorId::from_tlv)
                    .collect::<RspResult<Vec<_>>>()?;
            } else if child.tag() == ctx(2) {
                rule.ppr_flags = decode_named_bits(&child.value(), PPR_FLAGS)?;
            }
        }
        Ok(rule)
    }
}

/// `GetRAT` request
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRatRequest;

impl TlvMarshal for GetRatRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(tags::GET_RAT, Vec::new()))
    }
}

/// `GetRAT` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatResponse(pub Vec<RulesAuthorisationTable>);

impl TlvUnmarshal for RatResponse {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::GET_RAT, "RulesAuthorisationTable")?;
        tlv.children()
            .iter()
            .filter(|child| child.tag() == tags::SEQUENCE)
            .map(RulesAuthorisationTable::from_tlv)
            .collect::<RspResult<Vec<_>>>()
            .map(Self)
    }
}
