//! eUICC information records (EUICCInfo1, EUICCInfo2)
//!
//! EUICCInfo2 is the chip's self-description: versions, free memory,
//! capability flags, trusted CI key identifiers and certification data.
//! EUICCInfo1 is a subset sent verbatim to servers during authentication.

use crate::error::{RspError, RspResult};
use crate::tags::{self, ctx, ctx_constructed};
use rsp_asn1::primitive::{
    decode_identifier_list, decode_integer, decode_named_bits, decode_text, decode_u32,
    decode_version, encode_integer, encode_named_bits, encode_unsigned, encode_version,
};
use rsp_asn1::{Tag, TagClass, Tlv, TlvMarshal, TlvUnmarshal};
use serde::Serialize;

/// UICC capability bits, in bit order
pub const UICC_CAPABILITY: &[&str] = &[
    "contactlessSupport",
    "usimSupport",
    "isimSupport",
    "csimSupport",
    "akaMilenage",
    "akaCave",
    "akaTuak128",
    "akaTuak256",
    "rfu1",
    "rfu2",
    "gbaAuthenUsim",
    "gbaAuthenISim",
    "mbmsAuthenUsim",
    "eapClient",
    "javacard",
    "multos",
    "multipleUsimSupport",
    "multipleIsimSupport",
    "multipleCsimSupport",
    "berTlvFileSupport",
    "dfLinkSupport",
    "catTp",
    "getIdentity",
    "profile-a-x25519",
    "profile-b-p256",
    "suciCalculatorApi",
];

/// RSP capability bits, in bit order
pub const RSP_CAPABILITY: &[&str] = &[
    "additionalProfile",
    "crlSupport",
    "rpmSupport",
    "testProfileSupport",
    "deviceInfoExtensibilitySupport",
];

/// Profile policy rule identifiers, in bit order
pub const PPR_IDS: &[&str] = &["pprUpdateControl", "ppr1", "ppr2", "ppr3"];

/// Extended card resource: memory and application counters
///
/// On the wire this is a primitive `[4]` OCTET STRING whose content is a
/// complete TLV sequence. The content is decoded by running the TLV codec a
/// second time over the raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtCardResource {
    pub installed_application: u32,
    pub free_non_volatile_memory: u32,
    pub free_volatile_memory: u32,
}

impl ExtCardResource {
    pub const TAG: Tag = ctx(4);
}

impl TlvUnmarshal for ExtCardResource {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(Self::TAG, "ExtCardResource")?;

        let mut resource = Self::default();
        for field in Tlv::decode_all(&tlv.value())? {
            let tag = field.tag();
            if tag == ctx(1) {
                resource.installed_application = decode_u32(&field.value())?;
            } else if tag == ctx(2) {
                resource.free_non_volatile_memory = decode_u32(&field.value())?;
            } else if tag == ctx(3) {
                resource.free_volatile_memory = decode_u32(&field.value())?;
            }
        }
        Ok(resource)
    }
}

impl TlvMarshal for ExtCardResource {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut content = Vec::new();
        for (number, value) in [
            (1, self.installed_application),
            (2, self.free_non_volatile_memory),
            (3, self.free_volatile_memory),
        ] {
            content.extend(Tlv::primitive(ctx(number), encode_unsigned(value as u64)).encode());
        }
        Ok(Tlv::primitive(Self::TAG, content))
    }
}

/// Certification data of the eUICC platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationDataObject {
    pub platform_label: String,
    pub discovery_base_url: String,
}

impl CertificationDataObject {
    pub const TAG: Tag = ctx_constructed(12);
}

impl TlvUnmarshal for CertificationDataObject {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(Self::TAG, "CertificationDataObject")?;

        let mut object = Self::default();
        for child in tlv.children() {
            let tag = child.tag();
            if tag == ctx(0) {
                object.platform_label = decode_text(&child.value())?;
            } else if tag == ctx(1) {
                object.discovery_base_url = decode_text(&child.value())?;
            }
        }
        Ok(object)
    }
}

impl TlvMarshal for CertificationDataObject {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(
            Self::TAG,
            vec![
                Tlv::primitive(ctx(0), self.platform_label.as_bytes()),
                Tlv::primitive(ctx(1), self.discovery_base_url.as_bytes()),
            ],
        ))
    }
}

/// eUICC category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EuiccCategory {
    Other,
    BasicEuicc,
    MediumEuicc,
    ContactlessEuicc,
}

impl EuiccCategory {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => EuiccCategory::BasicEuicc,
            2 => EuiccCategory::MediumEuicc,
            3 => EuiccCategory::ContactlessEuicc,
            _ => EuiccCategory::Other,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            EuiccCategory::Other => 0,
            EuiccCategory::BasicEuicc => 1,
            EuiccCategory::MediumEuicc => 2,
            EuiccCategory::ContactlessEuicc => 3,
        }
    }
}

/// Parsed `GetEUICCInfo2` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EuiccInfo2 {
    pub profile_version: String,
    pub svn: String,
    pub euicc_firmware_ver: String,
    pub ext_card_resource: ExtCardResource,
    pub uicc_capability: Vec<&'static str>,
    pub ts102241_version: Option<String>,
    pub global_platform_version: Option<String>,
    pub rsp_capability: Vec<&'static str>,
    pub euicc_ci_pkid_list_for_verification: Vec<String>,
    pub euicc_ci_pkid_list_for_signing: Vec<String>,
    pub euicc_category: Option<EuiccCategory>,
    pub forbidden_profile_policy_rules: Vec<&'static str>,
    pub pp_version: String,
    pub sas_accreditation_number: String,
    pub certification_data_object: Option<CertificationDataObject>,
}

impl EuiccInfo2 {
    /// Accept both root tags chips have used for this response
    fn check_root(tag: Tag) -> RspResult<()> {
        if tag.is(TagClass::ContextSpecific, true, 32) || tag.is(TagClass::ContextSpecific, true, 34) {
            Ok(())
        } else {
            Err(RspError::UnexpectedTag {
                context: "EUICCInfo2",
                tag: tag.to_string(),
            })
        }
    }
}

impl TlvUnmarshal for EuiccInfo2 {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        Self::check_root(tlv.tag())?;

        let mut info = Self::default();
        for child in tlv.children() {
            let tag = child.tag();
            let value = child.value();
            if tag == ctx(1) {
                info.profile_version = decode_version(&value);
            } else if tag == ctx(2) {
                info.svn = decode_version(&value);
            } else if tag == ctx(3) {
                info.euicc_firmware_ver = decode_version(&value);
            } else if tag == ExtCardResource::TAG {
                info.ext_card_resource = ExtCardResource::from_tlv(child)?;
            } else if tag == ctx(5) {
                info.uicc_capability = decode_named_bits(&value, UICC_CAPABILITY)?;
            } else if tag == ctx(6) {
                info.ts102241_version = Some(decode_version(&value));
            } else if tag == ctx(7) {
                info.global_platform_version = Some(decode_version(&value));
            } else if tag == ctx(8) {
                info.rsp_capability = decode_named_bits(&value, RSP_CAPABILITY)?;
            } else if tag == ctx_constructed(9) {
                info.euicc_ci_pkid_list_for_verification = decode_identifier_list(child);
            } else if tag == ctx_constructed(10) {
                info.euicc_ci_pkid_list_for_signing = decode_identifier_list(child);
            } else if tag == ctx(11) {
                info.euicc_category = Some(EuiccCategory::from_code(decode_integer(&value)?));
            } else if tag == ctx(25) {
                info.forbidden_profile_policy_rules = decode_named_bits(&value, PPR_IDS)?;
            } else if tag == tags::OCTET_STRING {
                info.pp_version = decode_version(&value);
            } else if tag == tags::UTF8_STRING {
                info.sas_accreditation_number = decode_text(&value)?;
            } else if tag == CertificationDataObject::TAG {
                info.certification_data_object = Some(CertificationDataObject::from_tlv(child)?);
            }
        }

        Ok(info)
    }
}

impl TlvMarshal for EuiccInfo2 {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let key_ids = |number: u32, ids: &[String]| -> RspResult<Tlv> {
            let children = ids
                .iter()
                .map(|id| {
                    hex::decode(id)
                        .map(|raw| Tlv::primitive(tags::OCTET_STRING, raw))
                        .map_err(|e| RspError::Decode(format!("Invalid key id '{}': {}", id, e)))
                })
                .collect::<RspResult<Vec<_>>>()?;
            Ok(Tlv::constructed(ctx_constructed(number), children))
        };

        let mut children = vec![
            Tlv::primitive(ctx(1), encode_version(&self.profile_version)?),
            Tlv::primitive(ctx(2), encode_version(&self.svn)?),
            Tlv::primitive(ctx(3), encode_version(&self.euicc_firmware_ver)?),
            self.ext_card_resource.to_tlv()?,
            Tlv::primitive(ctx(5), encode_named_bits(&self.uicc_capability, UICC_CAPABILITY)?),
        ];
        if let Some(version) = &self.ts102241_version {
            children.push(Tlv::primitive(ctx(6), encode_version(version)?));
        }
        if let Some(version) = &self.global_platform_version {
            children.push(Tlv::primitive(ctx(7), encode_version(version)?));
        }
        children.push(Tlv::primitive(ctx(8), encode_named_bits(&self.rsp_capability, RSP_CAPABILITY)?));
        children.push(key_ids(9, &self.euicc_ci_pkid_list_for_verification)?);
        children.push(key_ids(10, &self.euicc_ci_pkid_list_for_signing)?);
        if let Some(category) = self.euicc_category {
            children.push(Tlv::primitive(ctx(11), encode_integer(category.code())));
        }
        if !self.forbidden_profile_policy_rules.is_empty() {
            children.push(Tlv::primitive(
                ctx(25),
                encode_named_bits(&self.forbidden_profile_policy_rules, PPR_IDS)?,
            ));
        }
        children.push(Tlv::primitive(tags::OCTET_STRING, encode_version(&self.pp_version)?));
        children.push(Tlv::primitive(tags::UTF8_STRING, self.sas_accreditation_number.as_bytes()));
        if let Some(object) = &self.certification_data_object {
            children.push(object.to_tlv()?);
        }

        Ok(Tlv::constructed(tags::GET_EUICC_INFO2, children))
    }
}

/// `GetEUICCInfo1` response
///
/// The raw encoding is forwarded to servers unchanged; the parsed fields are
/// kept for logging and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EuiccInfo1 {
    pub raw: Vec<u8>,
    pub svn: String,
    pub euicc_ci_pkid_list_for_verification: Vec<String>,
    pub euicc_ci_pkid_list_for_signing: Vec<String>,
}

impl EuiccInfo1 {
    /// Parse the raw response, keeping the bytes for forwarding
    pub fn parse(raw: Vec<u8>) -> RspResult<Self> {
        let tlv = Tlv::decode(&raw)?;
        tlv.expect_tag(tags::GET_EUICC_INFO1, "EUICCInfo1")?;

        let mut info = Self {
            raw: Vec::new(),
            svn: String::new(),
            euicc_ci_pkid_list_for_verification: Vec::new(),
            euicc_ci_pkid_list_for_signing: Vec::new(),
        };
        for child in tlv.children() {
            let tag = child.tag();
            if tag == ctx(2) {
                info.svn = decode_version(&child.value());
            } else if tag == ctx_constructed(9) {
                info.euicc_ci_pkid_list_for_verification = decode_identifier_list(child);
            } else if tag == ctx_constructed(10) {
                info.euicc_ci_pkid_list_for_signing = decode_identifier_list(child);
            }
        }
        info.raw = raw;
        Ok(info)
    }
}
