//! Installed profiles (ES10c): listing, enable, disable, delete, nickname

use crate::error::{RspError, RspResult};
use crate::tags::{self, ctx, ctx_constructed};
use rsp_asn1::primitive::{
    decode_integer, decode_swapped_bcd, decode_text, encode_boolean, encode_swapped_bcd,
};
use rsp_asn1::{Tag, Tlv, TlvMarshal, TlvUnmarshal};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Integrated circuit card identifier, in its decimal digit form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Iccid(String);

impl Iccid {
    /// Decode the nibble-swapped wire form
    pub fn from_wire(bytes: &[u8]) -> Self {
        Self(decode_swapped_bcd(bytes))
    }

    /// Nibble-swapped wire form, `F`-padded to whole bytes
    pub fn to_wire(&self) -> RspResult<Vec<u8>> {
        encode_swapped_bcd(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Iccid {
    type Err = RspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 18 || s.len() > 20 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(RspError::Decode(format!("Invalid ICCID '{}'", s)));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Iccid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileState {
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileClass {
    Test,
    Provisioning,
    Operational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IconType {
    Jpg,
    Png,
}

/// One entry of `ProfileInfoListResponse`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    pub iccid: Option<Iccid>,
    pub isdp_aid: Option<String>,
    pub state: Option<ProfileState>,
    pub nickname: Option<String>,
    pub service_provider_name: Option<String>,
    pub profile_name: Option<String>,
    pub icon_type: Option<IconType>,
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
    pub class: Option<ProfileClass>,
}

impl ProfileInfo {
    pub fn is_enabled(&self) -> bool {
        self.state == Some(ProfileState::Enabled)
    }
}

impl TlvUnmarshal for ProfileInfo {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::PROFILE_INFO, "ProfileInfo")?;

        let mut info = Self::default();
        for child in tlv.children() {
            let tag = child.tag();
            let value = child.value();
            if tag == tags::ICCID {
                info.iccid = Some(Iccid::from_wire(&value));
            } else if tag == tags::AID {
                info.isdp_aid = Some(hex::encode_upper(&*value));
            } else if tag == Tag::context_specific(false, 112) {
                // 9F70 profileState
                info.state = match decode_integer(&value)? {
                    0 => Some(ProfileState::Disabled),
                    1 => Some(ProfileState::Enabled),
                    _ => None,
                };
            } else if tag == ctx(16) {
                info.nickname = Some(decode_text(&value)?);
            } else if tag == ctx(17) {
                info.service_provider_name = Some(decode_text(&value)?);
            } else if tag == ctx(18) {
                info.profile_name = Some(decode_text(&value)?);
            } else if tag == ctx(19) {
                info.icon_type = match decode_integer(&value)? {
                    0 => Some(IconType::Jpg),
                    1 => Some(IconType::Png),
                    _ => None,
                };
            } else if tag == ctx(20) {
                info.icon = Some(value.to_vec());
            } else if tag == ctx(21) {
                info.class = match decode_integer(&value)? {
                    0 => Some(ProfileClass::Test),
                    1 => Some(ProfileClass::Provisioning),
                    2 => Some(ProfileClass::Operational),
                    _ => None,
                };
            }
        }
        Ok(info)
    }
}

/// `GetProfilesInfo` request; an empty request lists every profile
#[derive(Debug, Clone, Default)]
pub struct ProfileInfoListRequest {
    pub iccid: Option<Iccid>,
}

impl TlvMarshal for ProfileInfoListRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut tlv = Tlv::constructed(tags::PROFILE_INFO_LIST, Vec::new());
        if let Some(iccid) = &self.iccid {
            tlv.push(Tlv::constructed(
                ctx_constructed(0),
                vec![Tlv::primitive(tags::ICCID, iccid.to_wire()?)],
            ));
        }
        Ok(tlv)
    }
}

/// `ProfileInfoListResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInfoList(pub Vec<ProfileInfo>);

impl TlvUnmarshal for ProfileInfoList {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::PROFILE_INFO_LIST, "ProfileInfoListResponse")?;

        if let Some(error) = tlv.find(ctx(1)) {
            return Err(RspError::Euicc {
                function: "GetProfilesInfo",
                code: decode_integer(&error.value())?,
            });
        }

        let list = tlv.require(ctx_constructed(0), "profileInfoListOk")?;
        list.children()
            .iter()
            .filter(|child| child.tag() == tags::PROFILE_INFO)
            .map(ProfileInfo::from_tlv)
            .collect::<RspResult<Vec<_>>>()
            .map(Self)
    }
}

/// Profile selector accepted by enable/disable/delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileIdentifier {
    Iccid(Iccid),
    IsdpAid(Vec<u8>),
}

impl ProfileIdentifier {
    fn to_tlv(&self) -> RspResult<Tlv> {
        match self {
            ProfileIdentifier::Iccid(iccid) => Ok(Tlv::primitive(tags::ICCID, iccid.to_wire()?)),
            ProfileIdentifier::IsdpAid(aid) => Ok(Tlv::primitive(tags::AID, aid.clone())),
        }
    }
}

impl fmt::Display for ProfileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileIdentifier::Iccid(iccid) => write!(f, "ICCID {}", iccid),
            ProfileIdentifier::IsdpAid(aid) => write!(f, "AID {}", hex::encode_upper(aid)),
        }
    }
}

/// Enable, disable or delete a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    Enable {
        profile: ProfileIdentifier,
        refresh: bool,
    },
    Disable {
        profile: ProfileIdentifier,
        refresh: bool,
    },
    Delete {
        profile: ProfileIdentifier,
    },
}

impl ProfileCommand {
    /// Root tag shared by the request and its response
    pub fn root(&self) -> Tag {
        match self {
            ProfileCommand::Enable { .. } => tags::ENABLE_PROFILE,
            ProfileCommand::Disable { .. } => tags::DISABLE_PROFILE,
            ProfileCommand::Delete { .. } => tags::DELETE_PROFILE,
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            ProfileCommand::Enable { .. } => "EnableProfile",
            ProfileCommand::Disable { .. } => "DisableProfile",
            ProfileCommand::Delete { .. } => "DeleteProfile",
        }
    }
}

impl TlvMarshal for ProfileCommand {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let children = match self {
            ProfileCommand::Enable { profile, refresh } | ProfileCommand::Disable { profile, refresh } => {
                vec![
                    Tlv::constructed(ctx_constructed(0), vec![profile.to_tlv()?]),
                    Tlv::primitive(ctx(1), encode_boolean(*refresh)),
                ]
            }
            ProfileCommand::Delete { profile } => vec![profile.to_tlv()?],
        };
        Ok(Tlv::constructed(self.root(), children))
    }
}

/// `SetNickname` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNicknameRequest {
    pub iccid: Iccid,
    pub nickname: String,
}

impl TlvMarshal for SetNicknameRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        if self.nickname.len() > 64 {
            return Err(RspError::Decode(format!(
                "Nickname of {} bytes exceeds 64",
                self.nickname.len()
            )));
        }
        Ok(Tlv::constructed(
            tags::SET_NICKNAME,
            vec![
                Tlv::primitive(tags::ICCID, self.iccid.to_wire()?),
                Tlv::primitive(ctx(16), self.nickname.as_bytes()),
            ],
        ))
    }
}
