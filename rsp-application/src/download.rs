//! Profile download PDUs (ES10b): mutual authentication, download
//! preparation, session cancellation and the installation result

use crate::error::{RspError, RspResult};
use crate::notification::NotificationMetadata;
use crate::tags::{self, ctx, ctx_constructed};
use rsp_asn1::primitive::{decode_boolean, decode_integer, encode_integer, encode_swapped_bcd, encode_version};
use rsp_asn1::{Tag, Tlv, TlvMarshal, TlvUnmarshal};
use rsp_core::{DeviceConfig, TransactionId};

/// Terminal information sent inside `CtxParams1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub tac: Vec<u8>,
    pub gsm_supported_release: Option<String>,
    pub utran_supported_release: Option<String>,
    pub eutran_supported_release: Option<String>,
    /// IMEI digits
    pub imei: Option<String>,
}

impl DeviceInfo {
    /// Build from configuration, with an optional per-call IMEI override
    pub fn from_config(config: &DeviceConfig, imei: Option<&str>) -> RspResult<Self> {
        let tac = hex::decode(&config.tac)
            .map_err(|e| RspError::Config(format!("Invalid TAC '{}': {}", config.tac, e)))?;
        Ok(Self {
            tac,
            gsm_supported_release: config.gsm_supported_release.clone(),
            utran_supported_release: config.utran_supported_release.clone(),
            eutran_supported_release: config.eutran_supported_release.clone(),
            imei: imei.map(str::to_string).or_else(|| config.imei.clone()),
        })
    }
}

impl TlvMarshal for DeviceInfo {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut capabilities = Tlv::constructed(ctx_constructed(1), Vec::new());
        for (number, release) in [
            (0, &self.gsm_supported_release),
            (1, &self.utran_supported_release),
            (5, &self.eutran_supported_release),
        ] {
            if let Some(release) = release {
                capabilities.push(Tlv::primitive(ctx(number), encode_version(release)?));
            }
        }

        let mut info = Tlv::constructed(
            ctx_constructed(1),
            vec![Tlv::primitive(ctx(0), self.tac.clone()), capabilities],
        );
        if let Some(imei) = &self.imei {
            info.push(Tlv::primitive(ctx(2), encode_swapped_bcd(imei)?));
        }
        Ok(info)
    }
}

/// `AuthenticateServer` request
///
/// The server-signed fields are the TLV encodings received from the SM-DP+
/// or SM-DS, passed through untouched.
#[derive(Debug, Clone)]
pub struct AuthenticateServerRequest {
    pub server_signed1: Vec<u8>,
    pub server_signature1: Vec<u8>,
    pub euicc_ci_pkid_to_be_used: Vec<u8>,
    pub server_certificate: Vec<u8>,
    pub matching_id: Option<String>,
    pub device_info: DeviceInfo,
}

impl TlvMarshal for AuthenticateServerRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut common = Tlv::constructed(ctx_constructed(0), Vec::new());
        if let Some(matching_id) = &self.matching_id {
            common.push(Tlv::primitive(ctx(0), matching_id.as_bytes()));
        }
        common.push(self.device_info.to_tlv()?);

        Ok(Tlv::constructed(
            tags::AUTHENTICATE_SERVER,
            vec![
                Tlv::decode(&self.server_signed1)?,
                Tlv::decode(&self.server_signature1)?,
                Tlv::decode(&self.euicc_ci_pkid_to_be_used)?,
                Tlv::decode(&self.server_certificate)?,
                Tlv::constructed(ctx_constructed(0), vec![common]),
            ],
        ))
    }
}

/// Success/error response of a mutual authentication step
///
/// The whole encoding is forwarded to the server on success; an error
/// alternative is turned into `RspError::Euicc`. Parsed with `from_bytes`,
/// `raw` is the received buffer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResponse {
    pub raw: Vec<u8>,
}

impl SignedResponse {
    fn parse(tlv: &Tlv, root: Tag, function: &'static str) -> RspResult<Self> {
        tlv.expect_tag(root, function)?;

        if let Some(error) = tlv.find(ctx_constructed(1)) {
            let code = error
                .find(tags::INTEGER)
                .or_else(|| error.find(ctx(1)))
                .ok_or_else(|| RspError::Decode(format!("Missing error code in {}", function)))?;
            return Err(RspError::Euicc {
                function,
                code: decode_integer(&code.value())?,
            });
        }
        tlv.require(ctx_constructed(0), "responseOk")?;
        Ok(Self { raw: tlv.encode() })
    }
}

/// `AuthenticateServerResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateServerResponse(pub SignedResponse);

impl TlvUnmarshal for AuthenticateServerResponse {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        SignedResponse::parse(tlv, tags::AUTHENTICATE_SERVER, "AuthenticateServer").map(Self)
    }

    fn from_bytes(data: &[u8]) -> RspResult<Self> {
        Self::from_tlv(&Tlv::decode(data)?)?;
        Ok(Self(SignedResponse { raw: data.to_vec() }))
    }
}

/// `PrepareDownload` request
#[derive(Debug, Clone)]
pub struct PrepareDownloadRequest {
    pub smdp_signed2: Vec<u8>,
    pub smdp_signature2: Vec<u8>,
    pub hash_cc: Option<Vec<u8>>,
    pub smdp_certificate: Vec<u8>,
}

impl TlvMarshal for PrepareDownloadRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut children = vec![Tlv::decode(&self.smdp_signed2)?, Tlv::decode(&self.smdp_signature2)?];
        if let Some(hash) = &self.hash_cc {
            children.push(Tlv::primitive(tags::OCTET_STRING, hash.clone()));
        }
        children.push(Tlv::decode(&self.smdp_certificate)?);
        Ok(Tlv::constructed(tags::PREPARE_DOWNLOAD, children))
    }
}

/// `PrepareDownloadResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareDownloadResponse(pub SignedResponse);

impl TlvUnmarshal for PrepareDownloadResponse {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        SignedResponse::parse(tlv, tags::PREPARE_DOWNLOAD, "PrepareDownload").map(Self)
    }

    fn from_bytes(data: &[u8]) -> RspResult<Self> {
        Self::from_tlv(&Tlv::decode(data)?)?;
        Ok(Self(SignedResponse { raw: data.to_vec() }))
    }
}

/// Fields of `smdpSigned2` the LPA acts upon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmdpSigned2 {
    pub transaction_id: TransactionId,
    pub cc_required: bool,
}

impl TlvUnmarshal for SmdpSigned2 {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::SEQUENCE, "SmdpSigned2")?;
        Ok(Self {
            transaction_id: TransactionId::new(tlv.require(ctx(0), "transactionId")?.value().to_vec()),
            cc_required: decode_boolean(&tlv.require(tags::BOOLEAN, "ccRequiredFlag")?.value())?,
        })
    }
}

/// Reason sent with `CancelSession`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelSessionReason {
    EndUserRejection,
    Postponed,
    Timeout,
    PprNotAllowed,
    MetadataMismatch,
    LoadBppExecutionError,
    Undefined,
}

impl CancelSessionReason {
    pub fn code(&self) -> i64 {
        match self {
            CancelSessionReason::EndUserRejection => 0,
            CancelSessionReason::Postponed => 1,
            CancelSessionReason::Timeout => 2,
            CancelSessionReason::PprNotAllowed => 3,
            CancelSessionReason::MetadataMismatch => 4,
            CancelSessionReason::LoadBppExecutionError => 5,
            CancelSessionReason::Undefined => 127,
        }
    }
}

/// `CancelSession` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSessionRequest {
    pub transaction_id: TransactionId,
    pub reason: CancelSessionReason,
}

impl TlvMarshal for CancelSessionRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(
            tags::CANCEL_SESSION,
            vec![
                Tlv::primitive(ctx(0), self.transaction_id.as_bytes()),
                Tlv::primitive(ctx(1), encode_integer(self.reason.code())),
            ],
        ))
    }
}

/// `CancelSessionResponse`; the signed encoding goes to the SM-DP+
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSessionResponse {
    pub raw: Vec<u8>,
}

impl TlvUnmarshal for CancelSessionResponse {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::CANCEL_SESSION, "CancelSession")?;
        if let Some(error) = tlv.find(ctx(1)) {
            return Err(RspError::Euicc {
                function: "CancelSession",
                code: decode_integer(&error.value())?,
            });
        }
        tlv.require(ctx_constructed(0), "cancelSessionResponseOk")?;
        Ok(Self { raw: tlv.encode() })
    }

    fn from_bytes(data: &[u8]) -> RspResult<Self> {
        Self::from_tlv(&Tlv::decode(data)?)?;
        Ok(Self { raw: data.to_vec() })
    }
}

/// Final outcome reported by the eUICC after loading a BPP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Success { isdp_aid: Vec<u8> },
    Error { bpp_command_id: i64, error_reason: i64 },
}

/// `ProfileInstallationResult` (BF37)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInstallationResult {
    pub transaction_id: TransactionId,
    pub notification: NotificationMetadata,
    pub outcome: InstallOutcome,
    pub raw: Vec<u8>,
}

impl ProfileInstallationResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, InstallOutcome::Success { .. })
    }

    /// `RspError::InstallFailed` unless the eUICC reported success
    pub fn into_result(self) -> RspResult<Self> {
        match self.outcome {
            InstallOutcome::Success { .. } => Ok(self),
            InstallOutcome::Error {
                bpp_command_id,
                error_reason,
            } => Err(RspError::InstallFailed {
                bpp_command_id,
                error_reason,
            }),
        }
    }
}

impl TlvUnmarshal for ProfileInstallationResult {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::PROFILE_INSTALLATION_RESULT, "ProfileInstallationResult")?;

        let data = tlv.require(tags::PROFILE_INSTALLATION_RESULT_DATA, "profileInstallationResultData")?;
        let transaction_id = TransactionId::new(data.require(ctx(0), "transactionId")?.value().to_vec());
        let notification = NotificationMetadata::from_tlv(
            data.require(tags::NOTIFICATION_METADATA, "notificationMetadata")?,
        )?;

        let final_result = data.require(ctx_constructed(2), "finalResult")?;
        let outcome = if let Some(success) = final_result.find(ctx_constructed(0)) {
            InstallOutcome::Success {
                isdp_aid: success
                    .find(tags::AID)
                    .map(|aid| aid.value().to_vec())
                    .unwrap_or_default(),
            }
        } else {
            let error = final_result.require(ctx_constructed(1), "errorResult")?;
            InstallOutcome::Error {
                bpp_command_id: decode_integer(&error.require(ctx(0), "bppCommandId")?.value())?,
                error_reason: decode_integer(&error.require(ctx(1), "errorReason")?.value())?,
            }
        };

        Ok(Self {
            transaction_id,
            notification,
            outcome,
            raw: tlv.encode(),
        })
    }

    fn from_bytes(data: &[u8]) -> RspResult<Self> {
        let result = Self::from_tlv(&Tlv::decode(data)?)?;
        Ok(Self {
            raw: data.to_vec(),
            ..result
        })
    }
}
