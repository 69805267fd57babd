//! SGP.22 structure layer
//!
//! Domain records and ES10 request/response PDUs built on the BER-TLV codec
//! of `rsp-asn1`. Every structure follows the same decoding rules:
//!
//! - the root tag is validated against the exact (class, form, number)
//! - immediate children are dispatched by their exact tag, so a
//!   context-specific `[4]` and a universal OCTET STRING never collide
//! - unknown children are skipped for forward compatibility
//!
//! Requests implement [`TlvMarshal`], responses [`TlvUnmarshal`].

pub mod activation_code;
pub mod bpp;
pub mod download;
pub mod error;
pub mod euicc_data;
pub mod euicc_info;
pub mod event;
pub mod notification;
pub mod profile;
pub mod rat;
pub mod result_code;
pub mod tags;

pub use activation_code::ActivationCode;
pub use bpp::{segment_bound_profile_package, BppSegment, SegmentKind};
pub use download::{
    AuthenticateServerRequest, AuthenticateServerResponse, CancelSessionReason, CancelSessionRequest,
    CancelSessionResponse, DeviceInfo, InstallOutcome, PrepareDownloadRequest, PrepareDownloadResponse,
    ProfileInstallationResult, SignedResponse, SmdpSigned2,
};
pub use error::{RspError, RspResult};
pub use euicc_data::{
    ConfiguredAddresses, EidResponse, EuiccChallenge, GetConfiguredAddressesRequest, GetEidRequest,
    GetEuiccChallengeRequest, GetEuiccInfo1Request, GetEuiccInfo2Request,
};
pub use euicc_info::{CertificationDataObject, EuiccCategory, EuiccInfo1, EuiccInfo2, ExtCardResource};
pub use event::EventEntry;
pub use notification::{
    ListNotificationRequest, NotificationEvent, NotificationMetadata, NotificationMetadataList,
    PendingNotification, PendingNotificationList, RemoveNotificationRequest, RetrieveNotificationsListRequest,
};
pub use profile::{
    Iccid, IconType, ProfileClass, ProfileCommand, ProfileIdentifier, ProfileInfo, ProfileInfoList,
    ProfileInfoListRequest, ProfileState, SetNicknameRequest,
};
pub use rat::{GetRatRequest, OperatorId, RatResponse, RulesAuthorisationTable};
pub use result_code::ResultCode;
pub use rsp_asn1::{Tlv, TlvMarshal, TlvUnmarshal};
