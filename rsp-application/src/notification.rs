//! Pending notifications (ES10b)
//!
//! The eUICC queues a signed notification after every install, enable,
//! disable and delete. The LPA lists them, retrieves the signed payload by
//! sequence number, delivers it to the address embedded in the metadata and
//! finally removes it from the card.

use crate::error::{RspError, RspResult};
use crate::profile::Iccid;
use crate::tags::{self, ctx, ctx_constructed};
use rsp_asn1::primitive::{
    decode_integer, decode_named_bits, decode_text, decode_u32, encode_named_bits, encode_unsigned,
};
use rsp_asn1::{Tag, Tlv, TlvMarshal, TlvUnmarshal};
use rsp_core::SequenceNumber;
use serde::Serialize;

/// Profile management operations, in bit order
pub const NOTIFICATION_EVENTS: &[&str] = &["install", "enable", "disable", "delete"];

/// Operation that produced a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationEvent {
    Install,
    Enable,
    Disable,
    Delete,
}

impl NotificationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NotificationEvent::Install => "install",
            NotificationEvent::Enable => "enable",
            NotificationEvent::Disable => "disable",
            NotificationEvent::Delete => "delete",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "install" => Some(NotificationEvent::Install),
            "enable" => Some(NotificationEvent::Enable),
            "disable" => Some(NotificationEvent::Disable),
            "delete" => Some(NotificationEvent::Delete),
            _ => None,
        }
    }

    fn decode_set(bytes: &[u8]) -> RspResult<Vec<Self>> {
        Ok(decode_named_bits(bytes, NOTIFICATION_EVENTS)?
            .into_iter()
            .filter_map(Self::from_name)
            .collect())
    }

    fn encode_set(events: &[Self]) -> RspResult<Vec<u8>> {
        let names: Vec<&str> = events.iter().map(Self::name).collect();
        encode_named_bits(&names, NOTIFICATION_EVENTS)
    }
}

/// `NotificationMetadata` (BF2F)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMetadata {
    pub sequence_number: SequenceNumber,
    pub operations: Vec<NotificationEvent>,
    pub notification_address: String,
    pub iccid: Option<Iccid>,
}

impl TlvUnmarshal for NotificationMetadata {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::NOTIFICATION_METADATA, "NotificationMetadata")?;

        let sequence_number = SequenceNumber(decode_u32(
            &tlv.require(ctx(0), "seqNumber")?.value(),
        )?);

        let mut metadata = Self {
            sequence_number,
            operations: Vec::new(),
            notification_address: String::new(),
            iccid: None,
        };
        for child in tlv.children() {
            let tag = child.tag();
            if tag == ctx(1) {
                metadata.operations = NotificationEvent::decode_set(&child.value())?;
            } else if tag == tags::UTF8_STRING {
                metadata.notification_address = decode_text(&child.value())?;
            } else if tag == tags::ICCID {
                metadata.iccid = Some(Iccid::from_wire(&child.value()));
            }
        }
        Ok(metadata)
    }
}

impl TlvMarshal for NotificationMetadata {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut tlv = Tlv::constructed(
            tags::NOTIFICATION_METADATA,
            vec![
                Tlv::primitive(ctx(0), encode_unsigned(self.sequence_number.0 as u64)),
                Tlv::primitive(ctx(1), NotificationEvent::encode_set(&self.operations)?),
                Tlv::primitive(tags::UTF8_STRING, self.notification_address.as_bytes()),
            ],
        );
        if let Some(iccid) = &self.iccid {
            tlv.push(Tlv::primitive(tags::ICCID, iccid.to_wire()?));
        }
        Ok(tlv)
    }
}

/// `ListNotification` request, optionally filtered by operation
#[derive(Debug, Clone, Default)]
pub struct ListNotificationRequest {
    pub filter: Vec<NotificationEvent>,
}

impl TlvMarshal for ListNotificationRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut tlv = Tlv::constructed(tags::LIST_NOTIFICATION, Vec::new());
        if !self.filter.is_empty() {
            tlv.push(Tlv::primitive(ctx(1), NotificationEvent::encode_set(&self.filter)?));
        }
        Ok(tlv)
    }
}

fn list_error(tlv: &Tlv, function: &'static str) -> RspResult<()> {
    match tlv.find(ctx(1)) {
        Some(error) => Err(RspError::Euicc {
            function,
            code: decode_integer(&error.value())?,
        }),
        None => Ok(()),
    }
}

/// `ListNotificationResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMetadataList(pub Vec<NotificationMetadata>);

impl TlvUnmarshal for NotificationMetadataList {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::LIST_NOTIFICATION, "ListNotificationResponse")?;
        list_error(tlv, "ListNotification")?;

        tlv.require(ctx_constructed(0), "notificationMetadataList")?
            .children()
            .iter()
            .filter(|child| child.tag() == tags::NOTIFICATION_METADATA)
            .map(NotificationMetadata::from_tlv)
            .collect::<RspResult<Vec<_>>>()
            .map(Self)
    }
}

/// `RetrieveNotificationsList` request
#[derive(Debug, Clone, Default)]
pub struct RetrieveNotificationsListRequest {
    pub sequence_number: Option<SequenceNumber>,
}

impl TlvMarshal for RetrieveNotificationsListRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        let mut tlv = Tlv::constructed(tags::RETRIEVE_NOTIFICATIONS_LIST, Vec::new());
        if let Some(seq) = self.sequence_number {
            tlv.push(Tlv::constructed(
                ctx_constructed(0),
                vec![Tlv::primitive(ctx(0), encode_unsigned(seq.0 as u64))],
            ));
        }
        Ok(tlv)
    }
}

/// Signed notification ready for delivery
///
/// `raw` holds the complete encoding (a `ProfileInstallationResult` or an
/// `OtherSignedNotification`) as the SM-DP+ expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub metadata: NotificationMetadata,
    pub raw: Vec<u8>,
}

impl TlvUnmarshal for PendingNotification {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        let metadata = if tlv.tag() == tags::PROFILE_INSTALLATION_RESULT {
            tlv.require(tags::PROFILE_INSTALLATION_RESULT_DATA, "profileInstallationResultData")?
                .require(tags::NOTIFICATION_METADATA, "notificationMetadata")?
        } else if tlv.tag() == tags::SEQUENCE {
            tlv.require(tags::NOTIFICATION_METADATA, "tbsOtherNotification")?
        } else {
            return Err(RspError::UnexpectedTag {
                context: "PendingNotification",
                tag: tlv.tag().to_string(),
            });
        };

        Ok(Self {
            metadata: NotificationMetadata::from_tlv(metadata)?,
            raw: tlv.encode(),
        })
    }
}

/// `RetrieveNotificationsListResponse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotificationList(pub Vec<PendingNotification>);

impl TlvUnmarshal for PendingNotificationList {
    fn from_tlv(tlv: &Tlv) -> RspResult<Self> {
        tlv.expect_tag(tags::RETRIEVE_NOTIFICATIONS_LIST, "RetrieveNotificationsListResponse")?;
        list_error(tlv, "RetrieveNotificationsList")?;

        tlv.require(ctx_constructed(0), "notificationList")?
            .children()
            .iter()
            .map(PendingNotification::from_tlv)
            .collect::<RspResult<Vec<_>>>()
            .map(Self)
    }

    /// Decode the list, keeping each notification exactly as the eUICC
    /// encoded it
    fn from_bytes(data: &[u8]) -> RspResult<Self> {
        let Self(mut list) = Self::from_tlv(&Tlv::decode(data)?)?;

        let mut received = Vec::new();
        for child in Tlv::child_encodings(data)? {
            if Tag::decode(child)?.0 == ctx_constructed(0) {
                received = Tlv::child_encodings(child)?;
                break;
            }
        }
        for (notification, raw) in list.iter_mut().zip(received) {
            notification.raw = raw.to_vec();
        }
        Ok(Self(list))
    }
}

/// `RemoveNotificationFromList` request
#[derive(Debug, Clone, Copy)]
pub struct RemoveNotificationRequest {
    pub sequence_number: SequenceNumber,
}

impl TlvMarshal for RemoveNotificationRequest {
    fn to_tlv(&self) -> RspResult<Tlv> {
        Ok(Tlv::constructed(
            tags::REMOVE_NOTIFICATION,
            vec![Tlv::primitive(ctx(0), encode_unsigned(self.sequence_number.0 as u64))],
        ))
    }
}
