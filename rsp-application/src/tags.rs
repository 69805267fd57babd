//! Tags of the ES10 functions and the structures they carry

use rsp_asn1::Tag;

// ES10a/b/c function roots
pub const GET_EUICC_INFO1: Tag = Tag::context_specific(true, 32); // BF20
pub const PREPARE_DOWNLOAD: Tag = Tag::context_specific(true, 33); // BF21
pub const GET_EUICC_INFO2: Tag = Tag::context_specific(true, 34); // BF22
pub const INITIALISE_SECURE_CHANNEL: Tag = Tag::context_specific(true, 35); // BF23
pub const PROFILE_INSTALLATION_RESULT_DATA: Tag = Tag::context_specific(true, 39); // BF27
pub const LIST_NOTIFICATION: Tag = Tag::context_specific(true, 40); // BF28
pub const SET_NICKNAME: Tag = Tag::context_specific(true, 41); // BF29
pub const RETRIEVE_NOTIFICATIONS_LIST: Tag = Tag::context_specific(true, 43); // BF2B
pub const PROFILE_INFO_LIST: Tag = Tag::context_specific(true, 45); // BF2D
pub const GET_EUICC_CHALLENGE: Tag = Tag::context_specific(true, 46); // BF2E
pub const NOTIFICATION_METADATA: Tag = Tag::context_specific(true, 47); // BF2F
pub const REMOVE_NOTIFICATION: Tag = Tag::context_specific(true, 48); // BF30
pub const ENABLE_PROFILE: Tag = Tag::context_specific(true, 49); // BF31
pub const DISABLE_PROFILE: Tag = Tag::context_specific(true, 50); // BF32
pub const DELETE_PROFILE: Tag = Tag::context_specific(true, 51); // BF33
pub const BOUND_PROFILE_PACKAGE: Tag = Tag::context_specific(true, 54); // BF36
pub const PROFILE_INSTALLATION_RESULT: Tag = Tag::context_specific(true, 55); // BF37
pub const AUTHENTICATE_SERVER: Tag = Tag::context_specific(true, 56); // BF38
pub const GET_CONFIGURED_ADDRESSES: Tag = Tag::context_specific(true, 60); // BF3C
pub const GET_EUICC_DATA: Tag = Tag::context_specific(true, 62); // BF3E
pub const CANCEL_SESSION: Tag = Tag::context_specific(true, 65); // BF41
pub const GET_RAT: Tag = Tag::context_specific(true, 67); // BF43

pub const PROFILE_INFO: Tag = Tag::private(true, 3); // E3
pub const ICCID: Tag = Tag::application(false, 26); // 5A
pub const EID: Tag = Tag::application(false, 26); // 5A
pub const AID: Tag = Tag::application(false, 15); // 4F
pub const TAG_LIST: Tag = Tag::application(false, 28); // 5C
pub const SIGNATURE: Tag = Tag::application(false, 55); // 5F37
pub const EUICC_OTPK: Tag = Tag::application(false, 73); // 5F49

pub const BOOLEAN: Tag = Tag::universal(false, 1);
pub const INTEGER: Tag = Tag::universal(false, 2);
pub const OCTET_STRING: Tag = Tag::universal(false, 4);
pub const OID: Tag = Tag::universal(false, 6);
pub const UTF8_STRING: Tag = Tag::universal(false, 12);
pub const SEQUENCE: Tag = Tag::universal(true, 16);

/// Context-specific primitive `[n]`
pub const fn ctx(number: u32) -> Tag {
    Tag::context_specific(false, number)
}

/// Context-specific constructed `[n]`
pub const fn ctx_constructed(number: u32) -> Tag {
    Tag::context_specific(true, number)
}
