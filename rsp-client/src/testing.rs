//! Scripted eUICC and servers for the client tests
//!
//! [`FakeEuicc`] reassembles STORE DATA blocks and answers by the root tag
//! of the complete command; unscripted commands get a bare `9000`.
//! [`FakeServers`] answers ES9+/ES11 calls by function path.

use crate::cancel::CancelToken;
use crate::client::RspClient;
use crate::error::{RspError, RspResult};
use async_trait::async_trait;
use rsp_application::tags::{self, ctx, ctx_constructed};
use rsp_application::{NotificationEvent, NotificationMetadata, Tlv, TlvMarshal};
use rsp_asn1::Tag;
use rsp_core::{RspConfig, SequenceNumber};
use rsp_transport::{ApduChannel, HttpResponse, HttpTransport};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const SMDP: &str = "smdp.io";
pub const SMDS: &str = "lpa.ds.gsma.com";
pub const TRANSACTION: [u8; 2] = [0x01, 0xAB];
pub const CHALLENGE: [u8; 16] = [0x5A; 16];

/// BF36 with every part present and a single profile element
pub const BPP: [u8; 31] = [
    0xBF, 0x36, 0x1C, // BoundProfilePackage
    0xBF, 0x23, 0x02, 0x80, 0x00, // initialiseSecureChannelRequest
    0xA0, 0x03, 0x87, 0x01, 0x01, // firstSequenceOf87
    0xA1, 0x06, 0x88, 0x01, 0x02, 0x88, 0x01, 0x03, // sequenceOf88
    0xA2, 0x03, 0x87, 0x01, 0x04, // secondSequenceOf87
    0xA3, 0x03, 0x86, 0x01, 0x05, // sequenceOf86
];

pub enum CardReply {
    Data(Vec<u8>),
    Status(u16),
}

#[derive(Default)]
struct CardState {
    pending: Vec<u8>,
    replies: HashMap<Tag, VecDeque<CardReply>>,
    received: Vec<Vec<u8>>,
    cancel_on: Option<(Tag, CancelToken)>,
}

#[derive(Default)]
pub struct FakeEuicc {
    state: Mutex<CardState>,
}

impl FakeEuicc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue response data for the next command with this root tag
    pub fn reply(&self, tag: Tag, data: Vec<u8>) {
        self.push(tag, CardReply::Data(data));
    }

    /// Queue a failing status word for the next command with this root tag
    pub fn fail(&self, tag: Tag, sw: u16) {
        self.push(tag, CardReply::Status(sw));
    }

    /// Cancel `token` as soon as a command with this root tag arrives
    pub fn cancel_on(&self, tag: Tag, token: CancelToken) {
        self.state.lock().unwrap().cancel_on = Some((tag, token));
    }

    fn push(&self, tag: Tag, reply: CardReply) {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry(tag)
            .or_default()
            .push_back(reply);
    }

    /// Complete STORE DATA payloads in arrival order
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn received_tags(&self) -> Vec<Tag> {
        self.received()
            .iter()
            .map(|payload| Tag::decode(payload).unwrap().0)
            .collect()
    }

    pub fn received_with(&self, tag: Tag) -> Vec<Vec<u8>> {
        self.received()
            .into_iter()
            .filter(|payload| Tag::decode(payload).unwrap().0 == tag)
            .collect()
    }
}

#[async_trait]
impl ApduChannel for FakeEuicc {
    async fn transmit(&self, command: &[u8]) -> RspResult<Vec<u8>> {
        let ok = vec![0x90, 0x00];
        let mut state = self.state.lock().unwrap();

        match command[1] {
            0x70 if command[2] == 0x00 => Ok(vec![0x01, 0x90, 0x00]),
            0x70 | 0xA4 => Ok(ok),
            0xE2 => {
                let lc = command[4] as usize;
                state.pending.extend_from_slice(&command[5..5 + lc]);
                if command[2] & 0x80 == 0 {
                    return Ok(ok);
                }

                let payload = std::mem::take(&mut state.pending);
                let (tag, _) = Tag::decode(&payload)?;
                state.received.push(payload);
                if let Some((trigger, token)) = &state.cancel_on {
                    if *trigger == tag {
                        token.cancel();
                    }
                }

                match state.replies.get_mut(&tag).and_then(VecDeque::pop_front) {
                    Some(CardReply::Data(mut data)) => {
                        data.extend_from_slice(&ok);
                        Ok(data)
                    }
                    Some(CardReply::Status(sw)) => Ok(sw.to_be_bytes().to_vec()),
                    None => Ok(ok),
                }
            }
            _ => Ok(vec![0x6D, 0x00]),
        }
    }
}

#[derive(Default)]
pub struct FakeServers {
    replies: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<(String, serde_json::Value)>>,
}

impl FakeServers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for `function`, e.g. `es9plus/authenticateClient`
    pub fn reply(&self, function: &str, mut body: serde_json::Value) {
        body["header"] = json!({"functionExecutionStatus": {"status": "Executed-Success"}});
        let response = HttpResponse::new(200, serde_json::to_vec(&body).unwrap());
        self.respond(function, response);
    }

    pub fn respond(&self, function: &str, response: HttpResponse) {
        self.replies
            .lock()
            .unwrap()
            .entry(function.to_string())
            .or_default()
            .push_back(response);
    }

    /// `(url, body)` of every request
    pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
        self.requests.lock().unwrap().clone()
    }

    /// Called functions in order
    pub fn called(&self) -> Vec<String> {
        self.requests().into_iter().map(|(url, _)| function_of(&url)).collect()
    }
}

fn function_of(url: &str) -> String {
    url.split("/gsma/rsp2/").nth(1).unwrap_or(url).to_string()
}

#[async_trait]
impl HttpTransport for FakeServers {
    async fn post(&self, url: &str, _content_type: &str, body: &[u8]) -> RspResult<HttpResponse> {
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        self.requests.lock().unwrap().push((url.to_string(), body));
        self.replies
            .lock()
            .unwrap()
            .get_mut(&function_of(url))
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| RspError::Transport(format!("{} unreachable", url)))
    }
}

pub fn fake_client(card: Arc<FakeEuicc>, servers: Arc<FakeServers>) -> RspClient<Arc<FakeEuicc>, Arc<FakeServers>> {
    RspClient::new(card, servers, RspConfig::default()).unwrap()
}

pub fn b64(data: &[u8]) -> String {
    base64::encode(data)
}

pub fn challenge_response() -> Vec<u8> {
    Tlv::constructed(
        tags::GET_EUICC_CHALLENGE,
        vec![Tlv::primitive(ctx(0), CHALLENGE.to_vec())],
    )
    .encode()
}

pub fn euicc_info1() -> Vec<u8> {
    Tlv::constructed(tags::GET_EUICC_INFO1, vec![Tlv::primitive(ctx(2), vec![2, 2, 0])]).encode()
}

pub fn server_signed1(challenge: &[u8], address: &str) -> Vec<u8> {
    Tlv::constructed(
        tags::SEQUENCE,
        vec![
            Tlv::primitive(ctx(0), TRANSACTION.to_vec()),
            Tlv::primitive(ctx(1), challenge.to_vec()),
            Tlv::primitive(ctx(3), address.as_bytes()),
            Tlv::primitive(ctx(4), vec![0x11; 16]),
        ],
    )
    .encode()
}

/// Successful signed response under `root`
pub fn signed_ok(root: Tag) -> Vec<u8> {
    Tlv::constructed(
        root,
        vec![Tlv::constructed(
            ctx_constructed(0),
            vec![Tlv::primitive(tags::OCTET_STRING, vec![0x00])],
        )],
    )
    .encode()
}

pub fn smdp_signed2(cc_required: bool) -> Vec<u8> {
    Tlv::constructed(
        tags::SEQUENCE,
        vec![
            Tlv::primitive(ctx(0), TRANSACTION.to_vec()),
            Tlv::primitive(tags::BOOLEAN, vec![if cc_required { 0xFF } else { 0x00 }]),
        ],
    )
    .encode()
}

pub fn cancel_session_ok() -> Vec<u8> {
    Tlv::constructed(
        tags::CANCEL_SESSION,
        vec![Tlv::constructed(
            ctx_constructed(0),
            vec![Tlv::primitive(ctx(0), TRANSACTION.to_vec())],
        )],
    )
    .encode()
}

pub fn metadata(sequence_number: u32, address: &str) -> NotificationMetadata {
    NotificationMetadata {
        sequence_number: SequenceNumber(sequence_number),
        operations: vec![NotificationEvent::Install],
        notification_address: address.to_string(),
        iccid: None,
    }
}

/// `ProfileInstallationResult` for sequence number 1
pub fn installation_result(success: bool) -> Vec<u8> {
    let final_result = if success {
        Tlv::constructed(
            ctx_constructed(0),
            vec![Tlv::primitive(tags::AID, vec![0xA0, 0x00, 0x00, 0x05, 0x59])],
        )
    } else {
        Tlv::constructed(
            ctx_constructed(1),
            vec![Tlv::primitive(ctx(0), vec![0x08]), Tlv::primitive(ctx(1), vec![0x03])],
        )
    };
    Tlv::constructed(
        tags::PROFILE_INSTALLATION_RESULT,
        vec![Tlv::constructed(
            tags::PROFILE_INSTALLATION_RESULT_DATA,
            vec![
                Tlv::primitive(ctx(0), TRANSACTION.to_vec()),
                metadata(1, SMDP).to_tlv().unwrap(),
                Tlv::constructed(ctx_constructed(2), vec![final_result]),
            ],
        )],
    )
    .encode()
}

/// Script the card side of an authentication (challenge, info1, AuthenticateServer)
pub fn script_authentication(card: &FakeEuicc) {
    card.reply(tags::GET_EUICC_CHALLENGE, challenge_response());
    card.reply(tags::GET_EUICC_INFO1, euicc_info1());
    card.reply(tags::AUTHENTICATE_SERVER, signed_ok(tags::AUTHENTICATE_SERVER));
}

pub fn initiate_authentication_body(address: &str) -> serde_json::Value {
    json!({
        "transactionId": "01AB",
        "serverSigned1": b64(&server_signed1(&CHALLENGE, address)),
        "serverSignature1": b64(&[0x5F, 0x37, 0x01, 0xAA]),
        "euiccCiPKIdToBeUsed": b64(&[0x04, 0x01, 0xBB]),
        "serverCertificate": b64(&[0x30, 0x00])
    })
}

/// Script a download against [`SMDP`] up to the last BPP segment
///
/// The answer to the profile element (86) is left to the test.
pub fn script_download(card: &FakeEuicc, servers: &FakeServers, cc_required: bool) {
    script_authentication(card);
    card.reply(tags::PREPARE_DOWNLOAD, signed_ok(tags::PREPARE_DOWNLOAD));

    servers.reply("es9plus/initiateAuthentication", initiate_authentication_body(SMDP));
    servers.reply(
        "es9plus/authenticateClient",
        json!({
            "transactionId": "01AB",
            "smdpSigned2": b64(&smdp_signed2(cc_required)),
            "smdpSignature2": b64(&[0x5F, 0x37, 0x01, 0xCC]),
            "smdpCertificate": b64(&[0x30, 0x00])
        }),
    );
    servers.reply(
        "es9plus/getBoundProfilePackage",
        json!({"transactionId": "01AB", "boundProfilePackage": b64(&BPP)}),
    );
}

/// `<root> { [0] code }` answer of a single result function
pub fn result_code(root: Tag, code: u8) -> Vec<u8> {
    Tlv::constructed(root, vec![Tlv::primitive(ctx(0), vec![code])]).encode()
}
