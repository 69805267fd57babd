//! APDU session to the ISD-R
//!
//! ES10 functions are BER-TLV payloads carried by STORE DATA commands on a
//! logical channel opened to the ISD-R. Payloads longer than the configured
//! segment size are split into numbered blocks; responses announcing more
//! data (`61xx`) are completed with GET RESPONSE before parsing.

use crate::error::{RspError, RspResult};
use bytes::BytesMut;
use rsp_asn1::{TlvMarshal, TlvUnmarshal};
use rsp_core::RspConfig;
use rsp_transport::{ApduChannel, ApduCommand, ApduResponse};

const INS_MANAGE_CHANNEL: u8 = 0x70;
const INS_SELECT: u8 = 0xA4;
const INS_GET_RESPONSE: u8 = 0xC0;
const INS_STORE_DATA: u8 = 0xE2;

/// STORE DATA P1: more blocks follow
const P1_MORE_BLOCKS: u8 = 0x11;
/// STORE DATA P1: last block
const P1_LAST_BLOCK: u8 = 0x91;

/// GET RESPONSE commands followed for one command before giving up
const MAX_GET_RESPONSE: usize = 256;

/// Encode a logical channel number into a class byte
///
/// Channels 0..=3 use the first interindustry coding, 4..=19 the further
/// interindustry coding. The proprietary bit (0x80) of `base` is kept.
fn class_byte(base: u8, channel: u8) -> u8 {
    if channel < 4 {
        base | channel
    } else {
        (base & 0x80) | 0x40 | (channel - 4)
    }
}

/// Strip the proprietary bit, keeping the channel coding
fn interindustry(cla: u8) -> u8 {
    if cla & 0x40 != 0 { cla & 0x4F } else { cla & 0x03 }
}

/// Session with the ISD-R on one logical channel
#[derive(Debug)]
pub struct ApduSession<C: ApduChannel> {
    channel: C,
    aid: Vec<u8>,
    max_segment_size: usize,
    logical_channel: Option<u8>,
}

impl<C: ApduChannel> ApduSession<C> {
    /// Create a closed session
    ///
    /// # Errors
    /// `RspError::Config` if the configuration does not validate.
    pub fn new(channel: C, config: &RspConfig) -> RspResult<Self> {
        config.validate()?;
        Ok(Self {
            channel,
            aid: config.isd_r_aid_bytes()?,
            max_segment_size: config.max_segment_size,
            logical_channel: None,
        })
    }

    /// Logical channel number while open
    pub fn logical_channel(&self) -> Option<u8> {
        self.logical_channel
    }

    pub fn is_open(&self) -> bool {
        self.logical_channel.is_some()
    }

    /// Open a logical channel and select the ISD-R on it
    ///
    /// Opening an already open session is a no-op.
    pub async fn open(&mut self) -> RspResult<()> {
        if self.logical_channel.is_some() {
            return Ok(());
        }

        let open = ApduCommand::new(0x00, INS_MANAGE_CHANNEL, 0x00, 0x00).with_le(0x01);
        let response = self.exchange(&open).await?;
        let channel = match response.as_slice() {
            [channel] if *channel > 0 && *channel < 20 => *channel,
            other => {
                return Err(RspError::Channel(format!(
                    "MANAGE CHANNEL returned unusable channel data {}",
                    hex::encode_upper(other)
                )));
            }
        };
        log::debug!("Opened logical channel {}", channel);

        let select = ApduCommand::new(class_byte(0x00, channel), INS_SELECT, 0x04, 0x00)
            .with_data(self.aid.clone())
            .with_le(0x00);
        if let Err(e) = self.exchange(&select).await {
            self.close_channel(channel).await;
            return Err(e);
        }
        log::debug!("Selected ISD-R {} on channel {}", hex::encode_upper(&self.aid), channel);

        self.logical_channel = Some(channel);
        Ok(())
    }

    /// Close the logical channel
    ///
    /// Closing a session that is not open is a no-op.
    pub async fn close(&mut self) -> RspResult<()> {
        if let Some(channel) = self.logical_channel.take() {
            let close = ApduCommand::new(0x00, INS_MANAGE_CHANNEL, 0x80, channel);
            self.exchange(&close).await?;
            log::debug!("Closed logical channel {}", channel);
        }
        Ok(())
    }

    async fn close_channel(&self, channel: u8) {
        let close = ApduCommand::new(0x00, INS_MANAGE_CHANNEL, 0x80, channel);
        if let Err(e) = self.exchange(&close).await {
            log::warn!("Failed to close logical channel {}: {}", channel, e);
        }
    }

    fn require_open(&self) -> RspResult<u8> {
        self.logical_channel
            .ok_or_else(|| RspError::Channel("ISD-R session is not open".to_string()))
    }

    /// Send one command and collect its complete response data
    ///
    /// `61xx` statuses are followed with GET RESPONSE until the card reports
    /// a final status. Any final status other than `9000` is returned as
    /// `RspError::Card`.
    async fn exchange(&self, command: &ApduCommand) -> RspResult<Vec<u8>> {
        let raw = self.channel.transmit(&command.encode()?).await?;
        let mut response = ApduResponse::parse(raw)?;
        let mut data = BytesMut::from(response.data.as_slice());

        let mut chained = 0;
        while let Some(remaining) = response.sw.bytes_remaining() {
            chained += 1;
            if chained > MAX_GET_RESPONSE {
                return Err(RspError::Channel(format!(
                    "Card still announces more data after {} GET RESPONSE commands",
                    MAX_GET_RESPONSE
                )));
            }
            let get_response = ApduCommand::new(interindustry(command.cla), INS_GET_RESPONSE, 0x00, 0x00)
                .with_le(remaining as u8);
            response = ApduResponse::parse(self.channel.transmit(&get_response.encode()?).await?)?;
            data.extend_from_slice(&response.data);
        }

        if !response.sw.is_success() {
            log::debug!("APDU {:02X}{:02X} failed with {}", command.cla, command.ins, response.sw);
            return Err(RspError::Card { sw: response.sw.0 });
        }
        Ok(data.to_vec())
    }

    /// Send a payload as a STORE DATA sequence
    ///
    /// # Returns
    /// The response data of the final block. Intermediate blocks must not
    /// return data.
    ///
    /// # Errors
    /// - `RspError::Card` with the status word of the first failing block.
    ///   Failed blocks are never retried.
    /// - `RspError::Channel` before anything is sent when the payload needs
    ///   more blocks than P2 can number.
    pub async fn store_data(&self, payload: &[u8]) -> RspResult<Vec<u8>> {
        let channel = self.require_open()?;
        let cla = class_byte(0x80, channel);

        let blocks: Vec<&[u8]> = if payload.is_empty() {
            vec![payload]
        } else {
            payload.chunks(self.max_segment_size).collect()
        };
        let last = blocks.len() - 1;
        if u8::try_from(last).is_err() {
            return Err(RspError::Channel(format!(
                "Payload of {} bytes needs {} STORE DATA blocks (max 256)",
                payload.len(),
                blocks.len()
            )));
        }

        let mut response = Vec::new();
        for (number, block) in blocks.into_iter().enumerate() {
            let p1 = if number == last { P1_LAST_BLOCK } else { P1_MORE_BLOCKS };
            let number = u8::try_from(number)
                .map_err(|_| RspError::Channel(format!("STORE DATA block {} out of range", number)))?;
            let command = ApduCommand::new(cla, INS_STORE_DATA, p1, number)
                .with_data(block.to_vec())
                .with_le(0x00);
            response = self.exchange(&command).await?;
        }
        Ok(response)
    }

    /// Encode a request, send it and decode the response
    pub async fn call<Req, Resp>(&self, request: &Req) -> RspResult<Resp>
    where
        Req: TlvMarshal + Sync,
        Resp: TlvUnmarshal,
    {
        let payload = request.to_bytes()?;
        log::debug!("ES10 >> {}", hex::encode_upper(&payload));
        let response = self.store_data(&payload).await?;
        log::debug!("ES10 << {}", hex::encode_upper(&response));
        Resp::from_bytes(&response)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedCard;
    use super::*;
    use hex_literal::hex;
    use std::sync::Arc;

    async fn open_session(card: &Arc<ScriptedCard>, config: &RspConfig) -> ApduSession<Arc<ScriptedCard>> {
        let mut session = ApduSession::new(card.clone(), config).unwrap();
        session.open().await.unwrap();
        session
    }

    #[test]
    fn test_class_byte() {
        assert_eq!(class_byte(0x80, 1), 0x81);
        assert_eq!(class_byte(0x00, 3), 0x03);
        assert_eq!(class_byte(0x80, 4), 0xC0);
        assert_eq!(class_byte(0x00, 19), 0x4F);
        assert_eq!(interindustry(0xCF), 0x4F);
        assert_eq!(interindustry(0x81), 0x01);
    }

    #[tokio::test]
    async fn test_open_selects_isd_r() {
        let card = Arc::new(ScriptedCard::new(&[&hex!("01 9000"), &hex!("9000")]));
        let session = open_session(&card, &RspConfig::default()).await;
        assert_eq!(session.logical_channel(), Some(1));

        let sent = card.sent();
        assert_eq!(sent[0], hex!("00700000 01").to_vec());
        assert_eq!(sent[1], hex!("01A40400 10 A0000005591010FFFFFFFF8900000100 00").to_vec());
    }

    #[tokio::test]
    async fn test_select_failure_closes_channel() {
        let card = Arc::new(ScriptedCard::new(&[&hex!("02 9000"), &hex!("6A82"), &hex!("9000")]));
        let mut session = ApduSession::new(card.clone(), &RspConfig::default()).unwrap();
        assert_eq!(session.open().await, Err(RspError::Card { sw: 0x6A82 }));
        assert!(!session.is_open());
        assert_eq!(card.sent()[2], hex!("00708002").to_vec());
    }

    #[tokio::test]
    async fn test_store_data_segments_by_configured_size() {
        let config = RspConfig {
            max_segment_size: 4,
            ..RspConfig::default()
        };
        let card = Arc::new(ScriptedCard::new(&[
            &hex!("01 9000"),
            &hex!("9000"),
            &hex!("9000"),
            &hex!("9000"),
            &hex!("AABB 9000"),
        ]));
        let session = open_session(&card, &config).await;

        let response = session.store_data(&hex!("0102030405060708 09")).await.unwrap();
        assert_eq!(response, hex!("AABB").to_vec());

        let sent = card.sent();
        assert_eq!(sent[2], hex!("81E21100 04 01020304 00").to_vec());
        assert_eq!(sent[3], hex!("81E21101 04 05060708 00").to_vec());
        assert_eq!(sent[4], hex!("81E29102 01 09 00").to_vec());
    }

    #[tokio::test]
    async fn test_response_chaining() {
        let card = Arc::new(ScriptedCard::new(&[
            &hex!("01 9000"),
            &hex!("9000"),
            &hex!("BF2E 6113"),
            &hex!("12 8010 00112233445566778899AABBCCDDEEFF 9000"),
        ]));
        let session = open_session(&card, &RspConfig::default()).await;

        let response = session.store_data(&hex!("BF2E00")).await.unwrap();
        assert_eq!(response.len(), 21);
        assert_eq!(&response[..3], &hex!("BF2E12"));
        assert_eq!(card.sent()[3], hex!("01C00000 13").to_vec());
    }

    #[tokio::test]
    async fn test_store_data_block_limit() {
        let config = RspConfig {
            max_segment_size: 1,
            ..RspConfig::default()
        };
        let card = Arc::new(ScriptedCard::new(&[&hex!("01 9000"), &hex!("9000")]));
        let session = open_session(&card, &config).await;

        let err = session.store_data(&[0x5A; 300]).await.unwrap_err();
        assert!(matches!(err, RspError::Channel(_)));
        // Nothing beyond MANAGE CHANNEL and SELECT went out
        assert_eq!(card.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_store_data_uses_all_block_numbers() {
        let config = RspConfig {
            max_segment_size: 1,
            ..RspConfig::default()
        };
        let mut replies: Vec<Vec<u8>> = vec![hex!("01 9000").to_vec(), hex!("9000").to_vec()];
        replies.extend(std::iter::repeat_n(hex!("9000").to_vec(), 256));
        let replies: Vec<&[u8]> = replies.iter().map(Vec::as_slice).collect();
        let card = Arc::new(ScriptedCard::new(&replies));
        let session = open_session(&card, &config).await;

        session.store_data(&[0x5A; 256]).await.unwrap();
        let sent = card.sent();
        assert_eq!(sent.len(), 258);
        assert_eq!(&sent[257][..4], &hex!("81E291FF"));
    }

    #[tokio::test]
    async fn test_endless_response_chaining_is_cut() {
        let mut replies: Vec<Vec<u8>> = vec![hex!("01 9000").to_vec(), hex!("9000").to_vec()];
        replies.extend(std::iter::repeat_n(hex!("AA 6101").to_vec(), MAX_GET_RESPONSE + 1));
        let replies: Vec<&[u8]> = replies.iter().map(Vec::as_slice).collect();
        let card = Arc::new(ScriptedCard::new(&replies));
        let session = open_session(&card, &RspConfig::default()).await;

        let err = session.store_data(&hex!("BF2E00")).await.unwrap_err();
        assert!(matches!(err, RspError::Channel(_)));
        assert_eq!(card.sent().len(), 2 + 1 + MAX_GET_RESPONSE);
    }

    #[tokio::test]
    async fn test_card_error_carries_status_word() {
        let card = Arc::new(ScriptedCard::new(&[&hex!("01 9000"), &hex!("9000"), &hex!("6985")]));
        let session = open_session(&card, &RspConfig::default()).await;
        let err = session.store_data(&hex!("BF2E00")).await.unwrap_err();
        assert_eq!(err, RspError::Card { sw: 0x6985 });
        assert_eq!(card.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_store_data_requires_open_session() {
        let card = Arc::new(ScriptedCard::new(&[]));
        let session = ApduSession::new(card, &RspConfig::default()).unwrap();
        assert!(matches!(session.store_data(&[0x01]).await, Err(RspError::Channel(_))));
    }
}
