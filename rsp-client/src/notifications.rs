//! Notification delivery
//!
//! A notification is retrieved from the eUICC by sequence number, posted to
//! the address in its metadata and, when requested, removed from the eUICC.
//! Delivery and removal are separate steps: a removal failure is reported
//! next to a successful delivery and never retried here, so the same
//! notification may be delivered again later.

use crate::client::RspClient;
use crate::error::{RspError, RspResult};
use rsp_application::{ListNotificationRequest, NotificationEvent, NotificationMetadata, PendingNotification};
use rsp_core::SequenceNumber;
use rsp_session::{ApduSession, RemoteSession};
use rsp_transport::{ApduChannel, HttpTransport};

/// Batch processing options
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationOptions {
    /// Remove each notification from the eUICC after delivery
    pub auto_remove: bool,
    /// Keep going after a failed notification
    pub continue_on_error: bool,
}

/// Result of processing one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub sequence_number: SequenceNumber,
    pub delivered: bool,
    pub removed: bool,
    /// Retrieval or delivery error
    pub error: Option<RspError>,
    /// Removal error after a successful delivery
    pub removal_error: Option<RspError>,
}

impl NotificationOutcome {
    fn failed(sequence_number: SequenceNumber, error: RspError) -> Self {
        Self {
            sequence_number,
            delivered: false,
            removed: false,
            error: Some(error),
            removal_error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

async fn retrieve<C: ApduChannel>(card: &ApduSession<C>, sequence_number: SequenceNumber) -> RspResult<PendingNotification> {
    card.retrieve_notifications_list(Some(sequence_number))
        .await?
        .into_iter()
        .find(|pending| pending.metadata.sequence_number == sequence_number)
        .ok_or(RspError::NotificationNotFound(sequence_number.0))
}

async fn deliver<C: ApduChannel, H: HttpTransport>(
    card: &ApduSession<C>,
    remote: &RemoteSession<H>,
    pending: &PendingNotification,
    auto_remove: bool,
) -> NotificationOutcome {
    let metadata = &pending.metadata;
    let sequence_number = metadata.sequence_number;

    if let Err(e) = remote
        .handle_notification(&metadata.notification_address, &pending.raw)
        .await
    {
        log::warn!(
            "Delivery of notification {} to {} failed: {}",
            sequence_number,
            metadata.notification_address,
            e
        );
        return NotificationOutcome::failed(sequence_number, e);
    }
    log::info!("Delivered notification {} to {}", sequence_number, metadata.notification_address);

    let mut outcome = NotificationOutcome {
        sequence_number,
        delivered: true,
        removed: false,
        error: None,
        removal_error: None,
    };
    if auto_remove {
        match card.remove_notification_from_list(sequence_number).await {
            Ok(()) => outcome.removed = true,
            Err(e) => {
                log::warn!("Notification {} delivered but not removed: {}", sequence_number, e);
                outcome.removal_error = Some(e);
            }
        }
    }
    outcome
}

async fn process_one<C: ApduChannel, H: HttpTransport>(
    card: &ApduSession<C>,
    remote: &RemoteSession<H>,
    sequence_number: SequenceNumber,
    auto_remove: bool,
) -> NotificationOutcome {
    match retrieve(card, sequence_number).await {
        Ok(pending) => deliver(card, remote, &pending, auto_remove).await,
        Err(e) => NotificationOutcome::failed(sequence_number, e),
    }
}

impl<C: ApduChannel, H: HttpTransport> RspClient<C, H> {
    /// Metadata of the pending notifications, optionally filtered by operation
    pub async fn list_notifications(&self, filter: &[NotificationEvent]) -> RspResult<Vec<NotificationMetadata>> {
        let card = self.acquire().await?;
        let request = ListNotificationRequest {
            filter: filter.to_vec(),
        };
        let result = card.list_notification(&request).await;
        card.release().await;
        result
    }

    /// Deliver one notification
    ///
    /// # Errors
    /// `NotificationNotFound` when the eUICC holds no such notification;
    /// card and remote errors from retrieval and delivery. A removal error
    /// is returned inside the outcome.
    pub async fn process_notification(
        &self,
        sequence_number: SequenceNumber,
        auto_remove: bool,
    ) -> RspResult<NotificationOutcome> {
        let card = self.acquire().await?;
        let mut outcome = process_one(&card, self.remote(), sequence_number, auto_remove).await;
        card.release().await;

        match outcome.error.take() {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    /// Deliver the given notifications in order
    ///
    /// Stops after the first failed notification unless
    /// `continue_on_error` is set; the failed outcome is the last element.
    pub async fn process_notifications(
        &self,
        sequence_numbers: &[SequenceNumber],
        options: &NotificationOptions,
    ) -> RspResult<Vec<NotificationOutcome>> {
        let card = self.acquire().await?;
        let mut outcomes = Vec::with_capacity(sequence_numbers.len());

        for &sequence_number in sequence_numbers {
            let outcome = process_one(&card, self.remote(), sequence_number, options.auto_remove).await;
            let failed = !outcome.is_success();
            outcomes.push(outcome);
            if failed && !options.continue_on_error {
                break;
            }
        }

        card.release().await;
        Ok(outcomes)
    }

    /// Deliver every pending notification, lowest sequence number first
    ///
    /// # Errors
    /// Only when the pending list cannot be retrieved; per notification
    /// failures are reported in the outcomes.
    pub async fn process_all_notifications(&self, options: &NotificationOptions) -> RspResult<Vec<NotificationOutcome>> {
        let card = self.acquire().await?;
        let mut pending = match card.retrieve_notifications_list(None).await {
            Ok(pending) => pending,
            Err(e) => {
                card.release().await;
                return Err(e);
            }
        };
        pending.sort_by_key(|notification| notification.metadata.sequence_number.0);
        log::debug!("{} pending notification(s)", pending.len());

        let mut outcomes = Vec::with_capacity(pending.len());
        for notification in &pending {
            let outcome = deliver(&card, self.remote(), notification, options.auto_remove).await;
            let failed = !outcome.is_success();
            outcomes.push(outcome);
            if failed && !options.continue_on_error {
                break;
            }
        }

        card.release().await;
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use rsp_application::tags::{self, ctx_constructed};
    use rsp_application::{Tlv, TlvMarshal};
    use rsp_transport::HttpResponse;
    use serde_json::json;
    use std::sync::Arc;

    /// `OtherSignedNotification` for `sequence_number`
    fn other_notification(sequence_number: u32, address: &str) -> Tlv {
        Tlv::constructed(
            tags::SEQUENCE,
            vec![
                metadata(sequence_number, address).to_tlv().unwrap(),
                Tlv::primitive(tags::SIGNATURE, vec![0xEE]),
            ],
        )
    }

    fn pending_list(notifications: Vec<Tlv>) -> Vec<u8> {
        Tlv::constructed(
            tags::RETRIEVE_NOTIFICATIONS_LIST,
            vec![Tlv::constructed(ctx_constructed(0), notifications)],
        )
        .encode()
    }

    fn setup() -> (Arc<FakeEuicc>, Arc<FakeServers>) {
        (Arc::new(FakeEuicc::new()), Arc::new(FakeServers::new()))
    }

    fn delivered() -> HttpResponse {
        HttpResponse::new(204, Vec::new())
    }

    #[tokio::test]
    async fn test_list_notifications() {
        let (card, servers) = setup();
        card.reply(
            tags::LIST_NOTIFICATION,
            Tlv::constructed(
                tags::LIST_NOTIFICATION,
                vec![Tlv::constructed(
                    ctx_constructed(0),
                    vec![metadata(3, SMDP).to_tlv().unwrap(), metadata(4, "other.io").to_tlv().unwrap()],
                )],
            )
            .encode(),
        );
        let client = fake_client(card.clone(), servers);

        let list = client.list_notifications(&[]).await.unwrap();
        assert_eq!(list, vec![metadata(3, SMDP), metadata(4, "other.io")]);
        assert_eq!(card.received()[0], vec![0xBF, 0x28, 0x00]);
    }

    #[tokio::test]
    async fn test_process_notification_delivers_and_removes() {
        let (card, servers) = setup();
        let notification = other_notification(7, SMDP);
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(vec![notification.clone()]));
        card.reply(tags::REMOVE_NOTIFICATION, result_code(tags::REMOVE_NOTIFICATION, 0));
        servers.respond("es9plus/handleNotification", delivered());
        let client = fake_client(card.clone(), servers.clone());

        let outcome = client.process_notification(SequenceNumber(7), true).await.unwrap();
        assert!(outcome.delivered);
        assert!(outcome.removed);
        assert_eq!(outcome.removal_error, None);

        let requests = servers.requests();
        let (url, body) = &requests[0];
        assert_eq!(url, "https://smdp.io/gsma/rsp2/es9plus/handleNotification");
        assert_eq!(body, &json!({"pendingNotification": b64(&notification.encode())}));
        assert_eq!(card.received_with(tags::REMOVE_NOTIFICATION)[0], vec![0xBF, 0x30, 0x03, 0x80, 0x01, 0x07]);
    }

    #[tokio::test]
    async fn test_removal_failure_keeps_delivery() {
        let (card, servers) = setup();
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(vec![other_notification(7, SMDP)]));
        card.reply(tags::REMOVE_NOTIFICATION, result_code(tags::REMOVE_NOTIFICATION, 1));
        servers.respond("es9plus/handleNotification", delivered());
        let client = fake_client(card, servers);

        let outcome = client.process_notification(SequenceNumber(7), true).await.unwrap();
        assert!(outcome.delivered);
        assert!(!outcome.removed);
        assert_eq!(
            outcome.removal_error,
            Some(RspError::Euicc {
                function: "RemoveNotificationFromList",
                code: 1
            })
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_skips_removal() {
        let (card, servers) = setup();
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(vec![other_notification(7, SMDP)]));
        servers.respond("es9plus/handleNotification", HttpResponse::new(500, Vec::new()));
        let client = fake_client(card.clone(), servers);

        let result = client.process_notification(SequenceNumber(7), true).await;
        assert!(matches!(result, Err(RspError::Http { status: 500, .. })));
        assert!(card.received_with(tags::REMOVE_NOTIFICATION).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_notification() {
        let (card, servers) = setup();
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(Vec::new()));
        let client = fake_client(card, servers.clone());

        let result = client.process_notification(SequenceNumber(9), false).await;
        assert_eq!(result, Err(RspError::NotificationNotFound(9)));
        assert!(servers.requests().is_empty());
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let (card, servers) = setup();
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(vec![other_notification(1, SMDP)]));
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(vec![other_notification(2, SMDP)]));
        servers.respond("es9plus/handleNotification", delivered());
        servers.respond("es9plus/handleNotification", HttpResponse::new(500, Vec::new()));
        let client = fake_client(card, servers.clone());

        let outcomes = client
            .process_notifications(
                &[SequenceNumber(1), SequenceNumber(2), SequenceNumber(3)],
                &NotificationOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].delivered);
        assert!(!outcomes[0].removed);
        assert!(!outcomes[1].is_success());
        assert_eq!(servers.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_continues_on_error() {
        let (card, servers) = setup();
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(Vec::new()));
        card.reply(tags::RETRIEVE_NOTIFICATIONS_LIST, pending_list(vec![other_notification(2, SMDP)]));
        card.reply(tags::REMOVE_NOTIFICATION, result_code(tags::REMOVE_NOTIFICATION, 0));
        servers.respond("es9plus/handleNotification", delivered());
        let client = fake_client(card, servers);

        let options = NotificationOptions {
            auto_remove: true,
            continue_on_error: true,
        };
        let outcomes = client
            .process_notifications(&[SequenceNumber(1), SequenceNumber(2)], &options)
            .await
            .unwrap();
        assert_eq!(outcomes[0].error, Some(RspError::NotificationNotFound(1)));
        assert!(outcomes[1].delivered);
        assert!(outcomes[1].removed);
    }

    #[tokio::test]
    async fn test_process_all_in_sequence_order() {
        let (card, servers) = setup();
        card.reply(
            tags::RETRIEVE_NOTIFICATIONS_LIST,
            pending_list(vec![other_notification(5, "other.io"), other_notification(2, SMDP)]),
        );
        servers.respond("es9plus/handleNotification", delivered());
        servers.respond("es9plus/handleNotification", delivered());
        let client = fake_client(card, servers.clone());

        let outcomes = client
            .process_all_notifications(&NotificationOptions::default())
            .await
            .unwrap();
        let order: Vec<u32> = outcomes.iter().map(|o| o.sequence_number.0).collect();
        assert_eq!(order, vec![2, 5]);

        let urls: Vec<String> = servers.requests().into_iter().map(|(url, _)| url).collect();
        assert_eq!(
            urls,
            vec![
                "https://smdp.io/gsma/rsp2/es9plus/handleNotification",
                "https://other.io/gsma/rsp2/es9plus/handleNotification",
            ]
        );
    }
}
