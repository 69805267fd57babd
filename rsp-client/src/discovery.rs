//! SM-DS event discovery
//!
//! Discovery authenticates the SM-DS the same way a download authenticates
//! the SM-DP+ (ChallengeRequested, then ServerAuthenticated) and ends with
//! the list of registered events. Nothing is installed.

use crate::client::RspClient;
use crate::download::{download_with, DownloadFailure, DownloadOptions, DownloadStage};
use crate::error::RspResult;
use rsp_application::{ActivationCode, AuthenticateServerRequest, DeviceInfo, EventEntry, ProfileInstallationResult};
use rsp_core::RspConfig;
use rsp_security::verify_server_signed1;
use rsp_session::remote::server_host;
use rsp_session::{ApduSession, RemoteSession};
use rsp_transport::{ApduChannel, HttpTransport};

/// Discovery parameters
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// SM-DS to query; the configured default SM-DS when unset
    pub smds_address: Option<String>,
    /// IMEI for DeviceInfo, overriding the configured one
    pub imei: Option<String>,
}

async fn discover_with<C: ApduChannel, H: HttpTransport>(
    card: &ApduSession<C>,
    remote: &RemoteSession<H>,
    config: &RspConfig,
    options: &DiscoveryOptions,
) -> RspResult<Vec<EventEntry>> {
    let smds_address = options
        .smds_address
        .as_deref()
        .unwrap_or(&config.default_smds_address);
    log::debug!("Discovering events on {}", smds_address);

    let challenge = card.get_euicc_challenge().await?;
    let info1 = card.get_euicc_info1().await?;
    log::debug!("Discovery -> ChallengeRequested");

    let init = remote
        .es11_initiate_authentication(smds_address, &challenge, &info1.raw)
        .await?;
    verify_server_signed1(
        &init.server_signed1,
        &challenge,
        server_host(smds_address),
        &init.transaction_id,
    )?;

    let imei = options.imei.as_deref().or(config.device.imei.as_deref());
    let request = AuthenticateServerRequest {
        server_signed1: init.server_signed1,
        server_signature1: init.server_signature1,
        euicc_ci_pkid_to_be_used: init.euicc_ci_pkid_to_be_used,
        server_certificate: init.server_certificate,
        matching_id: None,
        device_info: DeviceInfo::from_config(&config.device, imei)?,
    };
    let response = card.authenticate_server(&request).await?;

    let events = remote
        .es11_authenticate_client(smds_address, &init.transaction_id, &response)
        .await?;
    log::debug!("Discovery -> ServerAuthenticated");
    log::info!("{} event(s) registered on {}", events.len(), smds_address);
    Ok(events)
}

impl<C: ApduChannel, H: HttpTransport> RspClient<C, H> {
    /// Ask an SM-DS for the events registered for this eUICC
    ///
    /// An SM-DS without events yields an empty list; any transport or
    /// authentication failure is an error.
    pub async fn discover(&self, options: &DiscoveryOptions) -> RspResult<Vec<EventEntry>> {
        let card = self.acquire().await?;
        let result = discover_with(&card, self.remote(), self.config(), options).await;
        card.release().await;
        result
    }

    /// Discover, then download from the first event's SM-DP+
    ///
    /// Later events are ignored. The event id is sent as the matching id.
    ///
    /// # Returns
    /// `None` when the SM-DS holds no event
    pub async fn discover_and_install(
        &self,
        discovery: &DiscoveryOptions,
        download: &DownloadOptions,
    ) -> Result<Option<ProfileInstallationResult>, DownloadFailure> {
        let card = self
            .acquire()
            .await
            .map_err(|e| DownloadFailure::new(DownloadStage::Idle, e))?;

        let result = match discover_with(&card, self.remote(), self.config(), discovery).await {
            Ok(events) => match events.into_iter().next() {
                Some(event) => {
                    let code = ActivationCode::for_address(event.rsp_server_address).with_matching_id(event.event_id);
                    download_with(&card, self.remote(), self.config(), &code, download)
                        .await
                        .map(Some)
                }
                None => Ok(None),
            },
            Err(e) => Err(DownloadFailure::new(DownloadStage::Idle, e)),
        };

        card.release().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RspError;
    use crate::testing::*;
    use rsp_application::tags::{self, ctx, ctx_constructed};
    use rsp_application::Tlv;
    use rsp_transport::HttpResponse;
    use serde_json::json;
    use std::sync::Arc;

    fn script_discovery(card: &FakeEuicc, servers: &FakeServers, events: serde_json::Value) {
        script_authentication(card);
        servers.reply("es11/initiateAuthentication", initiate_authentication_body(SMDS));
        servers.reply("es11/authenticateClient", json!({"transactionId": "01AB", "eventEntries": events}));
    }

    #[tokio::test]
    async fn test_discover_without_events() {
        let card = Arc::new(FakeEuicc::new());
        let servers = Arc::new(FakeServers::new());
        script_discovery(&card, &servers, json!([]));
        let client = fake_client(card.clone(), servers.clone());

        let events = client.discover(&DiscoveryOptions::default()).await.unwrap();
        assert!(events.is_empty());

        let requests = servers.requests();
        let (url, body) = &requests[0];
        assert_eq!(url, "https://lpa.ds.gsma.com/gsma/rsp2/es11/initiateAuthentication");
        assert_eq!(body["smdsAddress"], SMDS);

        let request = Tlv::decode(&card.received_with(tags::AUTHENTICATE_SERVER)[0]).unwrap();
        let common = request
            .require(ctx_constructed(0), "ctxParams1")
            .unwrap()
            .require(ctx_constructed(0), "ctxParamsForCommonAuthentication")
            .unwrap();
        assert!(common.find(ctx(0)).is_none());
    }

    #[tokio::test]
    async fn test_discover_returns_events() {
        let card = Arc::new(FakeEuicc::new());
        let servers = Arc::new(FakeServers::new());
        script_discovery(
            &card,
            &servers,
            json!([
                {"eventId": "EV-1", "rspServerAddress": "smdp.io"},
                {"eventId": "EV-2", "rspServerAddress": "other.io"}
            ]),
        );
        let client = fake_client(card, servers);

        let events = client.discover(&DiscoveryOptions::default()).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].rsp_server_address, "other.io");
    }

    #[tokio::test]
    async fn test_discover_failure_is_an_error() {
        let card = Arc::new(FakeEuicc::new());
        let servers = Arc::new(FakeServers::new());
        script_authentication(&card);
        servers.respond("es11/initiateAuthentication", HttpResponse::new(503, Vec::new()));
        let client = fake_client(card, servers);

        let options = DiscoveryOptions {
            smds_address: Some("smds.example".to_string()),
            ..DiscoveryOptions::default()
        };
        let result = client.discover(&options).await;
        assert_eq!(
            result,
            Err(RspError::Http {
                status: 503,
                url: "https://smds.example/gsma/rsp2/es11/initiateAuthentication".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_discover_and_install_without_events() {
        let card = Arc::new(FakeEuicc::new());
        let servers = Arc::new(FakeServers::new());
        script_discovery(&card, &servers, json!([]));
        let client = fake_client(card, servers.clone());

        let result = client
            .discover_and_install(&DiscoveryOptions::default(), &DownloadOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(!servers.called().iter().any(|f| f.starts_with("es9plus")));
    }

    #[tokio::test]
    async fn test_discover_and_install_uses_first_event() {
        let card = Arc::new(FakeEuicc::new());
        let servers = Arc::new(FakeServers::new());
        script_discovery(
            &card,
            &servers,
            json!([
                {"eventId": "EV-1", "rspServerAddress": SMDP},
                {"eventId": "EV-2", "rspServerAddress": "other.io"}
            ]),
        );
        script_download(&card, &servers, false);
        card.reply(ctx(6), installation_result(true));
        let client = fake_client(card.clone(), servers.clone());

        let result = client
            .discover_and_install(&DiscoveryOptions::default(), &DownloadOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_success());

        assert_eq!(
            servers.called(),
            vec![
                "es11/initiateAuthentication",
                "es11/authenticateClient",
                "es9plus/initiateAuthentication",
                "es9plus/authenticateClient",
                "es9plus/getBoundProfilePackage",
            ]
        );
        assert!(servers.requests().iter().all(|(url, _)| !url.contains("other.io")));

        let download_auth = Tlv::decode(&card.received_with(tags::AUTHENTICATE_SERVER)[1]).unwrap();
        let common = download_auth
            .require(ctx_constructed(0), "ctxParams1")
            .unwrap()
            .require(ctx_constructed(0), "ctxParamsForCommonAuthentication")
            .unwrap();
        assert_eq!(common.require(ctx(0), "matchingId").unwrap().value().to_vec(), b"EV-1".to_vec());
    }
}
