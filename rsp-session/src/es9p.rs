//! ES9+ (LPA to SM-DP+) and ES11 (LPA to SM-DS) functions

use crate::error::{RspError, RspResult};
use crate::remote::{b64, from_b64, server_host, RemoteSession};
use rsp_application::EventEntry;
use rsp_core::TransactionId;
use rsp_transport::HttpTransport;
use serde::{Deserialize, Serialize};

const ES9P_INITIATE_AUTHENTICATION: &str = "/gsma/rsp2/es9plus/initiateAuthentication";
const ES9P_AUTHENTICATE_CLIENT: &str = "/gsma/rsp2/es9plus/authenticateClient";
const ES9P_GET_BOUND_PROFILE_PACKAGE: &str = "/gsma/rsp2/es9plus/getBoundProfilePackage";
const ES9P_HANDLE_NOTIFICATION: &str = "/gsma/rsp2/es9plus/handleNotification";
const ES9P_CANCEL_SESSION: &str = "/gsma/rsp2/es9plus/cancelSession";
const ES11_INITIATE_AUTHENTICATION: &str = "/gsma/rsp2/es11/initiateAuthentication";
const ES11_AUTHENTICATE_CLIENT: &str = "/gsma/rsp2/es11/authenticateClient";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Es9pInitiateAuthenticationRequest {
    euicc_challenge: String,
    euicc_info1: String,
    smdp_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Es11InitiateAuthenticationRequest {
    euicc_challenge: String,
    euicc_info1: String,
    smds_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateAuthenticationResponse {
    transaction_id: String,
    server_signed1: String,
    server_signature1: String,
    #[serde(rename = "euiccCiPKIdToBeUsed", alias = "euiccCiPkIdToBeUsed")]
    euicc_ci_pkid_to_be_used: String,
    server_certificate: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateClientRequest {
    transaction_id: String,
    authenticate_server_response: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Es9pAuthenticateClientResponse {
    transaction_id: String,
    profile_metadata: Option<String>,
    smdp_signed2: String,
    smdp_signature2: String,
    smdp_certificate: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Es11AuthenticateClientResponse {
    #[serde(default)]
    event_entries: Vec<EventEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetBoundProfilePackageRequest {
    transaction_id: String,
    prepare_download_response: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetBoundProfilePackageResponse {
    transaction_id: String,
    bound_profile_package: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HandleNotificationRequest {
    pending_notification: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelSessionRequest {
    transaction_id: String,
    cancel_session_response: String,
}

#[derive(Debug, Deserialize)]
struct HeaderOnly {}

/// Decoded `initiateAuthentication` response, TLV fields still encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateAuthenticationOk {
    pub transaction_id: TransactionId,
    pub server_signed1: Vec<u8>,
    pub server_signature1: Vec<u8>,
    pub euicc_ci_pkid_to_be_used: Vec<u8>,
    pub server_certificate: Vec<u8>,
}

/// Decoded ES9+ `authenticateClient` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateClientOk {
    pub transaction_id: TransactionId,
    pub profile_metadata: Option<Vec<u8>>,
    pub smdp_signed2: Vec<u8>,
    pub smdp_signature2: Vec<u8>,
    pub smdp_certificate: Vec<u8>,
}

fn parse_transaction_id(value: &str) -> RspResult<TransactionId> {
    TransactionId::from_hex(value)
}

fn same_transaction(expected: &TransactionId, received: &str) -> RspResult<()> {
    let received = parse_transaction_id(received)?;
    if &received == expected {
        Ok(())
    } else {
        Err(RspError::Decode(format!(
            "Server answered for transaction {} instead of {}",
            received, expected
        )))
    }
}

impl InitiateAuthenticationResponse {
    fn decode(self) -> RspResult<InitiateAuthenticationOk> {
        Ok(InitiateAuthenticationOk {
            transaction_id: parse_transaction_id(&self.transaction_id)?,
            server_signed1: from_b64("serverSigned1", &self.server_signed1)?,
            server_signature1: from_b64("serverSignature1", &self.server_signature1)?,
            euicc_ci_pkid_to_be_used: from_b64("euiccCiPKIdToBeUsed", &self.euicc_ci_pkid_to_be_used)?,
            server_certificate: from_b64("serverCertificate", &self.server_certificate)?,
        })
    }
}

impl<H: HttpTransport> RemoteSession<H> {
    /// ES9+.InitiateAuthentication
    ///
    /// # Arguments
    /// * `smdp_address` - SM-DP+ address; its host is also sent in the body
    /// * `euicc_challenge` - Challenge from ES10b.GetEUICCChallenge
    /// * `euicc_info1` - Raw EUICCInfo1 TLV
    pub async fn initiate_authentication(
        &self,
        smdp_address: &str,
        euicc_challenge: &[u8],
        euicc_info1: &[u8],
    ) -> RspResult<InitiateAuthenticationOk> {
        let request = Es9pInitiateAuthenticationRequest {
            euicc_challenge: b64(euicc_challenge),
            euicc_info1: b64(euicc_info1),
            smdp_address: server_host(smdp_address).to_string(),
        };
        let response: InitiateAuthenticationResponse =
            self.invoke(smdp_address, ES9P_INITIATE_AUTHENTICATION, &request).await?;
        response.decode()
    }

    /// ES9+.AuthenticateClient
    pub async fn authenticate_client(
        &self,
        smdp_address: &str,
        transaction_id: &TransactionId,
        authenticate_server_response: &[u8],
    ) -> RspResult<AuthenticateClientOk> {
        let request = AuthenticateClientRequest {
            transaction_id: transaction_id.to_hex(),
            authenticate_server_response: b64(authenticate_server_response),
        };
        let response: Es9pAuthenticateClientResponse =
            self.invoke(smdp_address, ES9P_AUTHENTICATE_CLIENT, &request).await?;
        same_transaction(transaction_id, &response.transaction_id)?;

        let profile_metadata = match response.profile_metadata {
            Some(metadata) => Some(from_b64("profileMetadata", &metadata)?),
            None => None,
        };
        Ok(AuthenticateClientOk {
            transaction_id: transaction_id.clone(),
            profile_metadata,
            smdp_signed2: from_b64("smdpSigned2", &response.smdp_signed2)?,
            smdp_signature2: from_b64("smdpSignature2", &response.smdp_signature2)?,
            smdp_certificate: from_b64("smdpCertificate", &response.smdp_certificate)?,
        })
    }

    /// ES9+.GetBoundProfilePackage
    ///
    /// # Returns
    /// The raw Bound Profile Package (`BF36`)
    pub async fn get_bound_profile_package(
        &self,
        smdp_address: &str,
        transaction_id: &TransactionId,
        prepare_download_response: &[u8],
    ) -> RspResult<Vec<u8>> {
        let request = GetBoundProfilePackageRequest {
            transaction_id: transaction_id.to_hex(),
            prepare_download_response: b64(prepare_download_response),
        };
        let response: GetBoundProfilePackageResponse =
            self.invoke(smdp_address, ES9P_GET_BOUND_PROFILE_PACKAGE, &request).await?;
        same_transaction(transaction_id, &response.transaction_id)?;
        from_b64("boundProfilePackage", &response.bound_profile_package)
    }

    /// ES9+.HandleNotification
    ///
    /// # Arguments
    /// * `address` - Notification address embedded in the notification
    /// * `pending_notification` - Raw pending notification TLV
    pub async fn handle_notification(&self, address: &str, pending_notification: &[u8]) -> RspResult<()> {
        let request = HandleNotificationRequest {
            pending_notification: b64(pending_notification),
        };
        self.invoke_no_content(address, ES9P_HANDLE_NOTIFICATION, &request).await
    }

    /// ES9+.CancelSession
    pub async fn cancel_session(
        &self,
        smdp_address: &str,
        transaction_id: &TransactionId,
        cancel_session_response: &[u8],
    ) -> RspResult<()> {
        let request = CancelSessionRequest {
            transaction_id: transaction_id.to_hex(),
            cancel_session_response: b64(cancel_session_response),
        };
        let _: HeaderOnly = self.invoke(smdp_address, ES9P_CANCEL_SESSION, &request).await?;
        Ok(())
    }

    /// ES11.InitiateAuthentication
    pub async fn es11_initiate_authentication(
        &self,
        smds_address: &str,
        euicc_challenge: &[u8],
        euicc_info1: &[u8],
    ) -> RspResult<InitiateAuthenticationOk> {
        let request = Es11InitiateAuthenticationRequest {
            euicc_challenge: b64(euicc_challenge),
            euicc_info1: b64(euicc_info1),
            smds_address: server_host(smds_address).to_string(),
        };
        let response: InitiateAuthenticationResponse =
            self.invoke(smds_address, ES11_INITIATE_AUTHENTICATION, &request).await?;
        response.decode()
    }

    /// ES11.AuthenticateClient
    ///
    /// # Returns
    /// The event entries registered for this eUICC, possibly none
    pub async fn es11_authenticate_client(
        &self,
        smds_address: &str,
        transaction_id: &TransactionId,
        authenticate_server_response: &[u8],
    ) -> RspResult<Vec<EventEntry>> {
        let request = AuthenticateClientRequest {
            transaction_id: transaction_id.to_hex(),
            authenticate_server_response: b64(authenticate_server_response),
        };
        let response: Es11AuthenticateClientResponse =
            self.invoke(smds_address, ES11_AUTHENTICATE_CLIENT, &request).await?;
        Ok(response.event_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::testing::RecordingHttp;
    use serde_json::json;

    fn success(mut body: serde_json::Value) -> rsp_transport::HttpResponse {
        body["header"] = json!({"functionExecutionStatus": {"status": "Executed-Success"}});
        RecordingHttp::json(200, body)
    }

    fn transaction() -> TransactionId {
        TransactionId::new(vec![0x01, 0xAB])
    }

    #[tokio::test]
    async fn test_initiate_authentication() {
        let http = RecordingHttp::new(vec![success(json!({
            "transactionId": "01AB",
            "serverSigned1": "MAA=",
            "serverSignature1": "XzcA",
            "euiccCiPKIdToBeUsed": "BAA=",
            "serverCertificate": "MAA="
        }))]);
        let session = RemoteSession::new(http);

        let ok = session
            .initiate_authentication("smdp.io", &[0x01, 0x02], &[0xBF, 0x20, 0x00])
            .await
            .unwrap();
        assert_eq!(ok.transaction_id, transaction());
        assert_eq!(ok.server_signed1, vec![0x30, 0x00]);
        assert_eq!(ok.server_signature1, vec![0x5F, 0x37, 0x00]);

        let sent = session.transport().requests();
        assert_eq!(sent[0].url, "https://smdp.io/gsma/rsp2/es9plus/initiateAuthentication");
        assert_eq!(
            sent[0].body,
            json!({"euiccChallenge": "AQI=", "euiccInfo1": "vyAA", "smdpAddress": "smdp.io"})
        );
    }

    #[tokio::test]
    async fn test_authenticate_client_checks_transaction() {
        let http = RecordingHttp::new(vec![success(json!({
            "transactionId": "FFFF",
            "smdpSigned2": "MAA=",
            "smdpSignature2": "XzcA",
            "smdpCertificate": "MAA="
        }))]);
        let session = RemoteSession::new(http);

        let result = session.authenticate_client("smdp.io", &transaction(), &[0xBF, 0x38, 0x00]).await;
        assert!(matches!(result, Err(RspError::Decode(_))));
        assert_eq!(
            session.transport().requests()[0].body,
            json!({"transactionId": "01AB", "authenticateServerResponse": "vzgA"})
        );
    }

    #[tokio::test]
    async fn test_get_bound_profile_package() {
        let http = RecordingHttp::new(vec![success(json!({
            "transactionId": "01AB",
            "boundProfilePackage": "vzYA"
        }))]);
        let session = RemoteSession::new(http);

        let bpp = session
            .get_bound_profile_package("smdp.io", &transaction(), &[0xBF, 0x21, 0x00])
            .await
            .unwrap();
        assert_eq!(bpp, vec![0xBF, 0x36, 0x00]);
    }

    #[tokio::test]
    async fn test_handle_notification_no_content() {
        let http = RecordingHttp::new(vec![rsp_transport::HttpResponse::new(204, Vec::new())]);
        let session = RemoteSession::new(http);

        session.handle_notification("notify.io", &[0xBF, 0x37, 0x00]).await.unwrap();
        let sent = session.transport().requests();
        assert_eq!(sent[0].url, "https://notify.io/gsma/rsp2/es9plus/handleNotification");
        assert_eq!(sent[0].body, json!({"pendingNotification": "vzcA"}));
    }

    #[tokio::test]
    async fn test_es11_event_entries() {
        let http = RecordingHttp::new(vec![
            success(json!({
                "eventEntries": [{"eventId": "E1", "rspServerAddress": "smdp.io"}]
            })),
            success(json!({})),
        ]);
        let session = RemoteSession::new(http);

        let events = session
            .es11_authenticate_client("lpa.ds.gsma.com", &transaction(), &[0xBF, 0x38, 0x00])
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rsp_server_address, "smdp.io");

        let none = session
            .es11_authenticate_client("lpa.ds.gsma.com", &transaction(), &[0xBF, 0x38, 0x00])
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(
            session.transport().requests()[0].url,
            "https://lpa.ds.gsma.com/gsma/rsp2/es11/authenticateClient"
        );
    }
}
