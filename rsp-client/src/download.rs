//! Profile download and installation
//!
//! # State machine
//!
//! ```text
//! Idle -> ChallengeRequested -> ServerAuthenticated -> AuthorizedForDownload
//!      -> BppReceiving -> BppInstalling -> Completed
//! ```
//!
//! Any error ends the session with a [`DownloadFailure`] recording the last
//! stage reached. The eUICC starts writing the profile with the
//! sequenceOf86 header, so only failures at `BppInstalling` or later leave
//! the installed profile set in doubt.
//!
//! Cancellation is checked before every round trip and between segments
//! until `BppInstalling`; from there loading runs to completion. A cancelled
//! session, or one the SM-DP+ protected with a confirmation code the caller
//! did not supply, is closed with ES10b.CancelSession and ES9+.CancelSession
//! on a best-effort basis.

use crate::cancel::CancelToken;
use crate::client::RspClient;
use crate::error::{RspError, RspResult};
use rsp_application::{
    segment_bound_profile_package, ActivationCode, AuthenticateServerRequest, CancelSessionReason,
    CancelSessionRequest, DeviceInfo, PrepareDownloadRequest, ProfileInstallationResult, SmdpSigned2,
    TlvUnmarshal,
};
use rsp_core::{RspConfig, TransactionId};
use rsp_security::{hash_confirmation_code, verify_server_signed1};
use rsp_session::remote::server_host;
use rsp_session::{ApduSession, RemoteSession};
use rsp_transport::{ApduChannel, HttpTransport};
use std::fmt;

/// Stage of a download session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DownloadStage {
    Idle,
    ChallengeRequested,
    ServerAuthenticated,
    AuthorizedForDownload,
    BppReceiving,
    BppInstalling,
    Completed,
}

impl fmt::Display for DownloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadStage::Idle => "Idle",
            DownloadStage::ChallengeRequested => "ChallengeRequested",
            DownloadStage::ServerAuthenticated => "ServerAuthenticated",
            DownloadStage::AuthorizedForDownload => "AuthorizedForDownload",
            DownloadStage::BppReceiving => "BppReceiving",
            DownloadStage::BppInstalling => "BppInstalling",
            DownloadStage::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// Caller supplied download parameters
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Confirmation code, hashed into PrepareDownload when the SM-DP+ asks for it
    pub confirmation_code: Option<String>,
    /// IMEI for DeviceInfo, overriding the configured one
    pub imei: Option<String>,
    pub cancel: Option<CancelToken>,
}

/// Failed download
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Download failed in stage {stage}: {error}")]
pub struct DownloadFailure {
    /// Last stage reached before the failure
    pub stage: DownloadStage,
    #[source]
    pub error: RspError,
}

impl DownloadFailure {
    pub(crate) fn new(stage: DownloadStage, error: RspError) -> Self {
        Self { stage, error }
    }

    /// True when the eUICC may hold a partially or fully installed profile
    ///
    /// The caller must re-read the profile list instead of assuming either
    /// outcome.
    pub fn is_install_indeterminate(&self) -> bool {
        self.stage >= DownloadStage::BppInstalling
    }

    /// True when retrying with more input (a confirmation code) can succeed
    pub fn is_recoverable(&self) -> bool {
        self.error.is_recoverable()
    }
}

impl From<DownloadFailure> for RspError {
    fn from(failure: DownloadFailure) -> Self {
        failure.error
    }
}

/// State owned by one download attempt
struct DownloadSession<'a, C: ApduChannel, H: HttpTransport> {
    card: &'a ApduSession<C>,
    remote: &'a RemoteSession<H>,
    config: &'a RspConfig,
    options: &'a DownloadOptions,
    smdp_address: &'a str,
    stage: DownloadStage,
    transaction_id: Option<TransactionId>,
}

impl<'a, C: ApduChannel, H: HttpTransport> DownloadSession<'a, C, H> {
    fn advance(&mut self, next: DownloadStage) {
        log::debug!("Download {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn check_cancelled(&self) -> RspResult<()> {
        match &self.options.cancel {
            Some(token) if token.is_cancelled() => Err(RspError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn run(mut self, matching_id: Option<&str>) -> Result<ProfileInstallationResult, DownloadFailure> {
        match self.execute(matching_id).await {
            Ok(result) => {
                self.advance(DownloadStage::Completed);
                log::info!(
                    "Profile installed from {} (notification {})",
                    self.smdp_address,
                    result.notification.sequence_number
                );
                Ok(result)
            }
            Err(error) => {
                log::warn!("Download from {} failed in stage {}: {}", self.smdp_address, self.stage, error);
                let reason = match &error {
                    RspError::Cancelled => Some(CancelSessionReason::EndUserRejection),
                    RspError::ConfirmationCodeRequired => Some(CancelSessionReason::Postponed),
                    _ => None,
                };
                if let Some(reason) = reason {
                    self.abort(reason).await;
                }
                Err(DownloadFailure::new(self.stage, error))
            }
        }
    }

    async fn execute(&mut self, matching_id: Option<&str>) -> RspResult<ProfileInstallationResult> {
        self.check_cancelled()?;
        let challenge = self.card.get_euicc_challenge().await?;
        let info1 = self.card.get_euicc_info1().await?;
        self.advance(DownloadStage::ChallengeRequested);

        self.check_cancelled()?;
        let init = self
            .remote
            .initiate_authentication(self.smdp_address, &challenge, &info1.raw)
            .await?;
        verify_server_signed1(
            &init.server_signed1,
            &challenge,
            server_host(self.smdp_address),
            &init.transaction_id,
        )?;
        let transaction_id = init.transaction_id.clone();
        self.transaction_id = Some(transaction_id.clone());

        let imei = self.options.imei.as_deref().or(self.config.device.imei.as_deref());
        let request = AuthenticateServerRequest {
            server_signed1: init.server_signed1,
            server_signature1: init.server_signature1,
            euicc_ci_pkid_to_be_used: init.euicc_ci_pkid_to_be_used,
            server_certificate: init.server_certificate,
            matching_id: matching_id.map(str::to_string),
            device_info: DeviceInfo::from_config(&self.config.device, imei)?,
        };
        let authenticate_server_response = self.card.authenticate_server(&request).await?;

        self.check_cancelled()?;
        let client = self
            .remote
            .authenticate_client(self.smdp_address, &transaction_id, &authenticate_server_response)
            .await?;
        self.advance(DownloadStage::ServerAuthenticated);

        let signed2 = SmdpSigned2::from_bytes(&client.smdp_signed2)?;
        if signed2.transaction_id != transaction_id {
            return Err(RspError::Decode(format!(
                "smdpSigned2 carries transaction {} instead of {}",
                signed2.transaction_id, transaction_id
            )));
        }
        let hash_cc = if signed2.cc_required {
            let code = self
                .options
                .confirmation_code
                .as_deref()
                .ok_or(RspError::ConfirmationCodeRequired)?;
            Some(hash_confirmation_code(code, transaction_id.as_bytes()))
        } else {
            None
        };

        self.check_cancelled()?;
        let prepare = PrepareDownloadRequest {
            smdp_signed2: client.smdp_signed2,
            smdp_signature2: client.smdp_signature2,
            hash_cc,
            smdp_certificate: client.smdp_certificate,
        };
        let prepare_download_response = self.card.prepare_download(&prepare).await?;

        self.check_cancelled()?;
        let bpp = self
            .remote
            .get_bound_profile_package(self.smdp_address, &transaction_id, &prepare_download_response)
            .await?;
        self.advance(DownloadStage::AuthorizedForDownload);

        let segments = segment_bound_profile_package(&bpp)?;
        self.advance(DownloadStage::BppReceiving);

        for segment in &segments {
            if segment.kind.is_installing() {
                if self.stage != DownloadStage::BppInstalling {
                    self.advance(DownloadStage::BppInstalling);
                }
            } else {
                self.check_cancelled()?;
            }

            if let Some(result) = self.card.load_bpp_segment(segment).await? {
                return result.into_result();
            }
        }

        Err(RspError::Decode(
            "eUICC reported no ProfileInstallationResult after the last segment".to_string(),
        ))
    }

    /// Best-effort cancel of the server session
    async fn abort(&self, reason: CancelSessionReason) {
        let Some(transaction_id) = &self.transaction_id else {
            return;
        };

        let request = CancelSessionRequest {
            transaction_id: transaction_id.clone(),
            reason,
        };
        let response = match self.card.cancel_session(&request).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("eUICC refused to cancel session {}: {}", transaction_id, e);
                return;
            }
        };
        match self.remote.cancel_session(self.smdp_address, transaction_id, &response).await {
            Ok(()) => log::debug!("Cancelled session {} with {:?}", transaction_id, reason),
            Err(e) => log::warn!("Failed to cancel session {} on {}: {}", transaction_id, self.smdp_address, e),
        }
    }
}

/// Run a complete download on an already acquired card session
pub(crate) async fn download_with<C: ApduChannel, H: HttpTransport>(
    card: &ApduSession<C>,
    remote: &RemoteSession<H>,
    config: &RspConfig,
    activation_code: &ActivationCode,
    options: &DownloadOptions,
) -> Result<ProfileInstallationResult, DownloadFailure> {
    if activation_code.confirmation_code_required && options.confirmation_code.is_none() {
        return Err(DownloadFailure::new(DownloadStage::Idle, RspError::ConfirmationCodeRequired));
    }

    log::info!("Downloading profile from {}", activation_code.smdp_address);
    let session = DownloadSession {
        card,
        remote,
        config,
        options,
        smdp_address: &activation_code.smdp_address,
        stage: DownloadStage::Idle,
        transaction_id: None,
    };
    session.run(activation_code.matching_id.as_deref()).await
}

impl<C: ApduChannel, H: HttpTransport> RspClient<C, H> {
    /// Download and install the profile an activation code points at
    ///
    /// # Errors
    /// A [`DownloadFailure`] with the stage reached. `ConfirmationCodeRequired`
    /// is recoverable by retrying with `options.confirmation_code`.
    pub async fn download_profile(
        &self,
        activation_code: &ActivationCode,
        options: &DownloadOptions,
    ) -> Result<ProfileInstallationResult, DownloadFailure> {
        let card = self
            .acquire()
            .await
            .map_err(|e| DownloadFailure::new(DownloadStage::Idle, e))?;
        let result = download_with(&card, self.remote(), self.config(), activation_code, options).await;
        card.release().await;
        result
    }

    /// Cancel a download session the caller abandoned
    ///
    /// Asks the eUICC for a signed CancelSession response and forwards it
    /// to the SM-DP+.
    pub async fn cancel_session(
        &self,
        smdp_address: &str,
        transaction_id: &TransactionId,
        reason: CancelSessionReason,
    ) -> RspResult<()> {
        let card = self.acquire().await?;
        let request = CancelSessionRequest {
            transaction_id: transaction_id.clone(),
            reason,
        };
        let response = card.cancel_session(&request).await;
        card.release().await;
        self.remote().cancel_session(smdp_address, transaction_id, &response?).await
    }
}
