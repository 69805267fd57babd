//! ES10a/b/c functions
//!
//! Each function is one STORE DATA exchange with the ISD-R, except
//! `load_bpp_segment` which sends one segment of a Bound Profile Package.

use crate::apdu::ApduSession;
use crate::error::RspResult;
use rsp_application::{
    tags, AuthenticateServerRequest, AuthenticateServerResponse, BppSegment, CancelSessionRequest,
    CancelSessionResponse, ConfiguredAddresses, EidResponse, EuiccChallenge, EuiccInfo1, EuiccInfo2,
    GetConfiguredAddressesRequest, GetEidRequest, GetEuiccChallengeRequest, GetEuiccInfo1Request,
    GetEuiccInfo2Request, GetRatRequest, ListNotificationRequest, NotificationMetadata,
    NotificationMetadataList, PendingNotification, PendingNotificationList, PrepareDownloadRequest,
    PrepareDownloadResponse, ProfileCommand, ProfileInfo, ProfileInfoList, ProfileInfoListRequest,
    ProfileInstallationResult, RatResponse, RemoveNotificationRequest, ResultCode,
    RetrieveNotificationsListRequest, RulesAuthorisationTable, SetNicknameRequest, TlvMarshal,
    TlvUnmarshal,
};
use rsp_core::{Eid, SequenceNumber};
use rsp_transport::ApduChannel;

impl<C: ApduChannel> ApduSession<C> {
    /// ES10b.GetEUICCChallenge
    pub async fn get_euicc_challenge(&self) -> RspResult<Vec<u8>> {
        let EuiccChallenge(challenge) = self.call(&GetEuiccChallengeRequest).await?;
        Ok(challenge)
    }

    /// ES10b.GetEUICCInfo (EUICCInfo1)
    pub async fn get_euicc_info1(&self) -> RspResult<EuiccInfo1> {
        let raw = self.store_data(&GetEuiccInfo1Request.to_bytes()?).await?;
        EuiccInfo1::parse(raw)
    }

    /// ES10b.GetEUICCInfo (EUICCInfo2)
    pub async fn get_euicc_info2(&self) -> RspResult<EuiccInfo2> {
        self.call(&GetEuiccInfo2Request).await
    }

    /// ES10c.GetEID
    pub async fn get_eid(&self) -> RspResult<Eid> {
        let EidResponse(eid) = self.call(&GetEidRequest).await?;
        Ok(eid)
    }

    /// ES10a.GetEuiccConfiguredAddresses
    pub async fn get_configured_addresses(&self) -> RspResult<ConfiguredAddresses> {
        self.call(&GetConfiguredAddressesRequest).await
    }

    /// ES10b.GetRAT
    pub async fn get_rat(&self) -> RspResult<Vec<RulesAuthorisationTable>> {
        let RatResponse(rules) = self.call(&GetRatRequest).await?;
        Ok(rules)
    }

    /// ES10c.GetProfilesInfo
    pub async fn get_profiles_info(&self, request: &ProfileInfoListRequest) -> RspResult<Vec<ProfileInfo>> {
        let ProfileInfoList(profiles) = self.call(request).await?;
        Ok(profiles)
    }

    /// ES10c.EnableProfile, DisableProfile or DeleteProfile
    pub async fn profile_command(&self, command: &ProfileCommand) -> RspResult<()> {
        let result: ResultCode = self.call(command).await?;
        result.check(command.root(), command.function())
    }

    /// ES10c.SetNickname
    pub async fn set_nickname(&self, request: &SetNicknameRequest) -> RspResult<()> {
        let result: ResultCode = self.call(request).await?;
        result.check(tags::SET_NICKNAME, "SetNickname")
    }

    /// ES10b.ListNotification
    pub async fn list_notification(&self, request: &ListNotificationRequest) -> RspResult<Vec<NotificationMetadata>> {
        let NotificationMetadataList(list) = self.call(request).await?;
        Ok(list)
    }

    /// ES10b.RetrieveNotificationsList
    pub async fn retrieve_notifications_list(
        &self,
        sequence_number: Option<SequenceNumber>,
    ) -> RspResult<Vec<PendingNotification>> {
        let request = RetrieveNotificationsListRequest { sequence_number };
        let PendingNotificationList(list) = self.call(&request).await?;
        Ok(list)
    }

    /// ES10b.RemoveNotificationFromList
    pub async fn remove_notification_from_list(&self, sequence_number: SequenceNumber) -> RspResult<()> {
        let result: ResultCode = self.call(&RemoveNotificationRequest { sequence_number }).await?;
        result.check(tags::REMOVE_NOTIFICATION, "RemoveNotificationFromList")
    }

    /// ES10b.AuthenticateServer
    pub async fn authenticate_server(&self, request: &AuthenticateServerRequest) -> RspResult<Vec<u8>> {
        let AuthenticateServerResponse(response) = self.call(request).await?;
        Ok(response.raw)
    }

    /// ES10b.PrepareDownload
    pub async fn prepare_download(&self, request: &PrepareDownloadRequest) -> RspResult<Vec<u8>> {
        let PrepareDownloadResponse(response) = self.call(request).await?;
        Ok(response.raw)
    }

    /// ES10b.CancelSession; returns the signed response for the SM-DP+
    pub async fn cancel_session(&self, request: &CancelSessionRequest) -> RspResult<Vec<u8>> {
        let response: CancelSessionResponse = self.call(request).await?;
        Ok(response.raw)
    }

    /// ES10b.LoadBoundProfilePackage for one segment
    ///
    /// # Returns
    /// `Some` once the eUICC answers with a `ProfileInstallationResult`,
    /// which ends loading whether it reports success or an error.
    pub async fn load_bpp_segment(&self, segment: &BppSegment) -> RspResult<Option<ProfileInstallationResult>> {
        log::debug!("Loading BPP segment {} ({} bytes)", segment.kind, segment.data.len());
        let response = self.store_data(&segment.data).await?;
        if response.is_empty() {
            return Ok(None);
        }
        ProfileInstallationResult::from_bytes(&response).map(Some)
    }
}
