//! Profile management (ES10c)

use crate::client::RspClient;
use crate::error::RspResult;
use rsp_application::{Iccid, ProfileCommand, ProfileIdentifier, ProfileInfo, ProfileInfoListRequest, SetNicknameRequest};
use rsp_transport::{ApduChannel, HttpTransport};

impl<C: ApduChannel, H: HttpTransport> RspClient<C, H> {
    /// Installed profiles
    pub async fn list_profiles(&self) -> RspResult<Vec<ProfileInfo>> {
        let card = self.acquire().await?;
        let result = card.get_profiles_info(&ProfileInfoListRequest::default()).await;
        card.release().await;
        result
    }

    /// Profile with the given ICCID, if installed
    pub async fn get_profile(&self, iccid: &Iccid) -> RspResult<Option<ProfileInfo>> {
        let card = self.acquire().await?;
        let request = ProfileInfoListRequest {
            iccid: Some(iccid.clone()),
        };
        let result = card.get_profiles_info(&request).await;
        card.release().await;
        Ok(result?.into_iter().next())
    }

    pub async fn enable_profile(&self, profile: ProfileIdentifier, refresh: bool) -> RspResult<()> {
        self.run_profile_command(ProfileCommand::Enable { profile, refresh }).await
    }

    pub async fn disable_profile(&self, profile: ProfileIdentifier, refresh: bool) -> RspResult<()> {
        self.run_profile_command(ProfileCommand::Disable { profile, refresh }).await
    }

    /// Delete a disabled profile
    pub async fn delete_profile(&self, profile: ProfileIdentifier) -> RspResult<()> {
        self.run_profile_command(ProfileCommand::Delete { profile }).await
    }

    pub async fn set_nickname(&self, iccid: Iccid, nickname: &str) -> RspResult<()> {
        let request = SetNicknameRequest {
            iccid,
            nickname: nickname.to_string(),
        };
        let card = self.acquire().await?;
        let result = card.set_nickname(&request).await;
        card.release().await;
        if result.is_ok() {
            log::info!("Nickname of {} set to '{}'", request.iccid, request.nickname);
        }
        result
    }

    async fn run_profile_command(&self, command: ProfileCommand) -> RspResult<()> {
        let card = self.acquire().await?;
        let result = card.profile_command(&command).await;
        card.release().await;
        match &result {
            Ok(()) => log::info!("{} succeeded", command.function()),
            Err(e) => log::warn!("{} failed: {}", command.function(), e),
        }
        result
    }
}
