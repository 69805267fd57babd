//! eUICC information

use crate::client::RspClient;
use crate::error::RspResult;
use rsp_application::{ConfiguredAddresses, EuiccInfo2, RulesAuthorisationTable};
use rsp_core::Eid;
use rsp_transport::{ApduChannel, HttpTransport};

/// Aggregated chip information
///
/// Only the EID is mandatory. The other parts are read one by one and left
/// empty when the eUICC fails to provide them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipInfo {
    pub eid: Eid,
    pub configured_addresses: Option<ConfiguredAddresses>,
    pub euicc_info2: Option<EuiccInfo2>,
    pub rules_authorisation_table: Option<Vec<RulesAuthorisationTable>>,
}

fn optional<T>(part: &str, result: RspResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Failed to read {}: {}", part, e);
            None
        }
    }
}

impl<C: ApduChannel, H: HttpTransport> RspClient<C, H> {
    /// EID of the eUICC
    pub async fn get_eid(&self) -> RspResult<Eid> {
        let card = self.acquire().await?;
        let result = card.get_eid().await;
        card.release().await;
        result
    }

    /// Read EID, configured addresses, EUICCInfo2 and the RAT
    ///
    /// # Errors
    /// Only when the EID cannot be read.
    pub async fn chip_info(&self) -> RspResult<ChipInfo> {
        let card = self.acquire().await?;
        let eid = match card.get_eid().await {
            Ok(eid) => eid,
            Err(e) => {
                card.release().await;
                return Err(e);
            }
        };

        let info = ChipInfo {
            eid,
            configured_addresses: optional("configured addresses", card.get_configured_addresses().await),
            euicc_info2: optional("EUICCInfo2", card.get_euicc_info2().await),
            rules_authorisation_table: optional("rules authorisation table", card.get_rat().await),
        };
        card.release().await;

        log::debug!("Chip info read for EID {}", info.eid);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RspError;
    use crate::testing::*;
    use hex_literal::hex;
    use rsp_application::tags;
    use std::sync::Arc;

    const EID: [u8; 21] = hex!("BF3E 12 5A10 89049032123451234512345678901235");

    #[tokio::test]
    async fn test_get_eid() {
        let card = Arc::new(FakeEuicc::new());
        card.reply(tags::GET_EUICC_DATA, EID.to_vec());
        let client = fake_client(card, Arc::new(FakeServers::new()));

        let eid = client.get_eid().await.unwrap();
        assert_eq!(eid.to_string(), "89049032123451234512345678901235");
    }

    #[tokio::test]
    async fn test_chip_info_complete() {
        let card = Arc::new(FakeEuicc::new());
        card.reply(tags::GET_EUICC_DATA, EID.to_vec());
        card.reply(
            tags::GET_CONFIGURED_ADDRESSES,
            hex!("BF3C 0B 8007 736D64702E696F 8100").to_vec(),
        );
        card.reply(tags::GET_EUICC_INFO2, hex!("BF220E840C810105820301E24083020FA0").to_vec());
        card.reply(tags::GET_RAT, hex!("BF4300").to_vec());
        let client = fake_client(card, Arc::new(FakeServers::new()));

        let info = client.chip_info().await.unwrap();
        assert_eq!(info.eid.to_string(), "89049032123451234512345678901235");
        let addresses = info.configured_addresses.unwrap();
        assert_eq!(addresses.default_dp_address.as_deref(), Some("smdp.io"));
        assert_eq!(addresses.root_ds_address.as_deref(), Some(""));
        assert_eq!(info.euicc_info2.unwrap().ext_card_resource.free_non_volatile_memory, 123456);
        assert_eq!(info.rules_authorisation_table, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_chip_info_tolerates_missing_parts() {
        let card = Arc::new(FakeEuicc::new());
        card.reply(tags::GET_EUICC_DATA, EID.to_vec());
        card.fail(tags::GET_EUICC_INFO2, 0x6A88);
        let client = fake_client(card.clone(), Arc::new(FakeServers::new()));

        let info = client.chip_info().await.unwrap();
        assert!(info.configured_addresses.is_none());
        assert!(info.euicc_info2.is_none());
        assert!(info.rules_authorisation_table.is_none());
        assert_eq!(
            card.received_tags(),
            vec![tags::GET_EUICC_DATA, tags::GET_CONFIGURED_ADDRESSES, tags::GET_EUICC_INFO2, tags::GET_RAT]
        );
    }

    #[tokio::test]
    async fn test_chip_info_requires_eid() {
        let card = Arc::new(FakeEuicc::new());
        card.fail(tags::GET_EUICC_DATA, 0x6A82);
        let client = fake_client(card.clone(), Arc::new(FakeServers::new()));

        assert_eq!(client.chip_info().await, Err(RspError::Card { sw: 0x6A82 }));
        assert_eq!(card.received_tags(), vec![tags::GET_EUICC_DATA]);
    }
}
