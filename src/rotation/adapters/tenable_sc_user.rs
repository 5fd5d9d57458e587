//! Tenable Security Center users.

use crate::credentials::AuthenticationRecord;
use crate::error::Result;
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::tenable::{TenableKeys, TenableScClient};
use crate::transport::TransportConfig;

use super::required;

pub struct TenableScUserAdapter {
    client: TenableScClient,
}

impl TenableScUserAdapter {
    pub fn new(client: TenableScClient) -> Self {
        Self { client }
    }

    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        let host = required(record, "tenable_sc_host")?;
        let keys = TenableKeys::from_record(record)?;
        Ok(Self::new(TenableScClient::new(host, &keys, transport)?))
    }
}

#[async_trait::async_trait]
impl IdentityLocator for TenableScUserAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        let matches = self
            .client
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.username == search_key)
            .collect();
        let user = single_match(matches, "username", search_key)?;
        Ok(TargetIdentity::new(user.id, user.username))
    }
}

#[async_trait::async_trait]
impl CredentialUpdater for TenableScUserAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        self.client
            .change_password(&identity.remote_id, change.require_old()?, &change.new_password)
            .await
    }
}

#[async_trait::async_trait]
impl RotationAdapter for TenableScUserAdapter {
    fn name(&self) -> &str {
        "tenable-sc-user"
    }
}
