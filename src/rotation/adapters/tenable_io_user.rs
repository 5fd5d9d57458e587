//! Tenable.io users. Password changes are self-service and need the
//! current password.

use crate::credentials::AuthenticationRecord;
use crate::error::Result;
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::tenable::{TenableIoClient, TenableKeys};
use crate::transport::TransportConfig;

pub struct TenableIoUserAdapter {
    client: TenableIoClient,
}

impl TenableIoUserAdapter {
    pub fn new(client: TenableIoClient) -> Self {
        Self { client }
    }

    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        let keys = TenableKeys::from_record(record)?;
        Ok(Self::new(TenableIoClient::new(&keys, transport)?))
    }
}

#[async_trait::async_trait]
impl IdentityLocator for TenableIoUserAdapter {
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
impl CredentialUpdater for TenableIoUserAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        self.client
            .change_password(&identity.remote_id, change.require_old()?, &change.new_password)
            .await
    }
}

#[async_trait::async_trait]
impl RotationAdapter for TenableIoUserAdapter {
    fn name(&self) -> &str {
        "tenable-io-user"
    }
}
