//! Tenable.io managed credentials, addressed by name.
//!
//! The remote `name:eq:` filter should return at most one credential; the
//! result is still checked by exact name and count.

use crate::credentials::AuthenticationRecord;
use crate::error::Result;
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::tenable::{TenableIoClient, TenableKeys};
use crate::transport::TransportConfig;

pub struct TenableIoCredentialAdapter {
    client: TenableIoClient,
}

impl TenableIoCredentialAdapter {
    pub fn new(client: TenableIoClient) -> Self {
        Self { client }
    }

    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        let keys = TenableKeys::from_record(record)?;
        Ok(Self::new(TenableIoClient::new(&keys, transport)?))
    }
}

#[async_trait::async_trait]
impl IdentityLocator for TenableIoCredentialAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        let matches = self
            .client
            .list_credentials_named(search_key)
            .await?
            .into_iter()
            .filter(|c| c.name == search_key)
            .collect();
        let credential = single_match(matches, "credential name", search_key)?;
        Ok(TargetIdentity::new(credential.uuid, credential.name))
    }
}

#[async_trait::async_trait]
impl CredentialUpdater for TenableIoCredentialAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        self.client
            .edit_credential_password(&identity.remote_id, &change.new_password)
            .await
    }
}

#[async_trait::async_trait]
impl RotationAdapter for TenableIoCredentialAdapter {
    fn name(&self) -> &str {
        "tenable-io-credential"
    }
}
