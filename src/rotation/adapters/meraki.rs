//! Cisco Meraki dashboard users, matched by email within one network.

use reqwest::header::HeaderValue;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::credentials::AuthenticationRecord;
use crate::error::Result;
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::transport::{
    deserialize_remote_id, expect_success, read_json, send_failed, sensitive_header,
    TransportConfig,
};

use super::{required, required_secret};

pub const MERAKI_API_BASE: &str = "https://api.meraki.com/api/v1";

#[derive(Debug, Deserialize)]
struct MerakiAuthUser {
    #[serde(deserialize_with = "deserialize_remote_id")]
    id: String,
    #[serde(default)]
    email: Option<String>,
}

pub struct MerakiAdapter {
    client: Client,
    base_url: String,
    network_id: String,
    api_key: HeaderValue,
}

impl MerakiAdapter {
    pub fn new(network_id: &str, api_key: &SecretString, transport: &TransportConfig) -> Result<Self> {
        Ok(Self {
            client: transport.client()?,
            base_url: transport.base_url_or(MERAKI_API_BASE),
            network_id: network_id.to_string(),
            api_key: sensitive_header(api_key.expose_secret())?,
        })
    }

    /// The record's `password` field carries the dashboard API key.
    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        Self::new(
            required(record, "network_id")?,
            &required_secret(record, "password")?,
            transport,
        )
    }

    fn users_url(&self) -> String {
        format!(
            "{}/networks/{}/merakiAuthUsers",
            self.base_url,
            urlencoding::encode(&self.network_id)
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Cisco-Meraki-API-Key", self.api_key.clone())
            .header("Accept", "application/json")
    }
}

#[async_trait::async_trait]
impl IdentityLocator for MerakiAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        let action = "list Meraki auth users";
        let response = self
            .request(reqwest::Method::GET, self.users_url())
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let users: Option<Vec<MerakiAuthUser>> = read_json(response, action).await?;

        let matches = users
            .unwrap_or_default()
            .into_iter()
            .filter(|u| u.email.as_deref() == Some(search_key))
            .collect();
        let user = single_match(matches, "email", search_key)?;
        Ok(TargetIdentity::new(user.id, search_key))
    }
}

#[async_trait::async_trait]
impl CredentialUpdater for MerakiAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        let action = "update Meraki auth user";
        let url = format!(
            "{}/{}",
            self.users_url(),
            urlencoding::encode(&identity.remote_id)
        );
        let body = serde_json::json!({ "password": change.new_password.expose_secret() });

        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        expect_success(response, action).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RotationAdapter for MerakiAdapter {
    fn name(&self) -> &str {
        "meraki"
    }
}
