//! Cisco IOS-XE local users over RESTCONF.
//!
//! Users live under the native model's `username` list. The password is
//! set by PATCHing the native container with a one-entry username list.

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::credentials::AuthenticationRecord;
use crate::error::Result;
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::transport::{expect_success, read_json, send_failed, TransportConfig};

use super::{required, required_secret};

const YANG_JSON: &str = "application/yang-data+json";

#[derive(Debug, Deserialize)]
struct UsernameList {
    #[serde(rename = "Cisco-IOS-XE-native:username", default)]
    usernames: Vec<DeviceUser>,
}

#[derive(Debug, Deserialize)]
struct DeviceUser {
    name: String,
}

pub struct CiscoIosXeAdapter {
    client: Client,
    /// `.../restconf/data/Cisco-IOS-XE-native:native`, no trailing slash.
    native_url: String,
    login: String,
    password: SecretString,
}

impl CiscoIosXeAdapter {
    pub fn new(
        host_endpoint: &str,
        login: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self> {
        let default_base = format!(
            "https://{}/restconf/data/Cisco-IOS-XE-native:native",
            host_endpoint.trim_end_matches('/')
        );
        Ok(Self {
            client: transport.client()?,
            native_url: transport.base_url_or(&default_base),
            login: login.into(),
            password,
        })
    }

    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        Self::new(
            required(record, "host_endpoint")?,
            required(record, "login")?,
            required_secret(record, "password")?,
            transport,
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.login, Some(self.password.expose_secret()))
            .header("Accept", YANG_JSON)
            .header("Content-Type", YANG_JSON)
    }

    async fn list_usernames(&self) -> Result<Vec<DeviceUser>> {
        let action = "list device usernames";
        let response = self
            .request(reqwest::Method::GET, format!("{}/username/", self.native_url))
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;

        // RESTCONF answers an empty or absent list with 204/404.
        if matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
            return Ok(Vec::new());
        }

        let response = expect_success(response, action).await?;
        let list: UsernameList = read_json(response, action).await?;
        Ok(list.usernames)
    }
}

#[async_trait::async_trait]
impl IdentityLocator for CiscoIosXeAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        let matches = self
            .list_usernames()
            .await?
            .into_iter()
            .filter(|u| u.name == search_key)
            .collect();
        let user = single_match(matches, "username", search_key)?;
        Ok(TargetIdentity::new(user.name.clone(), user.name))
    }
}

#[async_trait::async_trait]
impl CredentialUpdater for CiscoIosXeAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        let action = "set device user password";
        let body = serde_json::json!({
            "Cisco-IOS-XE-native:native": {
                "username": [
                    {
                        "name": identity.remote_id,
                        "password": { "password": change.new_password.expose_secret() }
                    }
                ]
            }
        });

        let response = self
            .request(reqwest::Method::PATCH, format!("{}/", self.native_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        expect_success(response, action).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RotationAdapter for CiscoIosXeAdapter {
    fn name(&self) -> &str {
        "cisco-ios-xe"
    }
}
