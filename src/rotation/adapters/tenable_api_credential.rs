//! Tenable managed credentials over the raw REST API.
//!
//! The credential write endpoint only accepts whole documents. The update
//! fetches the current document, drops the read-only `type` field, sets
//! `settings.password` and writes the result back.

use reqwest::header::HeaderValue;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;

use crate::credentials::AuthenticationRecord;
use crate::error::{Result, RotationError};
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::tenable::TenableKeys;
use crate::transport::{expect_success, read_json, send_failed, sensitive_header, TransportConfig};

use super::required;

/// Fields the write endpoint rejects.
const READ_ONLY_FIELDS: &[&str] = &["type"];

#[derive(Debug, Deserialize)]
struct CredentialList {
    #[serde(default)]
    credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Deserialize)]
struct CredentialSummary {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub struct TenableApiCredentialAdapter {
    client: Client,
    /// Credentials collection URL, e.g. `https://cloud.tenable.com/credentials`.
    service_url: String,
    api_keys: HeaderValue,
}

impl TenableApiCredentialAdapter {
    pub fn new(service_url: &str, keys: &TenableKeys, transport: &TransportConfig) -> Result<Self> {
        Ok(Self {
            client: transport.client()?,
            service_url: transport.base_url_or(service_url),
            api_keys: sensitive_header(&keys.io_header())?,
        })
    }

    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        let service_url = required(record, "url")?;
        let keys = TenableKeys::from_record(record)?;
        Self::new(service_url, &keys, transport)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-ApiKeys", self.api_keys.clone())
            .header("Accept", "application/json")
    }

    fn credential_url(&self, uuid: &str) -> String {
        format!("{}/{}", self.service_url, urlencoding::encode(uuid))
    }

    async fn fetch_document(&self, uuid: &str) -> Result<Value> {
        let action = "fetch credential details";
        let response = self
            .request(reqwest::Method::GET, self.credential_url(uuid))
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        read_json(response, action).await
    }
}

/// Build the write payload from a fetched credential document.
pub(crate) fn with_new_password(mut document: Value, new_password: &str) -> Result<Value> {
    let fields = document.as_object_mut().ok_or_else(|| {
        RotationError::UpdateFailure("credential details are not a JSON object".to_string())
    })?;

    for field in READ_ONLY_FIELDS {
        fields.remove(*field);
    }

    let settings = fields
        .get_mut("settings")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            RotationError::UpdateFailure(
                "credential details have no settings object; nothing to update".to_string(),
            )
        })?;
    settings.insert("password".to_string(), Value::String(new_password.to_string()));

    Ok(document)
}

#[async_trait::async_trait]
impl IdentityLocator for TenableApiCredentialAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        let action = "list credentials by name";
        let filter = format!("name:eq:{search_key}");
        let response = self
            .request(reqwest::Method::GET, self.service_url.clone())
            .query(&[("f", filter.as_str())])
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let list: CredentialList = read_json(response, action).await?;

        let matches = list
            .credentials
            .into_iter()
            .filter(|c| c.name.as_deref() == Some(search_key))
            .collect();
        let credential = single_match(matches, "credential name", search_key)?;
        let uuid = credential.uuid.filter(|u| !u.is_empty()).ok_or_else(|| {
            RotationError::Transport(format!("{action}: matching credential has no uuid"))
        })?;

        Ok(TargetIdentity::new(uuid, search_key))
    }
}

#[async_trait::async_trait]
impl CredentialUpdater for TenableApiCredentialAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        let current = self.fetch_document(&identity.remote_id).await?;
        let document = with_new_password(current, change.new_password.expose_secret())?;

        let action = "write credential";
        let response = self
            .request(reqwest::Method::PUT, self.credential_url(&identity.remote_id))
            .json(&document)
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        expect_success(response, action).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RotationAdapter for TenableApiCredentialAdapter {
    fn name(&self) -> &str {
        "tenable-api-credential"
    }
}
