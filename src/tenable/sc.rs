//! Tenable Security Center REST client.
//!
//! Every SC response is wrapped in an envelope whose `error_code` is
//! non-zero when the request was refused, even with an HTTP 200.

use reqwest::header::HeaderValue;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RotationError};
use crate::transport::{
    deserialize_remote_id, expect_success, read_json, send_failed, sensitive_header,
    TransportConfig,
};

use super::TenableKeys;

#[derive(Debug, Clone, Deserialize)]
pub struct ScUser {
    #[serde(deserialize_with = "deserialize_remote_id")]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct ScEnvelope<T> {
    response: Option<T>,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

impl<T> ScEnvelope<T> {
    fn into_response(self, action: &str) -> Result<Option<T>> {
        if self.error_code != 0 {
            return Err(RotationError::Transport(format!(
                "{action}: Tenable.sc error {}: {}",
                self.error_code,
                self.error_msg.trim()
            )));
        }
        Ok(self.response)
    }
}

pub struct TenableScClient {
    client: Client,
    base_url: String,
    api_key: HeaderValue,
}

impl TenableScClient {
    /// `host` is the SC hostname; the REST root is `https://{host}/rest`.
    pub fn new(host: &str, keys: &TenableKeys, transport: &TransportConfig) -> Result<Self> {
        let default_base = format!("https://{}/rest", host.trim_end_matches('/'));
        Ok(Self {
            client: transport.client()?,
            base_url: transport.base_url_or(&default_base),
            api_key: sensitive_header(&keys.sc_header())?,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-apikey", self.api_key.clone())
            .header("Accept", "application/json")
    }

    pub async fn list_users(&self) -> Result<Vec<ScUser>> {
        let action = "list Tenable.sc users";
        let response = self
            .request(reqwest::Method::GET, "/user")
            .query(&[("fields", "id,username")])
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let envelope: ScEnvelope<Vec<ScUser>> = read_json(response, action).await?;
        Ok(envelope.into_response(action)?.unwrap_or_default())
    }

    /// Edit a user's password. SC requires the current password alongside it.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct EditUser<'a> {
            current_password: &'a str,
            password: &'a str,
        }

        let action = "edit Tenable.sc user";
        let path = format!("/user/{}", urlencoding::encode(user_id));
        let response = self
            .request(reqwest::Method::PATCH, &path)
            .json(&EditUser {
                current_password: current_password.expose_secret(),
                password: new_password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let envelope: ScEnvelope<serde_json::Value> = read_json(response, action).await?;
        envelope.into_response(action)?;
        Ok(())
    }
}
