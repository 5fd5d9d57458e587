//! Tenable Vulnerability Management (Tenable.io) client.

use reqwest::header::HeaderValue;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::{
    deserialize_remote_id, expect_success, read_json, send_failed, sensitive_header,
    TransportConfig,
};

use super::TenableKeys;

pub const TENABLE_IO_API_BASE: &str = "https://cloud.tenable.com";

const CREDENTIALS_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct IoUser {
    #[serde(deserialize_with = "deserialize_remote_id")]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IoCredential {
    pub uuid: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<IoUser>,
}

#[derive(Debug, Deserialize)]
struct CredentialsPage {
    #[serde(default)]
    credentials: Vec<IoCredential>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total: usize,
}

pub struct TenableIoClient {
    client: Client,
    base_url: String,
    api_keys: HeaderValue,
}

impl TenableIoClient {
    pub fn new(keys: &TenableKeys, transport: &TransportConfig) -> Result<Self> {
        Ok(Self {
            client: transport.client()?,
            base_url: transport.base_url_or(TENABLE_IO_API_BASE),
            api_keys: sensitive_header(&keys.io_header())?,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-ApiKeys", self.api_keys.clone())
            .header("Accept", "application/json")
    }

    pub async fn list_users(&self) -> Result<Vec<IoUser>> {
        let action = "list Tenable.io users";
        let response = self
            .request(reqwest::Method::GET, "/users")
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let users: UsersResponse = read_json(response, action).await?;
        Ok(users.users)
    }

    /// Self-service password change; Tenable.io checks `old_password`.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct ChangePassword<'a> {
            password: &'a str,
            current_password: &'a str,
        }

        let action = "change Tenable.io user password";
        let path = format!("/users/{}/chpasswd", urlencoding::encode(user_id));
        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(&ChangePassword {
                password: new_password.expose_secret(),
                current_password: old_password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        expect_success(response, action).await?;
        Ok(())
    }

    /// All managed credentials whose name equals `name`, across every page.
    pub async fn list_credentials_named(&self, name: &str) -> Result<Vec<IoCredential>> {
        let action = "list Tenable.io credentials";
        let filter = format!("name:eq:{name}");
        let limit = CREDENTIALS_PAGE_SIZE.to_string();
        let mut credentials = Vec::new();
        let mut offset = 0;

        loop {
            let page_offset = offset.to_string();
            let response = self
                .request(reqwest::Method::GET, "/credentials")
                .query(&[
                    ("f", filter.as_str()),
                    ("limit", limit.as_str()),
                    ("offset", page_offset.as_str()),
                ])
                .send()
                .await
                .map_err(|e| send_failed(action, e))?;
            let response = expect_success(response, action).await?;
            let page: CredentialsPage = read_json(response, action).await?;

            let received = page.credentials.len();
            credentials.extend(page.credentials);
            offset += received;

            let total = page.pagination.map(|p| p.total).unwrap_or(offset);
            if received == 0 || offset >= total {
                break;
            }
        }

        Ok(credentials)
    }

    /// Set `settings.password` on a managed credential.
    pub async fn edit_credential_password(
        &self,
        uuid: &str,
        new_password: &SecretString,
    ) -> Result<()> {
        let action = "edit Tenable.io credential";
        let path = format!("/credentials/{}", urlencoding::encode(uuid));
        let body = serde_json::json!({
            "settings": { "password": new_password.expose_secret() }
        });

        let response = self
            .request(reqwest::Method::PUT, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        expect_success(response, action).await?;
        Ok(())
    }
}
