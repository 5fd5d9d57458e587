//! Snowflake session client.
//!
//! Speaks the session protocol the Snowflake connectors use: a
//! username/password login returns a session token, statements are posted
//! with that token, and the session is deleted on close.

use reqwest::header::HeaderValue;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, RotationError};
use crate::transport::{expect_success, read_json, send_failed, sensitive_header, TransportConfig};

const CLIENT_APP_ID: &str = "credrotate";

/// Body shared by every session endpoint.
#[derive(Debug, Deserialize)]
struct SnowflakeResponse<T> {
    data: Option<T>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    success: bool,
}

impl<T> SnowflakeResponse<T> {
    fn failure_detail(&self) -> String {
        let message = self.message.as_deref().unwrap_or("no message").trim();
        match &self.code {
            Some(code) => format!("{message} (code {code})"),
            None => message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<ColumnType>,
    #[serde(default)]
    rowset: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ColumnType {
    name: String,
}

/// Rows of a finished statement, every cell rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Values of one column, matched ignoring case.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).and_then(|v| v.as_deref()))
                .collect(),
        )
    }
}

/// Connection parameters for one Snowflake account.
pub struct SnowflakeConnector {
    client: Client,
    base_url: String,
    account: String,
}

impl SnowflakeConnector {
    pub fn new(account: &str, transport: &TransportConfig) -> Result<Self> {
        let default_base = format!("https://{account}.snowflakecomputing.com");
        Ok(Self {
            client: transport.client()?,
            base_url: transport.base_url_or(&default_base),
            account: account.to_string(),
        })
    }

    /// Authenticate and open a session.
    pub async fn login(&self, login: &str, password: &SecretString) -> Result<SnowflakeSession> {
        #[derive(Serialize)]
        struct LoginRequest<'a> {
            data: LoginFields<'a>,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        struct LoginFields<'a> {
            client_app_id: &'a str,
            client_app_version: &'a str,
            account_name: &'a str,
            login_name: &'a str,
            password: &'a str,
        }

        let action = "log in to Snowflake";
        let body = LoginRequest {
            data: LoginFields {
                client_app_id: CLIENT_APP_ID,
                client_app_version: env!("CARGO_PKG_VERSION"),
                account_name: &self.account,
                login_name: login,
                password: password.expose_secret(),
            },
        };

        let response = self
            .client
            .post(format!("{}/session/v1/login-request", self.base_url))
            .query(&[("request_id", Uuid::new_v4().to_string())])
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let login: SnowflakeResponse<LoginData> = read_json(response, action).await?;

        if !login.success {
            return Err(RotationError::Authentication(format!(
                "{action}: {}",
                login.failure_detail()
            )));
        }
        let token = login.data.map(|d| d.token).ok_or_else(|| {
            RotationError::Transport(format!("{action}: login response carried no session token"))
        })?;

        Ok(SnowflakeSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            authorization: sensitive_header(&format!("Snowflake Token=\"{token}\""))?,
        })
    }
}

/// An authenticated session. Close it with [`close`](Self::close).
pub struct SnowflakeSession {
    client: Client,
    base_url: String,
    authorization: HeaderValue,
}

impl SnowflakeSession {
    /// Run one statement synchronously and return its rows.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct QueryRequest<'a> {
            sql_text: &'a str,
            async_exec: bool,
            sequence_id: u64,
        }

        let action = "run Snowflake statement";
        let response = self
            .client
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header("Authorization", self.authorization.clone())
            .header("Accept", "application/json")
            .json(&QueryRequest {
                sql_text: sql,
                async_exec: false,
                sequence_id: 1,
            })
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        let response = expect_success(response, action).await?;
        let result: SnowflakeResponse<QueryData> = read_json(response, action).await?;

        if !result.success {
            return Err(RotationError::Transport(format!(
                "{action}: {}",
                result.failure_detail()
            )));
        }

        let data = result.data.unwrap_or(QueryData {
            rowtype: Vec::new(),
            rowset: Vec::new(),
        });
        Ok(QueryResult {
            columns: data.rowtype.into_iter().map(|c| c.name).collect(),
            rows: data
                .rowset
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        })
    }

    /// Delete the session on the server.
    pub async fn close(&self) -> Result<()> {
        let action = "close Snowflake session";
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .query(&[("delete", "true")])
            .header("Authorization", self.authorization.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| send_failed(action, e))?;
        expect_success(response, action).await?;
        Ok(())
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Double-quoted identifier, exact case.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted string literal. Snowflake treats backslash as an escape.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Body of a string literal, without the surrounding quotes.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// `LIKE` pattern matching `name`. Backslash is the pattern escape, so it is
/// doubled; `_` and `%` stay wildcards and callers filter exact matches.
pub fn like_pattern(name: &str) -> String {
    name.replace('\\', "\\\\")
}

/// The stored name Snowflake resolves `name` to when used as an identifier.
///
/// Unquoted identifiers (`[A-Za-z_][A-Za-z0-9_$]*`) are stored uppercase;
/// anything else only resolves when quoted, so it is kept verbatim.
pub fn resolved_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let unquoted = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if unquoted {
        name.to_ascii_uppercase()
    } else {
        name.to_string()
    }
}
