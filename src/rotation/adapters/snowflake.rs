//! Snowflake users, rotated with `ALTER USER` over a session opened with the
//! record's administrative login.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::OnceCell;

use crate::credentials::AuthenticationRecord;
use crate::error::{Result, RotationError};
use crate::rotation::{
    single_match, CredentialUpdater, IdentityLocator, PasswordChange, RotationAdapter,
    TargetIdentity,
};
use crate::snowflake::{
    like_pattern, quote_identifier, quote_literal, resolved_identifier, SnowflakeConnector,
    SnowflakeSession,
};
use crate::transport::TransportConfig;

use super::{required, required_secret};

pub struct SnowflakeAdapter {
    connector: SnowflakeConnector,
    login: String,
    password: SecretString,
    session: OnceCell<SnowflakeSession>,
}

impl SnowflakeAdapter {
    pub fn new(connector: SnowflakeConnector, login: &str, password: SecretString) -> Self {
        Self {
            connector,
            login: login.to_string(),
            password,
            session: OnceCell::new(),
        }
    }

    pub fn from_record(record: &AuthenticationRecord, transport: &TransportConfig) -> Result<Self> {
        let account = required(record, "snowflake_account_name")?;
        let login = required(record, "login")?;
        let password = required_secret(record, "password")?;
        Ok(Self::new(
            SnowflakeConnector::new(account, transport)?,
            login,
            password,
        ))
    }

    async fn session(&self) -> Result<&SnowflakeSession> {
        self.session
            .get_or_try_init(|| self.connector.login(&self.login, &self.password))
            .await
    }
}

#[async_trait::async_trait]
impl IdentityLocator for SnowflakeAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        let wanted = resolved_identifier(search_key);
        let sql = format!("SHOW USERS LIKE {}", quote_literal(&like_pattern(&wanted)));
        let result = self.session().await?.execute(&sql).await?;

        let names = result.column("name").ok_or_else(|| {
            RotationError::Transport("SHOW USERS returned no name column".to_string())
        })?;
        let matches = names
            .into_iter()
            .flatten()
            .filter(|name| *name == wanted)
            .map(str::to_string)
            .collect();
        let name = single_match(matches, "user name", search_key)?;
        Ok(TargetIdentity::new(name, search_key))
    }
}

#[async_trait::async_trait]
impl CredentialUpdater for SnowflakeAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        let sql = format!(
            "ALTER USER {} SET PASSWORD = {}",
            quote_identifier(&identity.remote_id),
            quote_literal(change.new_password.expose_secret())
        );
        self.session().await?.execute(&sql).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RotationAdapter for SnowflakeAdapter {
    fn name(&self) -> &str {
        "snowflake"
    }

    async fn close(&self) -> Result<()> {
        match self.session.get() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }
}
