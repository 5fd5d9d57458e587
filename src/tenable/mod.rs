//! Typed clients for Tenable Vulnerability Management (Tenable.io) and
//! Tenable Security Center.
//!
//! Both authenticate with an access/secret key pair; only the header
//! name and layout differ.

pub mod io;
pub mod sc;

pub use io::{IoCredential, IoUser, TenableIoClient};
pub use sc::{ScUser, TenableScClient};

use secrecy::{ExposeSecret, SecretString};

use crate::credentials::AuthenticationRecord;
use crate::error::{Result, RotationError};

/// An API key pair read from a Tenable authentication record.
#[derive(Debug)]
pub struct TenableKeys {
    access_key: SecretString,
    secret_key: SecretString,
}

impl TenableKeys {
    pub fn new(access_key: SecretString, secret_key: SecretString) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }

    pub fn from_record(record: &AuthenticationRecord) -> Result<Self> {
        let access_key = record.secret("tenable_access_key");
        let secret_key = record.secret("tenable_secret_key");

        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(Self::new(access_key, secret_key)),
            (access_key, secret_key) => Err(RotationError::MissingField(
                [
                    access_key.is_none().then_some("tenable_access_key"),
                    secret_key.is_none().then_some("tenable_secret_key"),
                ]
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect(),
            )),
        }
    }

    /// `X-ApiKeys` value for Tenable.io.
    pub(crate) fn io_header(&self) -> String {
        format!(
            "accessKey={};secretKey={}",
            self.access_key.expose_secret(),
            self.secret_key.expose_secret()
        )
    }

    /// `x-apikey` value for Tenable.sc.
    pub(crate) fn sc_header(&self) -> String {
        format!(
            "accesskey={}; secretkey={};",
            self.access_key.expose_secret(),
            self.secret_key.expose_secret()
        )
    }
}
