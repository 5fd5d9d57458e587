//! Backend adapters.

mod cisco_ios_xe;
mod meraki;
mod snowflake;
mod tenable_api_credential;
mod tenable_io_credential;
mod tenable_io_user;
mod tenable_sc_user;

pub use cisco_ios_xe::CiscoIosXeAdapter;
pub use meraki::MerakiAdapter;
pub use snowflake::SnowflakeAdapter;
pub use tenable_api_credential::TenableApiCredentialAdapter;
pub use tenable_io_credential::TenableIoCredentialAdapter;
pub use tenable_io_user::TenableIoUserAdapter;
pub use tenable_sc_user::TenableScUserAdapter;

use secrecy::SecretString;

use crate::credentials::AuthenticationRecord;
use crate::error::{Result, RotationError};

fn required<'a>(record: &'a AuthenticationRecord, key: &str) -> Result<&'a str> {
    record
        .non_empty(key)
        .ok_or_else(|| RotationError::MissingField(vec![key.to_string()]))
}

fn required_secret(record: &AuthenticationRecord, key: &str) -> Result<SecretString> {
    required(record, key).map(|v| SecretString::from(v.to_string()))
}
