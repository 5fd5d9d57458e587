use std::fmt;
use std::str::FromStr;

use super::PasswordMode;

pub const CISCO_RECORD_TITLE: &str = "Cisco Authentication Record";
pub const TENABLE_RECORD_TITLE: &str = "Tenable Authentication Record";
pub const SNOWFLAKE_RECORD_TITLE: &str = "Snowflake Authentication Record";

/// What the orchestrator needs to know about a backend before talking to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub name: &'static str,
    /// Title of the authentication record to select, compared ignoring case.
    pub record_title: &'static str,
    /// Record fields that must be present and non-empty.
    pub record_fields: &'static [&'static str],
    /// What the `user` search key is matched against.
    pub identity_key: &'static str,
    pub password_mode: PasswordMode,
}

/// The closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    CiscoIosXe,
    Meraki,
    TenableIoUser,
    TenableIoCredential,
    TenableScUser,
    TenableApiCredential,
    Snowflake,
}

impl Backend {
    pub const ALL: [Backend; 7] = [
        Backend::CiscoIosXe,
        Backend::Meraki,
        Backend::TenableIoUser,
        Backend::TenableIoCredential,
        Backend::TenableScUser,
        Backend::TenableApiCredential,
        Backend::Snowflake,
    ];

    pub fn profile(&self) -> &'static BackendProfile {
        match self {
            Backend::CiscoIosXe => &CISCO_IOS_XE,
            Backend::Meraki => &MERAKI,
            Backend::TenableIoUser => &TENABLE_IO_USER,
            Backend::TenableIoCredential => &TENABLE_IO_CREDENTIAL,
            Backend::TenableScUser => &TENABLE_SC_USER,
            Backend::TenableApiCredential => &TENABLE_API_CREDENTIAL,
            Backend::Snowflake => &SNOWFLAKE,
        }
    }

    pub fn name(&self) -> &'static str {
        self.profile().name
    }

    /// Device certificates are self-signed as a rule; everything else verifies.
    pub fn accepts_invalid_certs_by_default(&self) -> bool {
        matches!(self, Backend::CiscoIosXe)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown backend {0:?}")]
pub struct UnknownBackend(String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownBackend(s.to_string()))
    }
}

static CISCO_IOS_XE: BackendProfile = BackendProfile {
    name: "cisco-ios-xe",
    record_title: CISCO_RECORD_TITLE,
    record_fields: &["host_endpoint", "login", "password"],
    identity_key: "username",
    password_mode: PasswordMode::AdminOverwrite,
};

static MERAKI: BackendProfile = BackendProfile {
    name: "meraki",
    record_title: CISCO_RECORD_TITLE,
    record_fields: &["network_id", "password"],
    identity_key: "email",
    password_mode: PasswordMode::AdminOverwrite,
};

static TENABLE_IO_USER: BackendProfile = BackendProfile {
    name: "tenable-io-user",
    record_title: TENABLE_RECORD_TITLE,
    record_fields: &["tenable_access_key", "tenable_secret_key"],
    identity_key: "username",
    password_mode: PasswordMode::RequiresCurrent,
};

static TENABLE_IO_CREDENTIAL: BackendProfile = BackendProfile {
    name: "tenable-io-credential",
    record_title: TENABLE_RECORD_TITLE,
    record_fields: &["tenable_access_key", "tenable_secret_key"],
    identity_key: "credential name",
    password_mode: PasswordMode::AdminOverwrite,
};

static TENABLE_SC_USER: BackendProfile = BackendProfile {
    name: "tenable-sc-user",
    record_title: TENABLE_RECORD_TITLE,
    record_fields: &["tenable_sc_host", "tenable_access_key", "tenable_secret_key"],
    identity_key: "username",
    password_mode: PasswordMode::RequiresCurrent,
};

static TENABLE_API_CREDENTIAL: BackendProfile = BackendProfile {
    name: "tenable-api-credential",
    record_title: TENABLE_RECORD_TITLE,
    record_fields: &["url", "tenable_access_key", "tenable_secret_key"],
    identity_key: "credential name",
    password_mode: PasswordMode::AdminOverwrite,
};

static SNOWFLAKE: BackendProfile = BackendProfile {
    name: "snowflake",
    record_title: SNOWFLAKE_RECORD_TITLE,
    record_fields: &["snowflake_account_name", "login", "password"],
    identity_key: "user name",
    password_mode: PasswordMode::AdminOverwrite,
};
