//! Rotation failure taxonomy.
//!
//! Every failure a rotation can end in maps to exactly one [`ErrorKind`].
//! Messages are built from usernames, field names, HTTP statuses and
//! truncated response bodies only. Secrets never reach a message.

use std::fmt;

/// Replacement for a secret found in a message.
pub const REDACTED: &str = "********";

/// Discriminant of a [`RotationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedInput,
    RecordNotFound,
    MissingField,
    IdentityNotFound,
    AmbiguousIdentity,
    AuthenticationError,
    TransportError,
    UpdateFailure,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::RecordNotFound => "record_not_found",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::IdentityNotFound => "identity_not_found",
            ErrorKind::AmbiguousIdentity => "ambiguous_identity",
            ErrorKind::AuthenticationError => "authentication_error",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::UpdateFailure => "update_failure",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("malformed rotation input: {0}")]
    MalformedInput(String),

    #[error("no record titled {title:?} found")]
    RecordNotFound { title: String },

    #[error("required fields missing or empty: {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("no {key} matching {value:?} found")]
    IdentityNotFound { key: &'static str, value: String },

    #[error("{count} identities share {key} {value:?}; refusing to pick one")]
    AmbiguousIdentity {
        key: &'static str,
        value: String,
        count: usize,
    },

    #[error("backend rejected the administrative credential: {0}")]
    Authentication(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("password update failed: {0}")]
    UpdateFailure(String),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl RotationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RotationError::MalformedInput(_) => ErrorKind::MalformedInput,
            RotationError::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            RotationError::MissingField(_) => ErrorKind::MissingField,
            RotationError::IdentityNotFound { .. } => ErrorKind::IdentityNotFound,
            RotationError::AmbiguousIdentity { .. } => ErrorKind::AmbiguousIdentity,
            RotationError::Authentication(_) => ErrorKind::AuthenticationError,
            RotationError::Transport(_) => ErrorKind::TransportError,
            RotationError::UpdateFailure(_) => ErrorKind::UpdateFailure,
            RotationError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Re-tag a failure raised while applying the new secret.
    ///
    /// Anything that goes wrong once the updater runs is an update failure,
    /// whatever layer it came from.
    pub fn into_update_failure(self) -> Self {
        match self {
            RotationError::UpdateFailure(_) => self,
            other => RotationError::UpdateFailure(other.to_string()),
        }
    }

    /// Scrub `secrets` from the message, in the raw form and in the escaped
    /// forms a backend echoes them in (JSON strings, SQL literals).
    pub fn redact(self, secrets: &[&str]) -> Self {
        let scrub = |message: String| redact_message(message, secrets);
        match self {
            RotationError::MalformedInput(m) => RotationError::MalformedInput(scrub(m)),
            RotationError::Authentication(m) => RotationError::Authentication(scrub(m)),
            RotationError::Transport(m) => RotationError::Transport(scrub(m)),
            RotationError::UpdateFailure(m) => RotationError::UpdateFailure(scrub(m)),
            RotationError::Unexpected(m) => RotationError::Unexpected(scrub(m)),
            other => other,
        }
    }
}

fn redact_message(mut message: String, secrets: &[&str]) -> String {
    for secret in secrets.iter().filter(|s| !s.is_empty()) {
        let json = serde_json::to_string(secret).unwrap_or_default();
        let json = json
            .strip_prefix('"')
            .and_then(|j| j.strip_suffix('"'))
            .unwrap_or_default();
        let sql = crate::snowflake::escape_literal(secret);

        // Escaped forms first; they can contain a prefix of the raw form.
        for form in [json, sql.as_str(), *secret] {
            if !form.is_empty() {
                message = message.replace(form, REDACTED);
            }
        }
    }
    message
}

pub type Result<T, E = RotationError> = std::result::Result<T, E>;
