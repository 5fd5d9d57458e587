//! Rotation envelope decoding.
//!
//! The envelope is one line of base64 wrapping a JSON object:
//!
//! ```json
//! { "records": "<base64 of a JSON array of records>",
//!   "user": "alice",
//!   "newPassword": "...",
//!   "oldPassword": "..." }
//! ```
//!
//! `records` is decoded a second time into [`AuthenticationRecord`]s. Keys
//! other than the four above are kept in [`RotationRequest::backend_fields`].

use std::collections::BTreeMap;
use std::io::BufRead;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::AuthenticationRecord;
use crate::error::{Result, RotationError};

/// Standard alphabet, padding optional on decode.
const ENVELOPE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A decoded rotation request.
///
/// `user` and `newPassword` may be absent here; presence is checked when
/// the orchestrator validates fields so the diagnostic can name them.
#[derive(Debug)]
pub struct RotationRequest {
    pub records: Vec<AuthenticationRecord>,
    pub user: Option<String>,
    pub new_password: Option<SecretString>,
    pub old_password: Option<SecretString>,
    pub backend_fields: BTreeMap<String, Value>,
}

#[derive(Deserialize, Serialize)]
struct Envelope {
    records: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(rename = "newPassword", default, skip_serializing_if = "Option::is_none")]
    new_password: Option<String>,
    #[serde(rename = "oldPassword", default, skip_serializing_if = "Option::is_none")]
    old_password: Option<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl RotationRequest {
    pub fn new(
        records: Vec<AuthenticationRecord>,
        user: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Self {
        Self {
            records,
            user: Some(user.into()),
            new_password: Some(SecretString::from(new_password.into())),
            old_password: None,
            backend_fields: BTreeMap::new(),
        }
    }

    pub fn with_old_password(mut self, old_password: impl Into<String>) -> Self {
        self.old_password = Some(SecretString::from(old_password.into()));
        self
    }

    /// Every secret the request carries: new and old password plus the
    /// secret fields of all records.
    pub fn secrets(&self) -> Vec<&str> {
        [&self.new_password, &self.old_password]
            .into_iter()
            .flatten()
            .map(|s| s.expose_secret())
            .chain(self.records.iter().flat_map(AuthenticationRecord::secret_values))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Decode one envelope line.
    pub fn decode(line: &str) -> Result<Self> {
        let envelope: Envelope = decode_json(line.trim(), "envelope")?;
        let records: Vec<AuthenticationRecord> = decode_json(envelope.records.trim(), "records")?;

        Ok(Self {
            records,
            user: envelope.user,
            new_password: envelope.new_password.map(SecretString::from),
            old_password: envelope.old_password.map(SecretString::from),
            backend_fields: envelope.rest,
        })
    }

    /// Encode back into the single-line wire form accepted by [`decode`](Self::decode).
    pub fn encode(&self) -> Result<String> {
        let records = serde_json::to_vec(&self.records)
            .map_err(|e| RotationError::Unexpected(format!("failed to encode records: {e}")))?;

        let envelope = Envelope {
            records: ENVELOPE_ENGINE.encode(records),
            user: self.user.clone(),
            new_password: self
                .new_password
                .as_ref()
                .map(|s| s.expose_secret().to_string()),
            old_password: self
                .old_password
                .as_ref()
                .map(|s| s.expose_secret().to_string()),
            rest: self.backend_fields.clone(),
        };
        let json = serde_json::to_vec(&envelope)
            .map_err(|e| RotationError::Unexpected(format!("failed to encode envelope: {e}")))?;

        Ok(ENVELOPE_ENGINE.encode(json))
    }
}

/// Read exactly one line from `reader`. Anything after it is left unread.
pub fn read_envelope_line<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| RotationError::MalformedInput(format!("failed to read input: {e}")))?;

    if read == 0 || line.trim().is_empty() {
        return Err(RotationError::MalformedInput(
            "no rotation envelope on input".to_string(),
        ));
    }

    Ok(line)
}

fn decode_json<T: for<'de> Deserialize<'de>>(encoded: &str, what: &str) -> Result<T> {
    let bytes = ENVELOPE_ENGINE
        .decode(encoded)
        .map_err(|e| RotationError::MalformedInput(format!("{what} is not valid base64: {e}")))?;

    // serde_json messages can quote values; report position only.
    serde_json::from_slice(&bytes).map_err(|e| {
        RotationError::MalformedInput(format!(
            "{what} is not a valid rotation document ({:?} error at line {}, column {})",
            e.classify(),
            e.line(),
            e.column()
        ))
    })
}
