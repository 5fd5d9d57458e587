use std::collections::BTreeMap;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record fields whose values are secrets.
const SECRET_FIELDS: &[&str] = &["password", "tenable_access_key", "tenable_secret_key"];

/// A titled bundle of administrative credential fields.
///
/// Only string-valued fields are readable through [`field`](Self::field);
/// other JSON values are kept so the record re-encodes unchanged.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationRecord {
    pub title: String,

    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl AuthenticationRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), Value::String(value.into()));
        self
    }

    /// String value of a field, `None` when absent or not a string.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Non-empty string value of a field.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.field(key).filter(|v| !v.is_empty())
    }

    /// Field value wrapped as a secret.
    pub fn secret(&self, key: &str) -> Option<SecretString> {
        self.non_empty(key).map(|v| SecretString::from(v.to_string()))
    }

    /// Values of the fields that hold administrative secrets.
    pub fn secret_values(&self) -> impl Iterator<Item = &str> {
        SECRET_FIELDS.iter().filter_map(|key| self.non_empty(key))
    }

    /// Case-insensitive title comparison.
    pub fn title_matches(&self, expected: &str) -> bool {
        self.title.to_lowercase() == expected.to_lowercase()
    }
}

// Field values are credentials; only the keys are printable.
impl fmt::Debug for AuthenticationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationRecord")
            .field("title", &self.title)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Select the first record whose title matches `title`, ignoring case.
///
/// Later records with the same title are ignored.
pub fn resolve_record<'a>(
    records: &'a [AuthenticationRecord],
    title: &str,
) -> Option<&'a AuthenticationRecord> {
    let mut matches = records.iter().filter(|r| r.title_matches(title));
    let selected = matches.next()?;

    let duplicates = matches.count();
    if duplicates > 0 {
        tracing::warn!(
            title,
            duplicates,
            "Multiple records share the expected title; using the first"
        );
    }

    Some(selected)
}
