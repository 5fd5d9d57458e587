//! The rotation protocol: adapter capabilities, backend profiles and the
//! orchestrator that sequences one rotation.

pub mod adapters;
mod backend;
mod factory;
mod orchestrator;
mod outcome;

pub use backend::{Backend, BackendProfile, UnknownBackend};
pub use factory::{AdapterFactory, DefaultAdapterFactory};
pub use orchestrator::{RotationOrchestrator, RotationState};
pub use outcome::RotationOutcome;

use secrecy::SecretString;

use crate::error::{Result, RotationError};

/// The remote identity a rotation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetIdentity {
    /// Backend identifier used by the update call (id, uuid, name).
    pub remote_id: String,
    /// The value the identity was matched on (username, email, name).
    pub match_key: String,
}

impl TargetIdentity {
    pub fn new(remote_id: impl Into<String>, match_key: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            match_key: match_key.into(),
        }
    }
}

/// Whether a backend needs the current secret to set a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMode {
    /// Administrative overwrite; the old secret is never sent.
    AdminOverwrite,
    /// Self-service change; the request must carry `oldPassword`.
    RequiresCurrent,
}

impl PasswordMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordMode::AdminOverwrite => "admin overwrite",
            PasswordMode::RequiresCurrent => "requires current password",
        }
    }
}

/// New secret plus, for [`PasswordMode::RequiresCurrent`] backends, the old one.
#[derive(Debug)]
pub struct PasswordChange {
    pub new_password: SecretString,
    pub old_password: Option<SecretString>,
}

impl PasswordChange {
    /// The old password, for backends that declared they need it.
    pub fn require_old(&self) -> Result<&SecretString> {
        self.old_password
            .as_ref()
            .ok_or_else(|| RotationError::MissingField(vec!["oldPassword".to_string()]))
    }
}

/// Finds the one remote identity a rotation targets.
#[async_trait::async_trait]
pub trait IdentityLocator: Send + Sync {
    /// Resolve `search_key` to exactly one identity.
    ///
    /// Zero matches is `IdentityNotFound`, more than one is
    /// `AmbiguousIdentity`.
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity>;
}

/// Applies a new secret to an already located identity.
#[async_trait::async_trait]
pub trait CredentialUpdater: Send + Sync {
    /// Issue the single mutating call for this rotation. Never retried.
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()>;
}

/// A backend adapter: locator plus updater over one administrative credential.
#[async_trait::async_trait]
pub trait RotationAdapter: IdentityLocator + CredentialUpdater {
    fn name(&self) -> &str;

    /// Release sessions held by the adapter. Called once, whatever the outcome.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Reduce filtered candidates to exactly one.
pub fn single_match<T>(mut candidates: Vec<T>, key: &'static str, value: &str) -> Result<T> {
    match candidates.len() {
        0 => Err(RotationError::IdentityNotFound {
            key,
            value: value.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        count => Err(RotationError::AmbiguousIdentity {
            key,
            value: value.to_string(),
            count,
        }),
    }
}
