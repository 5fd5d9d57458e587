//! Sequences one rotation: decode, resolve, validate, locate, update, report.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

use crate::credentials::{resolve_record, AuthenticationRecord};
use crate::error::{Result, RotationError};
use crate::request::RotationRequest;

use super::{
    AdapterFactory, BackendProfile, PasswordChange, PasswordMode, RotationAdapter,
    RotationOutcome, TargetIdentity,
};

/// Stages of a rotation, in the order they run. None is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Decoding,
    ResolvingRecord,
    ValidatingFields,
    LocatingIdentity,
    UpdatingCredential,
    Reporting,
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationState::Decoding => "decoding",
            RotationState::ResolvingRecord => "resolving_record",
            RotationState::ValidatingFields => "validating_fields",
            RotationState::LocatingIdentity => "locating_identity",
            RotationState::UpdatingCredential => "updating_credential",
            RotationState::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Runs a single rotation against the backend its factory builds.
///
/// Depends only on [`AdapterFactory`] and [`RotationAdapter`], never on a
/// concrete backend.
pub struct RotationOrchestrator {
    factory: Arc<dyn AdapterFactory>,
}

/// Request fields after validation.
struct ValidatedRequest<'a> {
    record: &'a AuthenticationRecord,
    user: &'a str,
    change: PasswordChange,
}

impl RotationOrchestrator {
    pub fn new(factory: Arc<dyn AdapterFactory>) -> Self {
        Self { factory }
    }

    pub fn profile(&self) -> &BackendProfile {
        self.factory.profile()
    }

    /// Run one rotation from an envelope line to a reportable outcome.
    pub async fn run(&self, envelope_line: &str) -> RotationOutcome {
        match self.rotate(envelope_line).await {
            Ok(identity) => {
                enter(RotationState::Reporting, self.profile());
                RotationOutcome::success(format!(
                    "Password successfully rotated for {} {}",
                    self.profile().identity_key,
                    identity.match_key
                ))
            }
            Err(err) => {
                warn!(
                    backend = self.profile().name,
                    kind = %err.kind(),
                    error = %err,
                    "Rotation failed"
                );
                RotationOutcome::failure(&err)
            }
        }
    }

    /// [`run`](Self::run) on its own task, so a panic in an adapter still
    /// ends in an [`RotationOutcome::unexpected`] outcome.
    pub async fn run_guarded(self: Arc<Self>, envelope_line: String) -> RotationOutcome {
        let backend = self.profile().name;
        match tokio::spawn(async move { self.run(&envelope_line).await }).await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                error!(backend, panicked = join_err.is_panic(), "Rotation task aborted");
                RotationOutcome::unexpected()
            }
        }
    }

    /// Run one rotation, returning the identity whose secret was replaced.
    ///
    /// Every secret in the request is scrubbed from the returned error.
    pub async fn rotate(&self, envelope_line: &str) -> Result<TargetIdentity> {
        enter(RotationState::Decoding, self.profile());
        let request = RotationRequest::decode(envelope_line)?;
        let secrets = request.secrets();

        self.rotate_request(&request, &secrets)
            .await
            .map_err(|err| err.redact(&secrets))
    }

    async fn rotate_request(
        &self,
        request: &RotationRequest,
        secrets: &[&str],
    ) -> Result<TargetIdentity> {
        let profile = self.profile();

        enter(RotationState::ResolvingRecord, profile);
        let record = resolve_record(&request.records, profile.record_title).ok_or_else(|| {
            RotationError::RecordNotFound {
                title: profile.record_title.to_string(),
            }
        })?;

        enter(RotationState::ValidatingFields, profile);
        let validated = validate(profile, record, request)?;

        let adapter = self.factory.create(validated.record)?;
        let result = locate_and_update(adapter.as_ref(), profile, &validated).await;

        if let Err(err) = adapter.close().await {
            let err = err.redact(secrets);
            warn!(backend = profile.name, error = %err, "Failed to release backend session");
        }

        result
    }
}

async fn locate_and_update(
    adapter: &dyn RotationAdapter,
    profile: &BackendProfile,
    request: &ValidatedRequest<'_>,
) -> Result<TargetIdentity> {
    enter(RotationState::LocatingIdentity, profile);
    let identity = adapter.locate(request.user).await?;
    debug!(
        backend = adapter.name(),
        remote_id = %identity.remote_id,
        "Located identity"
    );

    enter(RotationState::UpdatingCredential, profile);
    adapter
        .update(&identity, &request.change)
        .await
        .map_err(RotationError::into_update_failure)?;

    info!(backend = adapter.name(), user = %identity.match_key, "Password updated");
    Ok(identity)
}

/// Check every field the backend needs before any remote call.
///
/// Missing names are reported in declaration order: record fields first,
/// then `user`, `newPassword` and, when required, `oldPassword`.
fn validate<'a>(
    profile: &BackendProfile,
    record: &'a AuthenticationRecord,
    request: &'a RotationRequest,
) -> Result<ValidatedRequest<'a>> {
    let mut missing: Vec<String> = profile
        .record_fields
        .iter()
        .filter(|field| record.non_empty(field).is_none())
        .map(|field| field.to_string())
        .collect();

    let user = request.user.as_deref().filter(|u| !u.is_empty());
    if user.is_none() {
        missing.push("user".to_string());
    }

    let new_password = non_empty_secret(request.new_password.as_ref());
    if new_password.is_none() {
        missing.push("newPassword".to_string());
    }

    let old_password = non_empty_secret(request.old_password.as_ref());
    if profile.password_mode == PasswordMode::RequiresCurrent && old_password.is_none() {
        missing.push("oldPassword".to_string());
    }

    match (user, new_password) {
        (Some(user), Some(new_password)) if missing.is_empty() => Ok(ValidatedRequest {
            record,
            user,
            change: PasswordChange {
                new_password,
                // Only self-service backends ever see the old secret.
                old_password: match profile.password_mode {
                    PasswordMode::RequiresCurrent => old_password,
                    PasswordMode::AdminOverwrite => None,
                },
            },
        }),
        _ => Err(RotationError::MissingField(missing)),
    }
}

fn non_empty_secret(secret: Option<&SecretString>) -> Option<SecretString> {
    secret
        .map(|s| s.expose_secret())
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_string()))
}

fn enter(state: RotationState, profile: &BackendProfile) {
    debug!(backend = profile.name, state = %state, "Entering rotation state");
}
