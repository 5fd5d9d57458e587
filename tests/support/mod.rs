#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use credrotate::credentials::AuthenticationRecord;
use credrotate::error::{Result, RotationError};
use credrotate::request::RotationRequest;
use credrotate::rotation::{
    AdapterFactory, Backend, BackendProfile, CredentialUpdater, DefaultAdapterFactory,
    IdentityLocator, PasswordChange, RotationAdapter, RotationOrchestrator, TargetIdentity,
};
use credrotate::transport::TransportConfig;
use secrecy::ExposeSecret;

pub const CISCO_TITLE: &str = "Cisco Authentication Record";
pub const TENABLE_TITLE: &str = "Tenable Authentication Record";
pub const SNOWFLAKE_TITLE: &str = "Snowflake Authentication Record";

pub fn tenable_record() -> AuthenticationRecord {
    AuthenticationRecord::new(TENABLE_TITLE)
        .with_field("tenable_access_key", "access-key")
        .with_field("tenable_secret_key", "secret-key")
}

pub fn cisco_record() -> AuthenticationRecord {
    AuthenticationRecord::new(CISCO_TITLE)
        .with_field("host_endpoint", "router1.example.net")
        .with_field("login", "admin")
        .with_field("password", "admin-pw")
}

pub fn snowflake_record() -> AuthenticationRecord {
    AuthenticationRecord::new(SNOWFLAKE_TITLE)
        .with_field("snowflake_account_name", "acme")
        .with_field("login", "ROTATOR")
        .with_field("password", "admin-pw")
}

/// Encode a rotation envelope line.
pub fn envelope(records: Vec<AuthenticationRecord>, user: &str, new_password: &str) -> String {
    RotationRequest::new(records, user, new_password)
        .encode()
        .expect("envelope encodes")
}

pub fn envelope_with_old(
    records: Vec<AuthenticationRecord>,
    user: &str,
    new_password: &str,
    old_password: &str,
) -> String {
    RotationRequest::new(records, user, new_password)
        .with_old_password(old_password)
        .encode()
        .expect("envelope encodes")
}

/// Orchestrator for a real backend pointed at a mock server.
pub fn orchestrator_for(backend: Backend, base_url: &str) -> RotationOrchestrator {
    let transport = TransportConfig::default().with_base_url(base_url);
    RotationOrchestrator::new(Arc::new(DefaultAdapterFactory::new(backend, transport)))
}

/// What a [`FakeAdapter`] saw.
#[derive(Debug, Default)]
pub struct Calls {
    pub created: usize,
    pub located: Vec<String>,
    pub updated: Vec<(String, String, Option<String>)>,
    pub closed: usize,
}

#[derive(Clone)]
pub enum FakeLocate {
    Found(TargetIdentity),
    Fail(fn() -> RotationError),
}

/// In-memory adapter with scripted results.
pub struct FakeAdapter {
    calls: Arc<Mutex<Calls>>,
    locate: FakeLocate,
    update: Option<fn() -> RotationError>,
}

#[async_trait]
impl IdentityLocator for FakeAdapter {
    async fn locate(&self, search_key: &str) -> Result<TargetIdentity> {
        self.calls
            .lock()
            .unwrap()
            .located
            .push(search_key.to_string());
        match &self.locate {
            FakeLocate::Found(identity) => Ok(identity.clone()),
            FakeLocate::Fail(err) => Err(err()),
        }
    }
}

#[async_trait]
impl CredentialUpdater for FakeAdapter {
    async fn update(&self, identity: &TargetIdentity, change: &PasswordChange) -> Result<()> {
        self.calls.lock().unwrap().updated.push((
            identity.remote_id.clone(),
            change.new_password.expose_secret().to_string(),
            change
                .old_password
                .as_ref()
                .map(|s| s.expose_secret().to_string()),
        ));
        match self.update {
            Some(err) => Err(err()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RotationAdapter for FakeAdapter {
    fn name(&self) -> &str {
        "fake"
    }

    async fn close(&self) -> Result<()> {
        self.calls.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Factory handing out [`FakeAdapter`]s that share one call log.
pub struct FakeFactory {
    backend: Backend,
    pub calls: Arc<Mutex<Calls>>,
    locate: FakeLocate,
    update: Option<fn() -> RotationError>,
    panic_on_create: bool,
}

impl FakeFactory {
    pub fn new(backend: Backend, identity: TargetIdentity) -> Self {
        Self {
            backend,
            calls: Arc::new(Mutex::new(Calls::default())),
            locate: FakeLocate::Found(identity),
            update: None,
            panic_on_create: false,
        }
    }

    pub fn failing_locate(mut self, err: fn() -> RotationError) -> Self {
        self.locate = FakeLocate::Fail(err);
        self
    }

    pub fn failing_update(mut self, err: fn() -> RotationError) -> Self {
        self.update = Some(err);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_create = true;
        self
    }
}

impl AdapterFactory for FakeFactory {
    fn profile(&self) -> &BackendProfile {
        self.backend.profile()
    }

    fn create(&self, _record: &AuthenticationRecord) -> Result<Box<dyn RotationAdapter>> {
        if self.panic_on_create {
            panic!("adapter construction blew up");
        }
        self.calls.lock().unwrap().created += 1;
        Ok(Box::new(FakeAdapter {
            calls: self.calls.clone(),
            locate: self.locate.clone(),
            update: self.update,
        }))
    }
}
