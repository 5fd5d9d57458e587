use crate::credentials::AuthenticationRecord;
use crate::error::Result;
use crate::transport::TransportConfig;

use super::adapters::{
    CiscoIosXeAdapter, MerakiAdapter, SnowflakeAdapter, TenableApiCredentialAdapter,
    TenableIoCredentialAdapter, TenableIoUserAdapter, TenableScUserAdapter,
};
use super::{Backend, BackendProfile, RotationAdapter};

/// Builds the adapter for one backend from its authentication record.
pub trait AdapterFactory: Send + Sync {
    fn profile(&self) -> &BackendProfile;

    /// Build an adapter. The record has already passed field validation.
    fn create(&self, record: &AuthenticationRecord) -> Result<Box<dyn RotationAdapter>>;
}

#[derive(Debug, Clone)]
pub struct DefaultAdapterFactory {
    backend: Backend,
    transport: TransportConfig,
}

impl DefaultAdapterFactory {
    pub fn new(backend: Backend, transport: TransportConfig) -> Self {
        Self { backend, transport }
    }
}

impl AdapterFactory for DefaultAdapterFactory {
    fn profile(&self) -> &BackendProfile {
        self.backend.profile()
    }

    fn create(&self, record: &AuthenticationRecord) -> Result<Box<dyn RotationAdapter>> {
        let transport = &self.transport;
        Ok(match self.backend {
            Backend::CiscoIosXe => Box::new(CiscoIosXeAdapter::from_record(record, transport)?),
            Backend::Meraki => Box::new(MerakiAdapter::from_record(record, transport)?),
            Backend::TenableIoUser => {
                Box::new(TenableIoUserAdapter::from_record(record, transport)?)
            }
            Backend::TenableIoCredential => {
                Box::new(TenableIoCredentialAdapter::from_record(record, transport)?)
            }
            Backend::TenableScUser => {
                Box::new(TenableScUserAdapter::from_record(record, transport)?)
            }
            Backend::TenableApiCredential => {
                Box::new(TenableApiCredentialAdapter::from_record(record, transport)?)
            }
            Backend::Snowflake => Box::new(SnowflakeAdapter::from_record(record, transport)?),
        })
    }
}
