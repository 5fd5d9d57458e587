pub mod config;
pub mod credentials;
pub mod error;
pub mod request;
pub mod rotation;
pub mod snowflake;
pub mod tenable;
pub mod transport;
