//! Administrative authentication records.
//!
//! A rotation envelope carries a list of records, each a titled bundle of
//! fields (host, admin login, API keys, ...). Every backend names the title
//! it expects and the field keys it reads from the selected record:
//!
//! ```json
//! [
//!   { "title": "Tenable Authentication Record",
//!     "tenable_access_key": "...",
//!     "tenable_secret_key": "..." }
//! ]
//! ```

mod record;

pub use record::{resolve_record, AuthenticationRecord};
