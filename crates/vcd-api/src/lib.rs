// vcd-api: Async Rust client for the VMware Cloud Director OpenAPI

pub mod auth;
pub mod error;
pub mod openapi;
pub mod transport;
pub mod version;

pub use auth::{Credentials, SessionScope};
pub use error::Error;
pub use openapi::OpenApiClient;
pub use openapi::types as openapi_types;
pub use transport::{TlsMode, TransportConfig};
pub use version::ApiVersion;
