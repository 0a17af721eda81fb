// OpenAPI client for VMware Cloud Director.
//
// Hand-crafted async HTTP client for the `/cloudapi/1.0.0/` endpoints that
// distributed firewall management touches: VDC groups, DFW policies and
// rules, firewall groups, and the profile catalogs.

pub mod client;
pub mod types;

pub use client::OpenApiClient;
