//! Sol-Ark Cloud integration.
//!
//! Authentication, transport, and normalization for the vendor cloud API.
mod auth;
mod client;
mod error;
mod http_client;
mod normalize;
mod schemas;

pub use auth::{AuthMode, AuthProtocol, Authenticator, Credentials, Session};
pub use client::Client;
pub use error::{Error, ErrorDescriptor, Result};
pub use http_client::{Host, HttpClient};
pub use normalize::{ProtocolHint, normalize};
pub use schemas::RawReading;
