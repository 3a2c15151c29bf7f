//! gRPC client for the remote sealing service.
//!
//! `kms.KMSService` exposes two unary calls, both taking
//! `Request { node_uuid, data }` and answering `Response { data }`:
//!
//! - `Seal`: `data` is the plaintext key, the answer is the sealed blob
//! - `Unseal`: `data` is the sealed blob, the answer is the plaintext key
//!
//! The endpoint scheme picks the channel: `grpc://` is plaintext HTTP/2,
//! `grpcs://` is TLS against the platform roots. A missing port means 443.

mod client;
mod error;
pub mod proto;

use url::Url;

pub use client::KmsClient;
pub use error::KmsClientError;

/// Port dialed when the endpoint does not name one
pub const DEFAULT_PORT: u16 = 443;

/// Transport selected by the endpoint's URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// `grpc://`
    Plaintext,
    /// `grpcs://`
    Tls,
}

impl Transport {
    pub fn for_endpoint(endpoint: &Url) -> Result<Self, KmsClientError> {
        match endpoint.scheme() {
            "grpc" => Ok(Transport::Plaintext),
            "grpcs" => Ok(Transport::Tls),
            other => Err(KmsClientError::UnsupportedScheme(other.to_string())),
        }
    }

    fn uri_scheme(self) -> &'static str {
        match self {
            Transport::Plaintext => "http",
            Transport::Tls => "https",
        }
    }
}
