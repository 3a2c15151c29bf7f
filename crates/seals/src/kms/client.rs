use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{ClientTlsConfig, Endpoint};
use url::Url;
use zeroize::Zeroizing;

use common::crypto::SealedBlob;
use common::identity::NodeIdentity;
use common::sealing::{SealingError, SealingService};

use super::error::KmsClientError;
use super::proto::{KmsServiceClient, Request};
use super::{Transport, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct KmsClient {
    endpoint: Url,
    client: KmsServiceClient,
}

impl KmsClient {
    /// Build a client for `endpoint`; the scheme picks plaintext or TLS.
    ///
    /// The channel connects on first use, so this must run inside a tokio
    /// runtime but never touches the network.
    pub fn new(endpoint: &Url, timeout: Option<Duration>) -> Result<Self, KmsClientError> {
        let transport = Transport::for_endpoint(endpoint)?;
        let host = endpoint
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or(KmsClientError::MissingHost)?;
        let port = endpoint.port().unwrap_or(DEFAULT_PORT);

        let mut channel = Endpoint::from_shared(format!(
            "{}://{}:{}",
            transport.uri_scheme(),
            host,
            port
        ))?;
        if transport == Transport::Tls {
            channel = channel.tls_config(ClientTlsConfig::new())?;
        }
        if let Some(timeout) = timeout {
            channel = channel.connect_timeout(timeout).timeout(timeout);
        }

        Ok(Self {
            endpoint: endpoint.clone(),
            client: KmsServiceClient::new(channel.connect_lazy()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SealingService for KmsClient {
    async fn seal(
        &self,
        identity: &NodeIdentity,
        plaintext: &[u8],
    ) -> Result<SealedBlob, SealingError> {
        tracing::debug!(endpoint = %self.endpoint, node = %identity, "sealing key material");
        let mut response = self
            .client
            .clone()
            .seal(Request::new(identity.as_str(), plaintext))
            .await
            .map_err(KmsClientError::from)?
            .into_inner();
        let sealed = std::mem::take(&mut response.data);
        if sealed.is_empty() {
            return Err(KmsClientError::EmptyResponse("sealed blob").into());
        }
        Ok(SealedBlob::from(sealed))
    }

    async fn unseal(
        &self,
        identity: &NodeIdentity,
        sealed: &SealedBlob,
    ) -> Result<Zeroizing<Vec<u8>>, SealingError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            node = %identity,
            sealed_len = sealed.len(),
            "unsealing"
        );
        let mut response = self
            .client
            .clone()
            .unseal(Request::new(identity.as_str(), sealed.bytes()))
            .await
            .map_err(KmsClientError::from)?
            .into_inner();
        let plaintext = Zeroizing::new(std::mem::take(&mut response.data));
        if plaintext.is_empty() {
            return Err(KmsClientError::EmptyResponse("plaintext").into());
        }
        Ok(plaintext)
    }
}
