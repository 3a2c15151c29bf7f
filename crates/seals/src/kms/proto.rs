//! Messages and client stub for `kms.KMSService`, as defined in `proto/kms.proto`.

use std::fmt;

use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use zeroize::Zeroize;

pub const SERVICE_NAME: &str = "kms.KMSService";
pub const SEAL_PATH: &str = "/kms.KMSService/Seal";
pub const UNSEAL_PATH: &str = "/kms.KMSService/Unseal";

/// Shared by `Seal` (plaintext in `data`) and `Unseal` (sealed blob in `data`)
#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct Request {
    #[prost(string, tag = "1")]
    pub node_uuid: String,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

impl Request {
    pub fn new(node_uuid: &str, data: &[u8]) -> Self {
        Self {
            node_uuid: node_uuid.to_string(),
            data: data.to_vec(),
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("node_uuid", &self.node_uuid)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .finish()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
#[prost(skip_debug)]
pub struct Response {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
}

impl Drop for Response {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response(<{} bytes>)", self.data.len())
    }
}

#[derive(Debug, Clone)]
pub struct KmsServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl KmsServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn seal(&mut self, request: Request) -> Result<tonic::Response<Response>, tonic::Status> {
        self.unary(request, SEAL_PATH).await
    }

    pub async fn unseal(
        &mut self,
        request: Request,
    ) -> Result<tonic::Response<Response>, tonic::Status> {
        self.unary(request, UNSEAL_PATH).await
    }

    async fn unary(
        &mut self,
        request: Request,
        path: &'static str,
    ) -> Result<tonic::Response<Response>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("service was not ready: {}", e)))?;
        let codec: ProstCodec<Request, Response> = ProstCodec::default();
        self.inner
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                codec,
            )
            .await
    }
}
