//! A `kms.KMSService` server on a loopback port, serving canned replies

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::body::BoxBody;
use tonic::codec::ProstCodec;
use tonic::codegen::{empty_body, http, Body, BoxFuture, Service, StdError};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::{Code, Status};

use kms_seals::kms::proto::{Request, Response, SEAL_PATH, SERVICE_NAME, UNSEAL_PATH};

/// How the server answers every call
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send the request payload back
    Echo,
    Data(Vec<u8>),
    Fail(Code, String),
}

/// One call as the server saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub node_uuid: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct State {
    reply: Reply,
    calls: Vec<Call>,
}

pub struct FakeKms {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    _shutdown: oneshot::Sender<()>,
}

impl FakeKms {
    /// Serve on a fresh port from a thread of its own, so both sync and
    /// async tests can use it.
    pub fn start() -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(State {
            reply: Reply::Echo,
            calls: Vec::new(),
        }));
        let service = KmsService {
            state: state.clone(),
        };
        let (shutdown, stopped) = oneshot::channel::<()>();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                tonic::transport::Server::builder()
                    .add_service(service)
                    .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                        let _ = stopped.await;
                    })
                    .await
                    .unwrap();
            });
        });

        Self {
            addr,
            state,
            _shutdown: shutdown,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("grpc://{}", self.addr)
    }

    pub fn reply(&self, reply: Reply) {
        self.state.lock().unwrap().reply = reply;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[derive(Clone)]
struct KmsService {
    state: Arc<Mutex<State>>,
}

impl NamedService for KmsService {
    const NAME: &'static str = SERVICE_NAME;
}

impl<B> Service<http::Request<B>> for KmsService
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let method = match req.uri().path() {
            SEAL_PATH => "Seal",
            UNSEAL_PATH => "Unseal",
            _ => {
                return Box::pin(async {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", (Code::Unimplemented as i32).to_string())
                        .header("content-type", "application/grpc")
                        .body(empty_body())
                        .unwrap())
                })
            }
        };
        let handler = Handler {
            method,
            state: self.state.clone(),
        };
        Box::pin(async move {
            let mut grpc = Grpc::new(ProstCodec::<Response, Request>::default());
            Ok(grpc.unary(handler, req).await)
        })
    }
}

struct Handler {
    method: &'static str,
    state: Arc<Mutex<State>>,
}

impl UnaryService<Request> for Handler {
    type Response = Response;
    type Future = BoxFuture<tonic::Response<Response>, Status>;

    fn call(&mut self, request: tonic::Request<Request>) -> Self::Future {
        let request = request.into_inner();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method: self.method,
            node_uuid: request.node_uuid.clone(),
            data: request.data.clone(),
        });

        let result = match &state.reply {
            Reply::Echo => Ok(Response {
                data: request.data.clone(),
            }),
            Reply::Data(data) => Ok(Response { data: data.clone() }),
            Reply::Fail(code, message) => Err(Status::new(*code, message.clone())),
        };
        Box::pin(async move { result.map(tonic::Response::new) })
    }
}
