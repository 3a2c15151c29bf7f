use std::error::Error;

use tonic::{Code, Status};

use common::error::{Categorized, ErrorCategory};
use common::sealing::SealingError;

#[derive(Debug, thiserror::Error)]
pub enum KmsClientError {
    #[error("invalid KMS endpoint: {}", error_chain(.0))]
    Endpoint(#[from] tonic::transport::Error),
    #[error("unsupported endpoint scheme {0:?}, expected grpc or grpcs")]
    UnsupportedScheme(String),
    #[error("endpoint has no host")]
    MissingHost,
    #[error("KMS call failed ({code:?}): {message}", code = .0.code(), message = .0.message())]
    Status(#[from] Status),
    #[error("empty {0} from sealing service")]
    EmptyResponse(&'static str),
}

impl KmsClientError {
    /// The call never got an answer from the service
    fn is_transport(&self) -> bool {
        match self {
            KmsClientError::Status(status) => {
                // statuses raised locally by the channel carry their cause
                matches!(
                    status.code(),
                    Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled
                ) || status.source().is_some()
            }
            _ => false,
        }
    }
}

impl Categorized for KmsClientError {
    fn category(&self) -> ErrorCategory {
        match self {
            KmsClientError::Endpoint(_)
            | KmsClientError::UnsupportedScheme(_)
            | KmsClientError::MissingHost => ErrorCategory::Configuration,
            e if e.is_transport() => ErrorCategory::Transport,
            KmsClientError::Status(_) | KmsClientError::EmptyResponse(_) => ErrorCategory::Remote,
        }
    }
}

impl From<KmsClientError> for SealingError {
    fn from(e: KmsClientError) -> Self {
        match e {
            e if e.is_transport() => SealingError::Transport(e.to_string()),
            KmsClientError::Status(status) => {
                SealingError::Rejected(format!("{:?}: {}", status.code(), status.message()))
            }
            e @ KmsClientError::EmptyResponse(_) => SealingError::InvalidResponse(e.to_string()),
            e => SealingError::Transport(e.to_string()),
        }
    }
}

/// tonic hides the interesting part (refused, TLS, bad URI) in the source chain
fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
