use std::fmt::{self, Debug, Display};

use async_trait::async_trait;

use crate::error::{Categorized, ErrorCategory};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("node identity is empty")]
    Empty,
    #[error("failed to look up node identity: {0}")]
    Lookup(#[from] anyhow::Error),
}

impl Categorized for IdentityError {
    fn category(&self) -> ErrorCategory {
        match self {
            IdentityError::Empty => ErrorCategory::Configuration,
            IdentityError::Lookup(_) => ErrorCategory::Environment,
        }
    }
}

/// Opaque identifier of the current host.
///
/// Every sealed blob is scoped to the identity it was sealed under; the
/// sealing service only unseals it for the same identity.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentityError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(IdentityError::Empty);
        }
        Ok(NodeIdentity(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIdentity({})", self.0)
    }
}

impl Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current host's identity, resolved once per process.
#[async_trait]
pub trait NodeIdentityProvider: Send + Sync + Debug {
    async fn node_identity(&self) -> Result<NodeIdentity, IdentityError>;
}

/// An identity fixed by configuration
#[derive(Debug, Clone)]
pub struct StaticIdentity(NodeIdentity);

impl StaticIdentity {
    pub fn new(identity: NodeIdentity) -> Self {
        Self(identity)
    }
}

#[async_trait]
impl NodeIdentityProvider for StaticIdentity {
    async fn node_identity(&self) -> Result<NodeIdentity, IdentityError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_trimmed() {
        let id = NodeIdentity::new("  75717bc6-8bec-42da-ab62-402a27ac6dd2\n").unwrap();
        assert_eq!(id.as_str(), "75717bc6-8bec-42da-ab62-402a27ac6dd2");
    }

    #[test]
    fn test_empty_identity_rejected() {
        let err = NodeIdentity::new(" \n").unwrap_err();
        assert!(matches!(err, IdentityError::Empty));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[tokio::test]
    async fn test_static_identity() {
        let id = NodeIdentity::new("node-a").unwrap();
        let provider = StaticIdentity::new(id.clone());
        assert_eq!(provider.node_identity().await.unwrap(), id);
    }
}
