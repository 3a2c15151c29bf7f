use serde::{Deserialize, Serialize};

use crate::crypto::SealedBlob;

/// Type discriminator of tokens written by this tool
pub const KMS_TOKEN_TYPE: &str = "sideroKMS";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("unknown token type {0:?}")]
    UnknownType(String),
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Payload of a KMS token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmsToken {
    #[serde(rename = "sealedData")]
    pub sealed_data: SealedBlob,
}

/// A typed record attached to a key slot.
///
/// Tokens are stored as LUKS2 token objects whose token id is the key slot:
///
/// ```json
/// {"type": "sideroKMS", "keyslots": [], "userdata": {"sealedData": "<base64>"}}
/// ```
///
/// The token is written before its key slot exists, so it does not reference
/// the slot in `keyslots`; tokens that do are read just the same.
///
/// The discriminator is checked on decode; a token of any other type is an
/// [`TokenError::UnknownType`], never silently treated as ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Kms(KmsToken),
}

/// On-disk shape shared by every token type
#[derive(Debug, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    keyslots: Vec<String>,
    #[serde(default)]
    userdata: Option<serde_json::Value>,
}

impl Token {
    pub fn kms(sealed_data: SealedBlob) -> Self {
        Token::Kms(KmsToken { sealed_data })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Token::Kms(_) => KMS_TOKEN_TYPE,
        }
    }

    pub fn sealed_blob(&self) -> &SealedBlob {
        match self {
            Token::Kms(token) => &token.sealed_data,
        }
    }

    /// Encode as a LUKS2 token object
    pub fn to_value(&self) -> Result<serde_json::Value, TokenError> {
        let userdata = match self {
            Token::Kms(token) => serde_json::to_value(token),
        }
        .map_err(|e| TokenError::Malformed(e.to_string()))?;

        serde_json::to_value(TokenDocument {
            kind: self.kind().to_string(),
            keyslots: Vec::new(),
            userdata: Some(userdata),
        })
        .map_err(|e| TokenError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, TokenError> {
        serde_json::to_vec(&self.to_value()?).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Decode a LUKS2 token object, validating its discriminator
    pub fn from_value(value: serde_json::Value) -> Result<Self, TokenError> {
        let document: TokenDocument =
            serde_json::from_value(value).map_err(|e| TokenError::Malformed(e.to_string()))?;

        match document.kind.as_str() {
            KMS_TOKEN_TYPE => {
                let userdata = document
                    .userdata
                    .ok_or_else(|| TokenError::Malformed("missing userdata".to_string()))?;
                let token: KmsToken = serde_json::from_value(userdata)
                    .map_err(|e| TokenError::Malformed(e.to_string()))?;
                Ok(Token::Kms(token))
            }
            _ => Err(TokenError::UnknownType(document.kind)),
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, TokenError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }
}
