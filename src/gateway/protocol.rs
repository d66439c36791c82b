// Keywarden — Boundary Protocol Types
//
// A request is a JSON object with exactly one member, `{"<name>": {fields}}`.
// Byte-valued fields and results travel as standard base64. The reply is
// `{"result": ...}` or `{"error": {"kind": ..., "message": ...}}`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::auth::AuthMethod;
use crate::enclave::EnclaveError;

/// The fixed set of request names the enclave answers.
pub const REQUEST_NAMES: [&str; 7] = [
    "confirm",
    "decrypt",
    "encrypt",
    "keys",
    "reset",
    "configure",
    "storage",
];

/// Bytes carried as a base64 string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Base64Bytes(pub Vec<u8>);

impl TryFrom<String> for Base64Bytes {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        STANDARD
            .decode(text.as_bytes())
            .map(Base64Bytes)
            .map_err(|e| format!("invalid base64: {}", e))
    }
}

impl std::ops::Deref for Base64Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Request {
    Storage {
        human_id: Option<String>,
        signer_address: Option<String>,
        signer_public_key: Option<String>,
    },
    Keys {
        auth_method: Option<AuthMethod>,
    },
    Encrypt {
        message: Base64Bytes,
        receiver_public_key: Option<Base64Bytes>,
    },
    Decrypt {
        full_message: Base64Bytes,
        sender_public_key: Base64Bytes,
    },
    Confirm {
        message: String,
    },
    Reset {},
    Configure {
        mode: Option<String>,
        theme: Option<String>,
    },
}

impl Request {
    /// Parse the `data` of an inbound message.
    pub fn parse(data: &Value) -> Result<Self, EnclaveError> {
        let object = data
            .as_object()
            .ok_or_else(|| EnclaveError::InvalidParams("request must be a JSON object".into()))?;

        let mut members = object.iter();
        let (Some((name, fields)), None) = (members.next(), members.next()) else {
            return Err(EnclaveError::InvalidParams(
                "request must have exactly one member".into(),
            ));
        };
        if !REQUEST_NAMES.contains(&name.as_str()) {
            return Err(EnclaveError::UnrecognizedRequest(name.clone()));
        }

        // `{"reset": null}` and `{"reset": {}}` mean the same thing.
        let fields = match fields {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        let mut tagged = Map::new();
        tagged.insert(name.clone(), fields);

        serde_json::from_value(Value::Object(tagged))
            .map_err(|e| EnclaveError::InvalidParams(format!("{}: {}", name, e)))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Storage { .. } => "storage",
            Request::Keys { .. } => "keys",
            Request::Encrypt { .. } => "encrypt",
            Request::Decrypt { .. } => "decrypt",
            Request::Confirm { .. } => "confirm",
            Request::Reset {} => "reset",
            Request::Configure { .. } => "configure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&EnclaveError> for ErrorBody {
    fn from(e: &EnclaveError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Result(Value),
    Error(ErrorBody),
}

impl Response {
    pub fn error(e: &EnclaveError) -> Self {
        Response::Error(e.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

/// One message delivered to the router by a transport.
#[derive(Debug)]
pub struct InboundMessage {
    /// Sender identity as established by the transport.
    pub origin: String,
    pub data: Value,
    /// Dropped without sending when the message is ignored.
    pub reply: oneshot::Sender<Response>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_storage_with_missing_fields() {
        let request = Request::parse(&json!({"storage": {"humanId": "h1"}})).unwrap();
        assert_eq!(
            request,
            Request::Storage {
                human_id: Some("h1".into()),
                signer_address: None,
                signer_public_key: None,
            }
        );
    }

    #[test]
    fn test_parse_encrypt_decodes_base64() {
        let request = Request::parse(&json!({"encrypt": {"message": "aGVsbG8="}})).unwrap();
        match request {
            Request::Encrypt {
                message,
                receiver_public_key,
            } => {
                assert_eq!(&*message, b"hello");
                assert!(receiver_public_key.is_none());
            }
            other => panic!("expected encrypt, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_reset_accepts_null_and_empty() {
        assert_eq!(Request::parse(&json!({"reset": null})).unwrap(), Request::Reset {});
        assert_eq!(Request::parse(&json!({"reset": {}})).unwrap(), Request::Reset {});
    }

    #[test]
    fn test_parse_keys_auth_method() {
        let request = Request::parse(&json!({"keys": {"authMethod": "passkey"}})).unwrap();
        assert_eq!(
            request,
            Request::Keys {
                auth_method: Some(AuthMethod::Passkey)
            }
        );
    }

    #[test]
    fn test_unknown_request_name() {
        let err = Request::parse(&json!({"sign": {}})).unwrap_err();
        assert!(matches!(err, EnclaveError::UnrecognizedRequest(ref name) if name == "sign"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = Request::parse(&json!({"decrypt": {"fullMessage": "AAAA"}})).unwrap_err();
        assert_eq!(err.kind(), "InvalidParams");
    }

    #[test]
    fn test_bad_base64_is_invalid_params() {
        let err = Request::parse(&json!({"encrypt": {"message": "***"}})).unwrap_err();
        assert_eq!(err.kind(), "InvalidParams");
    }

    #[test]
    fn test_request_must_be_single_member_object() {
        assert!(Request::parse(&json!("storage")).is_err());
        assert!(Request::parse(&json!({})).is_err());
        assert!(Request::parse(&json!({"keys": {}, "reset": {}})).is_err());
    }

    #[test]
    fn test_response_wire_shape() {
        let ok = serde_json::to_value(Response::Result(Value::Null)).unwrap();
        assert_eq!(ok, json!({"result": null}));

        let err = Response::error(&EnclaveError::Locked);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"]["kind"], "Locked");
        assert!(value["error"]["message"].is_string());
    }
}
