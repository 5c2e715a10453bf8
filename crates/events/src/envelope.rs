use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use flora_core::DomainError;

/// Routing pattern of a command envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default, deserialize_with = "null_as_default")]
    cmd: String,
}

/// Envelope for an RPC command, as it arrives on the inbound queue.
///
/// Wire form: `{"pattern": {"cmd": "<name>"}, "data": {...}}`.
///
/// Notes:
/// - Decoding is lenient about *shape*: a missing or `null` `pattern`, `cmd` or
///   `data` decodes to its empty value. An unknown command name is therefore
///   still a well-formed envelope and gets an answer.
/// - A body that is not a JSON object of this shape is a protocol error.
/// - The envelope is immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pattern: Pattern,

    #[serde(default, deserialize_with = "null_as_default")]
    data: Map<String, JsonValue>,
}

impl CommandEnvelope {
    pub fn new(cmd: impl Into<String>, data: Map<String, JsonValue>) -> Self {
        Self {
            pattern: Pattern { cmd: cmd.into() },
            data,
        }
    }

    pub fn cmd(&self) -> &str {
        &self.pattern.cmd
    }

    pub fn data(&self) -> &Map<String, JsonValue> {
        &self.data
    }

    /// Decode a UTF-8 JSON body.
    pub fn decode(body: &[u8]) -> Result<Self, DomainError> {
        let text = core::str::from_utf8(body)
            .map_err(|e| DomainError::protocol(format!("body is not UTF-8: {e}")))?;
        serde_json::from_str(text)
            .map_err(|e| DomainError::protocol(format!("malformed command envelope: {e}")))
    }

    pub fn encode(&self) -> Vec<u8> {
        // A struct of strings and JSON maps always serializes.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Outcome tag of a response envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Uniform reply shape, regardless of transport.
///
/// `code` follows HTTP semantics (200, 400, 404, 500) even over the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    pub code: u16,
    pub data: JsonValue,
}

impl ResponseEnvelope {
    pub fn success(data: JsonValue) -> Self {
        Self {
            status: ResponseStatus::Success,
            code: 200,
            data,
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            code,
            data: JsonValue::String(message.into()),
        }
    }

    pub fn internal_error() -> Self {
        Self::error(500, "Internal Server Error")
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl From<DomainError> for ResponseEnvelope {
    fn from(err: DomainError) -> Self {
        Self::error(err.code(), err.message())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
