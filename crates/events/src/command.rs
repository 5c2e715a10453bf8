use serde_json::{Map, Value as JsonValue};

use flora_core::{DomainError, DomainResult, FloraId};

use crate::envelope::CommandEnvelope;

/// Typed payload of `get_flora_by_id`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GetFloraById {
    pub flora_id: FloraId,
}

/// The closed set of commands this service answers.
///
/// Commands are decoded from a [`CommandEnvelope`] at the boundary: the name is
/// matched exhaustively and each payload is validated into its typed form, so
/// handlers never see a raw `data` map.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FloraCommand {
    GetAllFloras,
    GetFloraById(GetFloraById),
}

impl FloraCommand {
    pub const GET_ALL_FLORAS: &'static str = "get_all_floras";
    pub const GET_FLORA_BY_ID: &'static str = "get_flora_by_id";

    /// Key under which `get_flora_by_id` carries the identifier.
    pub const PARAM_KEY: &'static str = "param";

    pub fn name(&self) -> &'static str {
        match self {
            FloraCommand::GetAllFloras => Self::GET_ALL_FLORAS,
            FloraCommand::GetFloraById(_) => Self::GET_FLORA_BY_ID,
        }
    }

    /// Validate an envelope into a command.
    ///
    /// All failures are `InvalidArgument` and are answered with code 400.
    pub fn from_envelope(envelope: &CommandEnvelope) -> DomainResult<Self> {
        match envelope.cmd() {
            Self::GET_ALL_FLORAS => Ok(FloraCommand::GetAllFloras),
            Self::GET_FLORA_BY_ID => {
                let flora_id = parse_flora_param(envelope.data().get(Self::PARAM_KEY))?;
                Ok(FloraCommand::GetFloraById(GetFloraById { flora_id }))
            }
            _ => Err(DomainError::invalid_argument("Invalid command")),
        }
    }

    /// Build the envelope a caller would send for this command.
    pub fn to_envelope(&self) -> CommandEnvelope {
        let mut data = Map::new();
        if let FloraCommand::GetFloraById(GetFloraById { flora_id }) = self {
            data.insert(
                Self::PARAM_KEY.to_string(),
                JsonValue::String(flora_id.to_string()),
            );
        }
        CommandEnvelope::new(self.name(), data)
    }
}

fn parse_flora_param(param: Option<&JsonValue>) -> DomainResult<FloraId> {
    match param {
        None | Some(JsonValue::Null) => Err(DomainError::invalid_argument("Flora ID not provided")),
        Some(JsonValue::String(s)) if s.is_empty() => {
            Err(DomainError::invalid_argument("Flora ID not provided"))
        }
        Some(JsonValue::String(s)) => s
            .parse::<FloraId>()
            .map_err(|_| DomainError::invalid_argument("Invalid flora ID")),
        Some(_) => Err(DomainError::invalid_argument("Invalid flora ID")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(cmd: &str, data: JsonValue) -> CommandEnvelope {
        let data = match data {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        CommandEnvelope::new(cmd, data)
    }

    #[test]
    fn decodes_get_all() {
        let cmd = FloraCommand::from_envelope(&envelope("get_all_floras", json!({}))).unwrap();
        assert_eq!(cmd, FloraCommand::GetAllFloras);
    }

    #[test]
    fn decodes_get_by_id_with_typed_payload() {
        let id = FloraId::new();
        let cmd =
            FloraCommand::from_envelope(&envelope("get_flora_by_id", json!({"param": id.to_string()})))
                .unwrap();
        assert_eq!(cmd, FloraCommand::GetFloraById(GetFloraById { flora_id: id }));
        assert_eq!(FloraCommand::from_envelope(&cmd.to_envelope()).unwrap(), cmd);
    }

    #[test]
    fn missing_param_is_not_provided() {
        for data in [json!({}), json!({"param": null}), json!({"param": ""})] {
            let err = FloraCommand::from_envelope(&envelope("get_flora_by_id", data)).unwrap_err();
            assert_eq!(err, DomainError::invalid_argument("Flora ID not provided"));
        }
    }

    #[test]
    fn malformed_param_is_invalid_id() {
        for data in [json!({"param": "u1"}), json!({"param": 42}), json!({"param": ["x"]})] {
            let err = FloraCommand::from_envelope(&envelope("get_flora_by_id", data)).unwrap_err();
            assert_eq!(err, DomainError::invalid_argument("Invalid flora ID"));
        }
    }

    #[test]
    fn unknown_command_is_invalid() {
        for name in ["bogus", "", "GET_ALL_FLORAS"] {
            let err = FloraCommand::from_envelope(&envelope(name, json!({}))).unwrap_err();
            assert_eq!(err, DomainError::invalid_argument("Invalid command"));
            assert_eq!(err.code(), 400);
        }
    }
}
