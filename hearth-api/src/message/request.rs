use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Requests sent by real-time clients.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Control {
        #[serde(default)]
        #[cfg_attr(feature = "docs", schema(value_type = Vec<Object>))]
        commands: Vec<Value>,
    },
    GetSensors {
        #[serde(default)]
        location: Option<String>,
    },
    GetStatus,
    Ping,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_requests() {
        let ping: ClientMessage = serde_json::from_value(json!({"type": "ping"})).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        let sensors: ClientMessage =
            serde_json::from_value(json!({"type": "get_sensors", "location": "kitchen"})).unwrap();
        assert_eq!(
            sensors,
            ClientMessage::GetSensors {
                location: Some("kitchen".to_string())
            }
        );

        let control: ClientMessage = serde_json::from_value(json!({"type": "control"})).unwrap();
        assert_eq!(control, ClientMessage::Control { commands: vec![] });

        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "reboot"})).is_err());
    }
}
