use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::{AcFanSpeed, AcMode, DeviceKind, Room};

pub const BRIGHTNESS_RANGE: (u8, u8) = (0, 100);
pub const COLOR_TEMP_RANGE: (u16, u16) = (2700, 6500);
pub const FAN_SPEED_RANGE: (u8, u8) = (1, 5);
pub const AC_TEMPERATURE_RANGE: (u8, u8) = (16, 32);
pub const POSITION_RANGE: (u8, u8) = (0, 100);
pub const TIMER_MINUTES_RANGE: (u32, u32) = (1, 24 * 60);

/// Loosely-typed command as it arrives from the wire or from the language model.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    /// Device type name, e.g. `ceiling_light`
    #[serde(default)]
    pub device: String,
    /// Action name, e.g. `set_brightness`
    #[serde(default)]
    pub action: String,
    /// Room name, free-form spelling allowed
    #[serde(default)]
    pub location: Option<String>,
    /// Action parameters
    #[serde(default)]
    #[cfg_attr(feature = "docs", schema(value_type = Option<Object>))]
    pub parameters: Option<Map<String, Value>>,
}

impl RawCommand {
    pub fn new(device: &str, action: &str, location: &str) -> Self {
        Self {
            device: device.to_string(),
            action: action.to_string(),
            location: Some(location.to_string()),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        if let Value::Object(map) = parameters {
            self.parameters = Some(map);
        }
        self
    }

    pub fn parameters(&self) -> Map<String, Value> {
        self.parameters.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    UnsupportedAction {
        device: DeviceKind,
        action: String,
    },
    MissingParameter {
        action: String,
        parameter: &'static str,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::UnsupportedAction { device, action } => {
                write!(f, "unsupported action for {device}: {action}")
            }
            CommandError::MissingParameter { action, parameter } => {
                write!(f, "action {action} requires a numeric or valid {parameter}")
            }
        }
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightAction {
    On,
    Off,
    Toggle,
    Brighten,
    Dim,
    SetBrightness(u8),
    SetColorTemp(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanAction {
    On,
    Off,
    Toggle,
    SetSpeed(u8),
    ToggleOscillation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustFanAction {
    On,
    Off,
    Toggle,
    SetSpeed(u8),
    /// Run for the given number of minutes, then switch off
    SetTimer(u32),
    CancelTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcAction {
    On,
    Off,
    Toggle,
    SetTemperature(u8),
    SetMode(AcMode),
    SetFanSpeed(AcFanSpeed),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurtainAction {
    Open,
    Close,
    SetPosition(u8),
}

/// A device command whose action and parameters are legal for its device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    CeilingLight(LightAction),
    DeskLamp(LightAction),
    Fan(FanAction),
    ExhaustFan(ExhaustFanAction),
    Ac(AcAction),
    Curtain(CurtainAction),
}

impl DeviceCommand {
    /// Build a typed command from free-form action text. Numeric parameters
    /// are rounded and clamped into the legal range of the action; values
    /// that are not numbers are ignored.
    pub fn parse(
        kind: DeviceKind,
        action: &str,
        parameters: &Map<String, Value>,
    ) -> Result<Self, CommandError> {
        let action = action.trim().to_lowercase();
        let unsupported = || CommandError::UnsupportedAction {
            device: kind,
            action: action.clone(),
        };
        let missing = |parameter: &'static str| CommandError::MissingParameter {
            action: action.clone(),
            parameter,
        };

        let command = match kind {
            DeviceKind::CeilingLight | DeviceKind::DeskLamp => {
                let light = match action.as_str() {
                    "on" => LightAction::On,
                    "off" => LightAction::Off,
                    "toggle" => LightAction::Toggle,
                    "brighten" => LightAction::Brighten,
                    "dim" => LightAction::Dim,
                    "set_brightness" => {
                        let (min, max) = BRIGHTNESS_RANGE;
                        let value = clamped(parameters, "brightness", min.into(), max.into())
                            .ok_or_else(|| missing("brightness"))?;
                        LightAction::SetBrightness(value as u8)
                    }
                    "set_color_temp" => {
                        let (min, max) = COLOR_TEMP_RANGE;
                        let value = clamped(parameters, "color_temp", min.into(), max.into())
                            .ok_or_else(|| missing("color_temp"))?;
                        LightAction::SetColorTemp(value as u16)
                    }
                    _ => return Err(unsupported()),
                };

                if kind == DeviceKind::CeilingLight {
                    DeviceCommand::CeilingLight(light)
                } else {
                    DeviceCommand::DeskLamp(light)
                }
            }
            DeviceKind::Fan => DeviceCommand::Fan(match action.as_str() {
                "on" => FanAction::On,
                "off" => FanAction::Off,
                "toggle" => FanAction::Toggle,
                "toggle_oscillation" => FanAction::ToggleOscillation,
                "set_speed" => {
                    let (min, max) = FAN_SPEED_RANGE;
                    let value = clamped(parameters, "speed", min.into(), max.into())
                        .ok_or_else(|| missing("speed"))?;
                    FanAction::SetSpeed(value as u8)
                }
                _ => return Err(unsupported()),
            }),
            DeviceKind::ExhaustFan => DeviceCommand::ExhaustFan(match action.as_str() {
                "on" => ExhaustFanAction::On,
                "off" => ExhaustFanAction::Off,
                "toggle" => ExhaustFanAction::Toggle,
                "cancel_timer" => ExhaustFanAction::CancelTimer,
                "set_speed" => {
                    let (min, max) = FAN_SPEED_RANGE;
                    let value = clamped(parameters, "speed", min.into(), max.into())
                        .ok_or_else(|| missing("speed"))?;
                    ExhaustFanAction::SetSpeed(value as u8)
                }
                "set_timer" => {
                    let (min, max) = TIMER_MINUTES_RANGE;
                    let value = clamped(parameters, "timer", min.into(), max.into())
                        .ok_or_else(|| missing("timer"))?;
                    ExhaustFanAction::SetTimer(value as u32)
                }
                _ => return Err(unsupported()),
            }),
            DeviceKind::Ac => DeviceCommand::Ac(match action.as_str() {
                "on" => AcAction::On,
                "off" => AcAction::Off,
                "toggle" => AcAction::Toggle,
                "set_temperature" => {
                    let (min, max) = AC_TEMPERATURE_RANGE;
                    let value = clamped(parameters, "temperature", min.into(), max.into())
                        .ok_or_else(|| missing("temperature"))?;
                    AcAction::SetTemperature(value as u8)
                }
                "set_mode" => AcAction::SetMode(
                    text(parameters, "mode")
                        .and_then(|mode| mode.parse().ok())
                        .ok_or_else(|| missing("mode"))?,
                ),
                "set_fan_speed" => AcAction::SetFanSpeed(
                    text(parameters, "fan_speed")
                        .and_then(|speed| speed.parse().ok())
                        .ok_or_else(|| missing("fan_speed"))?,
                ),
                _ => return Err(unsupported()),
            }),
            DeviceKind::Curtain => DeviceCommand::Curtain(match action.as_str() {
                "open" | "on" => CurtainAction::Open,
                "close" | "off" => CurtainAction::Close,
                "set_position" => {
                    let (min, max) = POSITION_RANGE;
                    let value = clamped(parameters, "position", min.into(), max.into())
                        .ok_or_else(|| missing("position"))?;
                    CurtainAction::SetPosition(value as u8)
                }
                _ => return Err(unsupported()),
            }),
        };

        Ok(command)
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceCommand::CeilingLight(_) => DeviceKind::CeilingLight,
            DeviceCommand::DeskLamp(_) => DeviceKind::DeskLamp,
            DeviceCommand::Fan(_) => DeviceKind::Fan,
            DeviceCommand::ExhaustFan(_) => DeviceKind::ExhaustFan,
            DeviceCommand::Ac(_) => DeviceKind::Ac,
            DeviceCommand::Curtain(_) => DeviceKind::Curtain,
        }
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            DeviceCommand::CeilingLight(action) | DeviceCommand::DeskLamp(action) => match action {
                LightAction::On => "on",
                LightAction::Off => "off",
                LightAction::Toggle => "toggle",
                LightAction::Brighten => "brighten",
                LightAction::Dim => "dim",
                LightAction::SetBrightness(_) => "set_brightness",
                LightAction::SetColorTemp(_) => "set_color_temp",
            },
            DeviceCommand::Fan(action) => match action {
                FanAction::On => "on",
                FanAction::Off => "off",
                FanAction::Toggle => "toggle",
                FanAction::SetSpeed(_) => "set_speed",
                FanAction::ToggleOscillation => "toggle_oscillation",
            },
            DeviceCommand::ExhaustFan(action) => match action {
                ExhaustFanAction::On => "on",
                ExhaustFanAction::Off => "off",
                ExhaustFanAction::Toggle => "toggle",
                ExhaustFanAction::SetSpeed(_) => "set_speed",
                ExhaustFanAction::SetTimer(_) => "set_timer",
                ExhaustFanAction::CancelTimer => "cancel_timer",
            },
            DeviceCommand::Ac(action) => match action {
                AcAction::On => "on",
                AcAction::Off => "off",
                AcAction::Toggle => "toggle",
                AcAction::SetTemperature(_) => "set_temperature",
                AcAction::SetMode(_) => "set_mode",
                AcAction::SetFanSpeed(_) => "set_fan_speed",
            },
            DeviceCommand::Curtain(action) => match action {
                CurtainAction::Open => "open",
                CurtainAction::Close => "close",
                CurtainAction::SetPosition(_) => "set_position",
            },
        }
    }

    /// Normalized parameters carried by the action.
    pub fn parameters(&self) -> Map<String, Value> {
        let parameter = match self {
            DeviceCommand::CeilingLight(action) | DeviceCommand::DeskLamp(action) => match action {
                LightAction::SetBrightness(value) => Some(("brightness", json!(value))),
                LightAction::SetColorTemp(value) => Some(("color_temp", json!(value))),
                _ => None,
            },
            DeviceCommand::Fan(FanAction::SetSpeed(value)) => Some(("speed", json!(value))),
            DeviceCommand::ExhaustFan(action) => match action {
                ExhaustFanAction::SetSpeed(value) => Some(("speed", json!(value))),
                ExhaustFanAction::SetTimer(value) => Some(("timer", json!(value))),
                _ => None,
            },
            DeviceCommand::Ac(action) => match action {
                AcAction::SetTemperature(value) => Some(("temperature", json!(value))),
                AcAction::SetMode(mode) => Some(("mode", json!(mode))),
                AcAction::SetFanSpeed(speed) => Some(("fan_speed", json!(speed))),
                _ => None,
            },
            DeviceCommand::Curtain(CurtainAction::SetPosition(value)) => {
                Some(("position", json!(value)))
            }
            _ => None,
        };

        parameter
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}

fn number(parameters: &Map<String, Value>, key: &str) -> Option<f64> {
    parameters
        .get(key)
        .and_then(Value::as_f64)
        .filter(|value| value.is_finite())
}

fn clamped(parameters: &Map<String, Value>, key: &str, min: f64, max: f64) -> Option<f64> {
    number(parameters, key).map(|value| value.round().clamp(min, max))
}

fn text<'a>(parameters: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    parameters.get(key).and_then(Value::as_str)
}

/// A command that passed validation: the device exists in the room and the
/// action is legal for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedCommand {
    pub location: Room,
    pub command: DeviceCommand,
}

impl ValidatedCommand {
    pub fn kind(&self) -> DeviceKind {
        self.command.kind()
    }

    pub fn to_raw(&self) -> RawCommand {
        RawCommand {
            device: self.kind().as_str().to_string(),
            action: self.command.action_name().to_string(),
            location: Some(self.location.as_str().to_string()),
            parameters: Some(self.command.parameters()),
        }
    }
}

impl Serialize for ValidatedCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire {
            device: DeviceKind,
            action: &'static str,
            location: Room,
            parameters: Map<String, Value>,
        }

        Wire {
            device: self.kind(),
            action: self.command.action_name(),
            location: self.location,
            parameters: self.command.parameters(),
        }
        .serialize(serializer)
    }
}
