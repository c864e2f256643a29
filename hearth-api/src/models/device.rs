use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Dimmable ceiling light with color temperature
    CeilingLight,
    /// Dimmable desk lamp with color temperature
    DeskLamp,
    /// Multi-speed fan with oscillation
    Fan,
    /// Exhaust fan with an off-timer
    ExhaustFan,
    /// Air conditioner
    Ac,
    /// Motorized curtain
    Curtain,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 6] = [
        DeviceKind::CeilingLight,
        DeviceKind::DeskLamp,
        DeviceKind::Fan,
        DeviceKind::ExhaustFan,
        DeviceKind::Ac,
        DeviceKind::Curtain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::CeilingLight => "ceiling_light",
            DeviceKind::DeskLamp => "desk_lamp",
            DeviceKind::Fan => "fan",
            DeviceKind::ExhaustFan => "exhaust_fan",
            DeviceKind::Ac => "ac",
            DeviceKind::Curtain => "curtain",
        }
    }

    pub fn is_light(&self) -> bool {
        matches!(self, DeviceKind::CeilingLight | DeviceKind::DeskLamp)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDeviceKindError(pub String);

impl fmt::Display for ParseDeviceKindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown device: {}", self.0)
    }
}

impl std::error::Error for ParseDeviceKindError {}

impl FromStr for DeviceKind {
    type Err = ParseDeviceKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();

        DeviceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseDeviceKindError(value.to_string()))
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    On,
    Off,
}

impl PowerStatus {
    pub fn from_on(on: bool) -> Self {
        if on { PowerStatus::On } else { PowerStatus::Off }
    }

    pub fn is_on(&self) -> bool {
        *self == PowerStatus::On
    }

    pub fn toggled(&self) -> Self {
        PowerStatus::from_on(!self.is_on())
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurtainStatus {
    Open,
    Closed,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcMode {
    Cool,
    Heat,
    Fan,
    Dry,
    Auto,
}

impl FromStr for AcMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "cool" => Ok(AcMode::Cool),
            "heat" => Ok(AcMode::Heat),
            "fan" => Ok(AcMode::Fan),
            "dry" => Ok(AcMode::Dry),
            "auto" => Ok(AcMode::Auto),
            _ => Err(()),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcFanSpeed {
    Auto,
    Low,
    Medium,
    High,
}

impl FromStr for AcFanSpeed {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "auto" => Ok(AcFanSpeed::Auto),
            "low" => Ok(AcFanSpeed::Low),
            "medium" => Ok(AcFanSpeed::Medium),
            "high" => Ok(AcFanSpeed::High),
            _ => Err(()),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    /// Power status
    pub status: PowerStatus,
    /// Brightness percentage (0-100)
    pub brightness: u8,
    /// Color temperature in Kelvin (2700-6500)
    pub color_temp: u16,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanState {
    /// Power status
    pub status: PowerStatus,
    /// Speed level (1-5)
    pub speed: u8,
    /// Whether the fan head oscillates
    pub oscillation: bool,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustFanState {
    /// Power status
    pub status: PowerStatus,
    /// Speed level (1-5)
    pub speed: u8,
    /// Minutes remaining on the off-timer, 0 when no timer runs
    pub timer: u32,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcState {
    /// Power status
    pub status: PowerStatus,
    /// Setpoint in Celsius (16-32)
    pub temperature: u8,
    /// Operating mode
    pub mode: AcMode,
    /// Blower speed
    pub fan_speed: AcFanSpeed,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurtainState {
    /// Open or closed
    pub status: CurtainStatus,
    /// Opening percentage, 0 closed and 100 fully open
    pub position: u8,
}

/// Mutable state of one installed device. Serialized without a tag so the
/// wire shape is the bare field set of the device type.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceState {
    Light(LightState),
    Ac(AcState),
    ExhaustFan(ExhaustFanState),
    Fan(FanState),
    Curtain(CurtainState),
}

impl DeviceState {
    /// Whether the device is powered or, for curtains, open.
    pub fn is_active(&self) -> bool {
        match self {
            DeviceState::Light(state) => state.status.is_on(),
            DeviceState::Fan(state) => state.status.is_on(),
            DeviceState::ExhaustFan(state) => state.status.is_on(),
            DeviceState::Ac(state) => state.status.is_on(),
            DeviceState::Curtain(state) => state.status == CurtainStatus::Open,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_device_kind_round_trip_names() {
        for kind in DeviceKind::ALL {
            assert_eq!(kind.as_str().parse::<DeviceKind>(), Ok(kind));
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
        assert!("sensors".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_untagged_state_shape() {
        let state = DeviceState::Light(LightState {
            status: PowerStatus::On,
            brightness: 80,
            color_temp: 3000,
        });

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"status": "on", "brightness": 80, "color_temp": 3000})
        );

        let curtain: DeviceState =
            serde_json::from_value(json!({"status": "closed", "position": 0})).unwrap();
        assert!(matches!(curtain, DeviceState::Curtain(_)));

        let exhaust: DeviceState =
            serde_json::from_value(json!({"status": "on", "speed": 2, "timer": 5})).unwrap();
        assert!(matches!(exhaust, DeviceState::ExhaustFan(_)));
    }
}
