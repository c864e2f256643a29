use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DeviceKind;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    /// Living room
    LivingRoom,
    /// Bedroom
    Bedroom,
    /// Kitchen
    Kitchen,
    /// Study
    Study,
    /// Bathroom
    Bathroom,
}

impl Room {
    pub const ALL: [Room; 5] = [
        Room::LivingRoom,
        Room::Bedroom,
        Room::Kitchen,
        Room::Study,
        Room::Bathroom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Room::LivingRoom => "living_room",
            Room::Bedroom => "bedroom",
            Room::Kitchen => "kitchen",
            Room::Study => "study",
            Room::Bathroom => "bathroom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Room::LivingRoom => "Living Room",
            Room::Bedroom => "Bedroom",
            Room::Kitchen => "Kitchen",
            Room::Study => "Study",
            Room::Bathroom => "Bathroom",
        }
    }

    /// Device kinds physically installed in the room.
    pub fn devices(&self) -> &'static [DeviceKind] {
        use DeviceKind::*;

        match self {
            Room::LivingRoom => &[CeilingLight, Fan, Ac, Curtain],
            Room::Bedroom => &[CeilingLight, DeskLamp, Fan, Ac, Curtain],
            Room::Kitchen => &[CeilingLight, ExhaustFan],
            Room::Study => &[CeilingLight, DeskLamp, Fan, Curtain],
            Room::Bathroom => &[CeilingLight, ExhaustFan, Curtain],
        }
    }

    pub fn has_device(&self, kind: DeviceKind) -> bool {
        self.devices().contains(&kind)
    }

    /// Rooms where the given device kind is installed, in topology order.
    pub fn with_device(kind: DeviceKind) -> impl Iterator<Item = Room> {
        Room::ALL.into_iter().filter(move |room| room.has_device(kind))
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoomError(pub String);

impl fmt::Display for ParseRoomError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown location: {}", self.0)
    }
}

impl std::error::Error for ParseRoomError {}

impl FromStr for Room {
    type Err = ParseRoomError;

    /// Accepts free-form spelling: case and surrounding whitespace are ignored
    /// and inner spaces map to underscores ("Living Room" -> `living_room`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace(' ', "_");

        Room::ALL
            .into_iter()
            .find(|room| room.as_str() == normalized)
            .ok_or_else(|| ParseRoomError(value.to_string()))
    }
}
