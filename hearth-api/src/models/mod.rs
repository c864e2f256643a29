mod command;
mod control;
mod device;
mod room;
mod sensor;

pub use command::*;
pub use control::*;
pub use device::*;
pub use room::*;
pub use sensor::*;

use std::collections::BTreeMap;

/// Every device state keyed by device kind, then by room.
pub type DeviceMap = BTreeMap<DeviceKind, BTreeMap<Room, DeviceState>>;

/// Every sensor reading keyed by room.
pub type SensorMap = BTreeMap<Room, SensorReading>;
