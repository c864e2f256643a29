use hearth_api::models::{DeviceCommand, DeviceKind, RawCommand, Room, ValidatedCommand};
use serde_json::Value;

use crate::errors::DeviceError;

/// Normalize a raw command and check it against the room topology.
///
/// An unknown or missing location is replaced by `default_location` when one
/// is given, otherwise it is an error.
pub fn validate(
    raw: &RawCommand,
    default_location: Option<Room>,
) -> Result<ValidatedCommand, DeviceError> {
    if raw.device.trim().is_empty() || raw.action.trim().is_empty() {
        return Err(DeviceError::MissingFields);
    }

    let kind: DeviceKind = raw
        .device
        .parse()
        .map_err(|_| DeviceError::UnknownDevice(raw.device.trim().to_lowercase()))?;

    let requested = raw.location.as_deref().unwrap_or_default();
    let location = match (requested.parse::<Room>(), default_location) {
        (Ok(room), _) => room,
        (Err(_), Some(room)) => room,
        (Err(_), None) if requested.trim().is_empty() => return Err(DeviceError::MissingFields),
        (Err(_), None) => return Err(DeviceError::UnknownLocation(requested.to_string())),
    };

    if !location.has_device(kind) {
        return Err(DeviceError::NotInstalled {
            device: kind,
            location,
        });
    }

    let command = DeviceCommand::parse(kind, &raw.action, &raw.parameters())?;

    Ok(ValidatedCommand { location, command })
}

/// Validate a batch of loosely-typed commands, dropping each invalid entry on
/// its own so the rest of the batch survives.
pub fn validate_all(values: &[Value], default_location: Room) -> Vec<ValidatedCommand> {
    values
        .iter()
        .filter_map(|value| {
            let raw = match serde_json::from_value::<RawCommand>(value.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Dropping malformed command {}: {}", value, e);
                    return None;
                }
            };

            match validate(&raw, Some(default_location)) {
                Ok(command) => Some(command),
                Err(e) => {
                    tracing::warn!("Dropping command {}: {}", value, e);
                    None
                }
            }
        })
        .collect()
}
