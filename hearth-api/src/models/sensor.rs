use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

/// Environmental reading of one room.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Air temperature in Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// CO2 concentration in ppm
    pub co2: u32,
    /// Volatile organic compounds index
    pub voc: u32,
    /// Whether motion is currently detected
    pub motion: bool,
    /// Illuminance in lux
    pub light_level: u32,
    /// Time of the last change, real or simulated
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
    /// Whether the reading came from hardware rather than the simulator
    #[serde(default)]
    pub real_data: bool,
    /// Time of the last hardware report
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_real_update: Option<OffsetDateTime>,
    /// Reporting source, e.g. `esp8266`
    #[serde(default)]
    pub source: Option<String>,
    /// Identifier of the reporting device
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(skip)]
    pub motion_since: Option<OffsetDateTime>,
}

impl SensorReading {
    pub fn new(
        temperature: f64,
        humidity: f64,
        co2: u32,
        voc: u32,
        light_level: u32,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            temperature,
            humidity,
            co2,
            voc,
            motion: false,
            light_level,
            last_update: now,
            real_data: false,
            last_real_update: None,
            source: None,
            device_id: None,
            motion_since: None,
        }
    }

    /// A hardware report younger than `window` takes precedence over simulation.
    pub fn is_real_and_fresh(&self, now: OffsetDateTime, window: Duration) -> bool {
        self.real_data
            && self
                .last_real_update
                .is_some_and(|updated| now - updated < window)
    }

    pub fn clear_provenance(&mut self) {
        self.real_data = false;
        self.last_real_update = None;
        self.source = None;
        self.device_id = None;
    }

    /// Overwrite the fields present in `update` and stamp the reading as real.
    pub fn apply_update(&mut self, update: &SensorUpdate, now: OffsetDateTime) {
        if let Some(temperature) = update.temperature {
            self.temperature = round_tenth(temperature);
        }
        if let Some(humidity) = update.humidity {
            self.humidity = round_tenth(humidity);
        }
        if let Some(co2) = update.co2 {
            self.co2 = co2;
        }
        if let Some(voc) = update.voc {
            self.voc = voc;
        }
        if let Some(light_level) = update.light_level {
            self.light_level = light_level;
        }
        if let Some(motion) = update.motion {
            self.motion = motion;
        }
        self.motion_since = None;

        self.real_data = true;
        self.last_real_update = Some(now);
        self.last_update = now;
        self.source = Some(update.source.clone());
        self.device_id = Some(update.device_id.clone());
    }
}

/// Brightest illuminance a hardware report may store, roughly direct sunlight.
pub const MAX_LIGHT_LEVEL: u32 = 150_000;

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Partial reading reported by a hardware sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorUpdate {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<u32>,
    pub voc: Option<u32>,
    pub light_level: Option<u32>,
    pub motion: Option<bool>,
    pub source: String,
    pub device_id: String,
}

impl SensorUpdate {
    /// Pick the known fields out of loosely-typed parameters. Values of the
    /// wrong type are ignored.
    pub fn from_parameters(parameters: &Map<String, Value>) -> Self {
        let float = |key: &str| {
            parameters
                .get(key)
                .and_then(Value::as_f64)
                .filter(|value| value.is_finite())
        };
        let count = |key: &str| float(key).map(|value| value.round().max(0.0) as u32);
        let label = |key: &str| {
            parameters
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };

        Self {
            temperature: float("temperature"),
            humidity: float("humidity"),
            co2: count("co2"),
            voc: count("voc"),
            light_level: count("light_level").map(|lux| lux.min(MAX_LIGHT_LEVEL)),
            motion: parameters.get("motion").and_then(Value::as_bool),
            source: label("source"),
            device_id: label("device_id"),
        }
    }
}
