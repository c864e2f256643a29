//! Simulated coupling between devices and room sensors, plus the ambient
//! drift applied on every simulation tick.

use hearth_api::models::{DeviceState, SensorReading, round_tenth};
use rand::Rng;
use rand::seq::SliceRandom;
use time::{Duration, OffsetDateTime};

/// Nudge a room's reading after one of its devices changed state.
pub fn apply_device_impact(reading: &mut SensorReading, state: &DeviceState, now: OffsetDateTime) {
    match state {
        DeviceState::Light(light) => {
            if light.status.is_on() {
                let brightness = f64::from(light.brightness);
                reading.light_level = reading
                    .light_level
                    .saturating_add(u32::from(light.brightness) * 5)
                    .min(1000);
                reading.temperature = round_tenth((reading.temperature + brightness * 0.01).min(35.0));
            } else {
                reading.light_level = reading.light_level.saturating_sub(200);
            }
        }
        DeviceState::Ac(ac) => {
            if ac.status.is_on() {
                let target = f64::from(ac.temperature);
                let current = reading.temperature;
                if current > target {
                    reading.temperature = (current - 0.5).max(target);
                } else if current < target {
                    reading.temperature = (current + 0.5).min(target);
                }
            }
        }
        DeviceState::ExhaustFan(fan) => {
            if fan.status.is_on() {
                reading.humidity = (reading.humidity - 5.0).max(30.0);
                reading.voc = reading.voc.saturating_sub(3).max(5);
                reading.co2 = reading.co2.saturating_sub(20).max(350);
            }
        }
        DeviceState::Fan(fan) => {
            if fan.status.is_on() {
                let cooled = reading.temperature - f64::from(fan.speed) * 0.3;
                reading.temperature = round_tenth(cooled.max(16.0));
            }
        }
        DeviceState::Curtain(curtain) => {
            if curtain.position > 50 {
                reading.light_level = reading.light_level.saturating_sub(100).max(50);
            } else {
                reading.light_level = reading.light_level.saturating_add(150).min(800);
            }
        }
    }

    reading.last_update = now;
}

/// One step of ambient drift for a room whose reading is simulated.
pub fn drift<R: Rng>(reading: &mut SensorReading, hour: u8, now: OffsetDateTime, rng: &mut R) {
    let target = if (6..=18).contains(&hour) {
        24.0 + rng.gen_range(-1.0..2.0)
    } else {
        22.0 + rng.gen_range(-1.0..1.0)
    };
    reading.temperature = round_tenth(reading.temperature + (target - reading.temperature) * 0.1);

    reading.humidity = round_tenth((reading.humidity + rng.gen_range(-2.0..2.0)).clamp(40.0, 80.0));

    let base_co2: f64 = if hour >= 22 || hour <= 6 { 400.0 } else { 450.0 };
    reading.co2 = (base_co2 + rng.gen_range(-20.0..40.0)).clamp(350.0, 1000.0).round() as u32;

    let voc = f64::from(reading.voc) + rng.gen_range(-2.0..3.0);
    reading.voc = voc.clamp(5.0, 50.0).round() as u32;

    reading.light_level = ambient_light(hour, rng);

    if rng.gen_bool(0.1) {
        reading.motion = true;
        reading.motion_since = Some(now);
    }

    reading.last_update = now;
}

/// Clear simulated motion older than `hold`. Returns whether anything changed.
pub fn expire_motion(reading: &mut SensorReading, hold: Duration, now: OffsetDateTime) -> bool {
    match reading.motion_since {
        Some(since) if now - since >= hold => {
            reading.motion = false;
            reading.motion_since = None;
            reading.last_update = now;
            true
        }
        _ => false,
    }
}

fn ambient_light<R: Rng>(hour: u8, rng: &mut R) -> u32 {
    let hour = f64::from(hour);
    let lux = match hour as u8 {
        6..=8 => 200.0 + hour * 50.0 + rng.gen_range(-50.0..50.0),
        9..=17 => {
            let weather = [0.7, 0.8, 0.9, 1.0, 1.1].choose(rng).copied().unwrap_or(1.0);
            (500.0 + rng.gen_range(-100.0..200.0)) * weather
        }
        18..=20 => (400.0 - (hour - 17.0) * 80.0 + rng.gen_range(-30.0..30.0)).max(50.0),
        _ => (50.0_f64 + rng.gen_range(-20.0..20.0)).max(10.0),
    };

    lux.round().max(0.0) as u32
}
