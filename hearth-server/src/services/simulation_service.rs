use std::sync::Arc;

use hearth_api::message::ServerEvent;
use rand::rngs::StdRng;
use time::{Duration, OffsetDateTime, UtcOffset};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::services::device_store::DeviceStore;
use crate::services::{BroadcastService, environment};

/// Periodic ambient drift of every simulated room reading.
pub struct SimulationService {
    store: Arc<DeviceStore>,
    broadcast: Arc<BroadcastService>,
    freshness: Duration,
    utc_offset: UtcOffset,
    rng: Mutex<StdRng>,
}

impl SimulationService {
    pub fn new(
        store: Arc<DeviceStore>,
        broadcast: Arc<BroadcastService>,
        freshness: Duration,
        utc_offset_hours: i8,
        rng: StdRng,
    ) -> Self {
        let utc_offset = UtcOffset::from_hms(utc_offset_hours, 0, 0).unwrap_or_else(|e| {
            tracing::warn!("Invalid UTC offset {}: {}, using UTC", utc_offset_hours, e);
            UtcOffset::UTC
        });

        Self {
            store,
            broadcast,
            freshness,
            utc_offset,
            rng: Mutex::new(rng),
        }
    }

    pub fn spawn(self: Arc<Self>, period: std::time::Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        tracing::info!("Stopping environment simulation");
                        break;
                    },
                    _ = interval.tick() => {
                        self.tick_at(OffsetDateTime::now_utc()).await;
                    }
                }
            }
        })
    }

    pub async fn tick_at(&self, now: OffsetDateTime) {
        let hour = now.to_offset(self.utc_offset).hour();
        let freshness = self.freshness;
        let mut rng = self.rng.lock().await;

        let sensors = self
            .store
            .update(|home| {
                for (room, reading) in home.sensors_mut() {
                    if reading.is_real_and_fresh(now, freshness) {
                        tracing::debug!("Preserving real sensor data for {}", room);
                        continue;
                    }

                    if reading.real_data {
                        tracing::info!("Real data for {} is stale, resuming simulation", room);
                        reading.real_data = false;
                    }

                    environment::drift(reading, hour, now, &mut *rng);
                }

                home.sensors().clone()
            })
            .await;

        for (room, reading) in sensors {
            self.broadcast
                .publish(ServerEvent::SensorUpdate {
                    location: room,
                    data: reading,
                    timestamp: now,
                })
                .await;
        }
    }
}
