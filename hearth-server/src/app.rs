use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use rand::SeedableRng;
use rand::rngs::StdRng;
use time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::configs::Settings;
use crate::handles::*;
use crate::services::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        control_devices,
        get_devices,
        get_device_state,
        get_sensors,
        get_location_sensors,
        get_sensor_info,
        reset_simulation,
        execute_scene,
        get_scenes,
        process_text,
        health,
    ),
    components(schemas(
        hearth_api::models::RawCommand,
        hearth_api::models::ExecutionResult,
        hearth_api::models::ControlRequest,
        hearth_api::models::ControlResponse,
        hearth_api::models::SceneRequest,
        hearth_api::models::SceneResponse,
        hearth_api::models::ScenesResponse,
        hearth_api::models::ProcessTextRequest,
        hearth_api::models::ProcessTextResponse,
        hearth_api::message::ServerEvent,
        hearth_api::message::ClientMessage,
    )),
    tags(
        (name = "device", description = "Device control and state"),
        (name = "sensor", description = "Room sensor readings"),
        (name = "scene", description = "Scene modes"),
        (name = "assistant", description = "Natural language pipeline"),
        (name = "system", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Long-lived services shared by every router.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub store: Arc<DeviceStore>,
    pub broadcast: Arc<BroadcastService>,
    pub executor: Arc<CommandExecutor>,
    pub scenes: Arc<SceneService>,
    pub coordinator: Arc<CoordinatorService>,
    pub timers: Arc<TimerService>,
    pub simulation: Arc<SimulationService>,
}

impl AppContext {
    pub fn new(settings: &Arc<Settings>) -> anyhow::Result<Self> {
        let oracle = oracle::from_settings(&settings.llm)?;
        Self::with_oracle(settings, oracle)
    }

    pub fn with_oracle(settings: &Arc<Settings>, oracle: Arc<dyn Oracle>) -> anyhow::Result<Self> {
        let freshness = Duration::seconds(settings.sensors.freshness_secs as i64);
        let store = Arc::new(DeviceStore::new());
        let broadcast = Arc::new(BroadcastService::new());
        let executor = Arc::new(CommandExecutor::new(store.clone(), broadcast.clone(), freshness));
        let scenes = Arc::new(SceneService::new(executor.clone(), broadcast.clone()));

        let control: Arc<dyn DeviceControl> = match &settings.iot.endpoint {
            Some(endpoint) => {
                tracing::info!("Relaying device commands to {}", endpoint);
                Arc::new(RemoteDeviceControl::new(
                    endpoint,
                    std::time::Duration::from_secs(settings.iot.timeout_secs),
                )?)
            }
            None => Arc::new(LocalDeviceControl::new(executor.clone(), store.clone())),
        };

        let intents = Arc::new(IntentService::new(
            oracle.clone(),
            settings.llm.extraction_temperature,
            settings.llm.max_tokens,
        )?);
        let coordinator = Arc::new(CoordinatorService::new(
            intents,
            control,
            oracle,
            settings.home.default_location,
            settings.llm.response_temperature,
            settings.llm.max_tokens,
        ));

        let timers = Arc::new(TimerService::new(
            store.clone(),
            broadcast.clone(),
            Duration::seconds(settings.simulation.motion_hold_secs as i64),
            freshness,
        ));
        let simulation = Arc::new(SimulationService::new(
            store.clone(),
            broadcast.clone(),
            freshness,
            settings.simulation.utc_offset_hours,
            StdRng::from_entropy(),
        ));

        Ok(Self {
            settings: settings.clone(),
            store,
            broadcast,
            executor,
            scenes,
            coordinator,
            timers,
            simulation,
        })
    }
}

/// Periodic jobs that stop together on shutdown.
pub struct BackgroundTasks {
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn start(context: &AppContext) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let simulation = &context.settings.simulation;
        let mut handles = vec![context.timers.clone().spawn(
            std::time::Duration::from_secs(simulation.timer_sweep_secs.max(1)),
            stop_rx.clone(),
        )];

        if simulation.enabled {
            handles.push(context.simulation.clone().spawn(
                std::time::Duration::from_secs(simulation.tick_secs.max(1)),
                stop_rx,
            ));
        }

        tracing::info!("Started {} background tasks", handles.len());

        Self { stop_tx, handles }
    }

    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Background task ended abnormally: {}", e);
            }
        }
    }
}

pub fn create_app(context: &AppContext) -> Router {
    let control = control_router(ControlState {
        executor: context.executor.clone(),
        store: context.store.clone(),
    });

    let sensors = sensor_router(SensorState {
        store: context.store.clone(),
        broadcast: context.broadcast.clone(),
        freshness_secs: context.settings.sensors.freshness_secs,
    });

    let scenes = scene_router(SceneState {
        scenes: context.scenes.clone(),
    });

    let process = process_router(ProcessState {
        coordinator: context.coordinator.clone(),
    });

    let system = system_router(SystemState {
        broadcast: context.broadcast.clone(),
        settings: context.settings.clone(),
    });

    let ws = ws_router(WsState {
        store: context.store.clone(),
        executor: context.executor.clone(),
        broadcast: context.broadcast.clone(),
    });

    Router::new()
        .merge(control)
        .merge(sensors)
        .merge(scenes)
        .merge(process)
        .merge(system)
        .merge(ws)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
