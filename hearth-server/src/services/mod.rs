pub mod broadcast_service;
pub mod command_executor;
pub mod command_validator;
pub mod coordinator_service;
pub mod device_control;
pub mod device_store;
pub mod environment;
pub mod intent_service;
pub mod oracle;
pub mod scene_service;
pub mod simulation_service;
pub mod timer_service;

pub use broadcast_service::BroadcastService;
pub use command_executor::CommandExecutor;
pub use coordinator_service::CoordinatorService;
pub use device_control::{DeviceControl, LocalDeviceControl, RemoteDeviceControl};
pub use device_store::DeviceStore;
pub use intent_service::IntentService;
pub use oracle::Oracle;
pub use scene_service::SceneService;
pub use simulation_service::SimulationService;
pub use timer_service::TimerService;
