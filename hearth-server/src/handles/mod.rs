mod control_handle;
mod process_handle;
mod scene_handle;
mod sensor_handle;
mod system_handle;
mod ws_handle;

pub use control_handle::*;
pub use process_handle::*;
pub use scene_handle::*;
pub use sensor_handle::*;
pub use system_handle::*;
pub use ws_handle::*;
