mod settings;

pub use settings::{Home, Iot, Llm, LlmMode, Logger, Sensors, Server, Settings, Simulation};
