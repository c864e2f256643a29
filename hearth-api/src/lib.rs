pub mod message;
pub mod models;

pub use message::*;
pub use models::*;
