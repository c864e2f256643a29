mod event;
mod request;

pub use event::ServerEvent;
pub use request::ClientMessage;
