//! Wire messages, command vocabulary and response formatting

mod command;
pub mod constants;
mod messages;
mod response;

pub use command::Command;
pub use messages::ProtocolMessage;
pub use response::{format_response, DeviceResponse};
