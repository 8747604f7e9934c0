pub mod client;
pub mod messages;

pub use client::{NatsClient, NatsProgressSink};
pub use messages::ProgressMessage;
