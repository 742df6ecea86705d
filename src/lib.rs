pub mod common;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod player;
pub mod presence;
pub mod queue;
pub mod sources;
pub mod transport;

pub use common::errors::EngineError;
pub use common::types::{ChannelId, RoomId, UserId};
pub use engine::{Engine, Reply};
pub use queue::{PlaybackQueue, SourceKind, Track};
