pub mod controller;
pub mod session;

pub use controller::PlaybackController;
pub use session::PlaybackSession;
