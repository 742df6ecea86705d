pub mod resolver;
pub mod store;

pub use resolver::PresenceResolver;
pub use store::{PresenceOrigin, PresenceRecord, PresenceStore};
