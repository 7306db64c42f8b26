//! Core session routing for the Slate whiteboard backend: board storage,
//! the synchronization-engine seam, the per-board session registry, the
//! serialized connection resolver, and the persistence throttle.

mod engine;
mod error;
mod registry;
mod resolver;
mod session;
mod store;
mod throttle;

pub use engine::{ChangeCallback, ClientSocket, RelayEngine, SessionHandle, SyncEngine};
pub use error::SlateError;
pub use registry::{spawn_sweeper, SessionRegistry};
pub use resolver::Resolver;
pub use session::{LiveSession, SessionFactory};
pub use store::BoardStore;
pub use throttle::PersistenceThrottle;

/// Result type for Slate operations.
pub type Result<T> = std::result::Result<T, SlateError>;
