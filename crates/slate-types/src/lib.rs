//! Shared types for the Slate whiteboard backend.

mod board;
mod ws;

pub use board::*;
pub use ws::*;
