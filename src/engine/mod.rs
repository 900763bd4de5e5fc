//! Engine core
//!
//! - `Engine` - drives the frame loop and owns the pipeline, plugins and context
//! - `EngineHandle` / `EngineStatus` - cross-thread control and status snapshot
//! - `Event` / `EventQueue` - what gets broadcast, and the per-frame deferral queue

pub mod events;
mod runner;
mod state;

pub use events::{names, Event, EventQueue};
pub use runner::{Engine, FrameOutcome};
pub use state::{EngineHandle, EngineStatus, LoopState};
