//! Loop state, status snapshot and the cross-thread control handle

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::session::SessionState;

/// State of the main loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    /// Idle, polling for unpause
    Paused,
    /// Processing frames
    Running,
    /// Terminal
    Stopped,
}

/// Snapshot of the engine, refreshed once per loop iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: LoopState,
    /// Frames fully processed since construction
    pub frames: u64,
    /// Timestamp of the last frame read
    pub msec: Option<u64>,
    pub session: SessionState,
    /// Scenes with recorded failures since the last reset
    pub failing_scenes: usize,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            state: LoopState::Paused,
            frames: 0,
            msec: None,
            session: SessionState::Closed,
            failing_scenes: 0,
        }
    }
}

/// Flags shared between the engine and its handles
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) paused: AtomicBool,
    pub(crate) stop_requested: AtomicBool,
    pub(crate) status: Mutex<EngineStatus>,
}

impl Shared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            paused: AtomicBool::new(true),
            stop_requested: AtomicBool::new(false),
            status: Mutex::new(EngineStatus::default()),
        })
    }
}

/// Clonable handle for controlling a running engine from another thread
///
/// Requests are picked up cooperatively: once per loop iteration and
/// between capture retries. Work in flight finishes its current step.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    pub(crate) shared: Arc<Shared>,
}

impl EngineHandle {
    /// Ask the loop to stop
    pub fn stop(&self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Pause or resume frame processing
    pub fn pause(&self, pause: bool) {
        self.shared.paused.store(pause, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Latest status snapshot
    pub fn status(&self) -> EngineStatus {
        self.shared.status.lock().clone()
    }
}
