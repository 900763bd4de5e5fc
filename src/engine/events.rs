//! Events broadcast to plugins

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Well-known event names raised by the engine itself
pub mod names {
    pub const FRAME_READ: &str = "on_frame_read";
    pub const FRAME_READ_FAILED: &str = "on_frame_read_failed";
    pub const DEBUG_READ_NEXT_FRAME: &str = "on_debug_read_next_frame";
    pub const GAME_RESET: &str = "on_game_reset";
    pub const SESSION_END: &str = "on_game_session_end";
    pub const SESSION_ABORT: &str = "on_game_session_abort";
    pub const STOP: &str = "on_stop";
    pub const DRAW_PREVIEW: &str = "on_draw_preview";
    pub const SHOW_PREVIEW: &str = "on_show_preview";

    /// Raised by result detectors; arms the session watchdog
    pub const GAME_INDIVIDUAL_RESULT: &str = "on_game_individual_result";
    /// Raised by result detectors; tightens an armed watchdog
    pub const RESULT_GEARS: &str = "on_result_gears";
    /// Raised when the stream loses continuity; aborts the session
    pub const GAME_LOST_SYNC: &str = "on_game_lost_sync";
}

/// A named event with optional parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Event {
    /// Create an event without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
        }
    }

    /// Create an event carrying parameters
    pub fn with_params(name: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            params: Some(params),
        }
    }

    /// Check the event name
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

/// FIFO of events waiting for delivery
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event at the back
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Take the oldest event
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every pending event, returning how many were discarded
    pub fn clear(&mut self) -> usize {
        let count = self.events.len();
        self.events.clear();
        count
    }
}
