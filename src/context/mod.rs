//! Shared state passed to every scene and plugin call
//!
//! The context is one composite value with a typed section per concern:
//! - `engine` - current frame, clock, capture identity, exception log
//! - `game` - the per-session record, replaced wholesale on every reset
//! - `scenes` - scratch space, one slot per scene name
//! - `config` / `lobby` - opaque to the engine
//!
//! Scenes and plugins raise events through [`Context::call_plugins`] and
//! [`Context::call_plugins_later`]; the engine picks them up once the current
//! call returns.

mod exceptions;

pub use exceptions::{ExceptionLog, ExceptionRecord};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime};

use crate::capture::Frame;
use crate::engine::events::{Event, EventQueue};

/// Engine-owned section
#[derive(Debug, Clone, Default)]
pub struct EngineSection {
    /// Wall-clock time matching `msec == 0`, if registered
    pub epoch_time: Option<SystemTime>,
    /// Frame being analysed
    pub frame: Option<Frame>,
    /// Copy of the frame that preview plugins may draw on
    pub preview: Option<Frame>,
    /// Capture timestamp of `frame`, in milliseconds
    pub msec: Option<u64>,
    /// Name of the capture source
    pub input_class: Option<String>,
    /// Whether the presence scene saw the in-game timer on this frame
    pub in_game: bool,
    /// Scene failures since the last reset
    pub exceptions_log: ExceptionLog,
}

/// Per-session record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSection {
    pub map: Option<String>,
    pub rule: Option<String>,
    pub won: Option<bool>,
    pub players: Option<Vec<serde_json::Value>>,

    pub kills: u32,
    pub dead: bool,
    /// Reason -> number of deaths
    pub death_reasons: BTreeMap<String, u32>,

    pub inkling_state: [Option<serde_json::Value>; 2],
    pub lives_track: Vec<serde_json::Value>,
    pub tower_track: Vec<serde_json::Value>,

    /// Wall-clock start and end of the session
    pub start_time: Option<SystemTime>,
    pub end_time: Option<SystemTime>,
    /// Start and end expressed on the `engine.msec` clock
    pub start_offset_msec: Option<u64>,
    pub end_offset_msec: Option<u64>,
}

impl GameSection {
    /// A session is open once a scene has stamped its start
    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }
}

/// Scratch space, keyed by scene name
#[derive(Debug, Clone, Default)]
pub struct SceneScratch {
    slots: HashMap<String, serde_json::Value>,
}

impl SceneScratch {
    /// Mutable slot for `scene`, created as `null` on first use
    pub fn slot(&mut self, scene: &str) -> &mut serde_json::Value {
        self.slots
            .entry(scene.to_string())
            .or_insert(serde_json::Value::Null)
    }

    pub fn get(&self, scene: &str) -> Option<&serde_json::Value> {
        self.slots.get(scene)
    }

    pub fn remove(&mut self, scene: &str) -> Option<serde_json::Value> {
        self.slots.remove(scene)
    }
}

/// Events raised during a call, waiting for the engine to pick them up
#[derive(Debug, Clone, Default)]
pub(crate) struct Outbox {
    pub(crate) immediate: EventQueue,
    pub(crate) deferred: EventQueue,
}

/// State tree shared by the engine, its scenes and its plugins
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub engine: EngineSection,
    pub game: GameSection,
    pub scenes: SceneScratch,
    pub config: serde_json::Value,
    pub lobby: serde_json::Value,
    pub(crate) outbox: Outbox,
}

impl Context {
    /// Create a context with every section at its defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an event for delivery as soon as the current call returns
    pub fn call_plugins(&mut self, event: Event) {
        self.outbox.immediate.push(event);
    }

    /// Queue an event for delivery after this frame's scenes have all run
    pub fn call_plugins_later(&mut self, event: Event) {
        self.outbox.deferred.push(event);
    }

    /// Number of events waiting for the end-of-frame flush
    pub fn pending_later(&self) -> usize {
        self.outbox.deferred.len()
    }

    /// Current wall-clock time as seen by the stream
    ///
    /// With a registered epoch this is `epoch + msec`, so recorded material
    /// gets timestamps from when it was captured. Otherwise the system clock.
    pub fn wall_time(&self) -> SystemTime {
        match self.engine.epoch_time {
            Some(epoch) => epoch + Duration::from_millis(self.engine.msec.unwrap_or(0)),
            None => SystemTime::now(),
        }
    }

    /// Stamp the end of the session unless a scene already did
    pub(crate) fn finalize_end_time(&mut self) {
        if self.game.end_time.is_none() {
            self.game.end_time = Some(self.wall_time());
            self.game.end_offset_msec = self.engine.msec;
        }
    }
}
