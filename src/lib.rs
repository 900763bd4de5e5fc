//! IkaLog engine
//!
//! A real-time frame-analysis engine. It pulls frames from a capture source,
//! runs an ordered pipeline of scene detectors over a shared context, tracks
//! the lifecycle of a game session and broadcasts state changes to output
//! plugins. A failing scene or plugin never halts the stream.
//!
//! # Example
//!
//! ```ignore
//! use ika_engine::{Engine, EngineConfig, FrameSequenceCapture};
//!
//! let config = EngineConfig::load("engine.toml")?;
//! let mut engine = Engine::new(config, scenes);
//! engine.set_capture(Box::new(FrameSequenceCapture::from_frames(frames, 33)));
//! engine.set_plugins(vec![Box::new(stats_plugin)]);
//! engine.pause(false);
//! engine.run()?;
//! ```

pub mod capture;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod plugins;
pub mod scenes;
pub mod session;

// Re-export commonly used types
pub use capture::{CaptureSource, Frame, FrameSequenceCapture};
pub use config::EngineConfig;
pub use context::{Context, ExceptionLog, GameSection};
pub use engine::{names, Engine, EngineHandle, EngineStatus, Event, EventQueue, FrameOutcome, LoopState};
pub use error::{CaptureError, EngineError, PluginError, Result, SceneError};
pub use plugins::{CallbackPlugin, Hook, HookResult, KeyCode, Plugin};
pub use scenes::{BoxedScene, Scene, ScenePipeline};
pub use session::{SessionState, Watchdog};
