//! The frame loop
//!
//! One iteration per frame: read, detect, check the watchdog, broadcast
//! preview hooks, collect the key code, then flush the events scenes
//! queued for after the pass.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use super::events::{names, Event};
use super::state::{EngineHandle, EngineStatus, LoopState, Shared};
use crate::capture::{CaptureSource, Frame};
use crate::config::EngineConfig;
use crate::context::{Context, GameSection};
use crate::error::{CaptureError, EngineError};
use crate::plugins::{self, KeyCode, Plugin};
use crate::scenes::{BoxedScene, Scene, ScenePipeline};
use crate::session::{SessionState, Watchdog};
use crate::Result;

/// Result of reading the next frame
enum FrameRead {
    /// The frame is stored in the context
    Ready,
    /// Stop was requested while waiting for a frame
    Stopped,
    EndOfStream,
}

/// Result of one frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Processed,
    Stopped,
    EndOfStream,
}

/// Real-time frame-analysis engine
///
/// Broadcast order is always: the engine itself, then every scene in
/// pipeline order, then the registered plugins in registration order.
pub struct Engine {
    config: EngineConfig,
    context: Context,
    pipeline: ScenePipeline,
    plugins: Vec<Box<dyn Plugin>>,
    capture: Option<Box<dyn CaptureSource>>,
    watchdog: Watchdog,
    shared: Arc<Shared>,
    stopped: bool,
    lost_sync: bool,
    resetting: bool,
    frames: u64,
}

impl Engine {
    /// Build the engine around an ordered scene list
    ///
    /// The engine starts paused; call [`Engine::pause`] with `false` (or
    /// use a handle) before [`Engine::run`].
    pub fn new(config: EngineConfig, scenes: Vec<BoxedScene>) -> Self {
        let mut pipeline = ScenePipeline::new(scenes);
        pipeline.set_strict(config.abort_at_scene_exception);
        pipeline.set_profile(config.enable_profile);

        if pipeline.position(&config.presence_scene).is_none() {
            log::warn!(
                "Presence scene {} is not in the pipeline; in_game stays false",
                config.presence_scene
            );
        }

        let watchdog = Watchdog::new(config.watchdog_result_ms, config.watchdog_gears_ms);
        let mut engine = Self {
            config,
            context: Context::new(),
            pipeline,
            plugins: Vec::new(),
            capture: None,
            watchdog,
            shared: Shared::new(),
            stopped: false,
            lost_sync: false,
            resetting: false,
            frames: 0,
        };
        engine.create_context();
        engine
    }

    // =========================================================================
    // Process-level operations
    // =========================================================================

    /// Register the capture source
    pub fn set_capture(&mut self, capture: Box<dyn CaptureSource>) {
        self.context.engine.input_class = Some(capture.name().to_string());
        self.capture = Some(capture);
    }

    /// Register the wall-clock time matching `msec == 0`
    pub fn set_epoch_time(&mut self, epoch_time: SystemTime) {
        self.context.engine.epoch_time = Some(epoch_time);
    }

    /// Replace the external plugin list
    pub fn set_plugins(&mut self, plugins: Vec<Box<dyn Plugin>>) {
        self.plugins = plugins;
    }

    /// Finalize the open session when the capture source runs dry
    pub fn set_close_session_at_eof(&mut self, enabled: bool) {
        self.config.close_session_at_eof = enabled;
    }

    /// Start accumulating per-scene timing
    pub fn enable_profile(&mut self) {
        self.config.enable_profile = true;
        self.pipeline.set_profile(true);
    }

    /// Stop accumulating per-scene timing
    pub fn disable_profile(&mut self) {
        self.config.enable_profile = false;
        self.pipeline.set_profile(false);
    }

    /// Pause or resume frame processing; does not affect a stopped engine
    pub fn pause(&mut self, pause: bool) {
        self.shared.paused.store(pause, Ordering::SeqCst);
        self.publish_status();
    }

    /// Check if frame processing is paused
    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    /// Broadcast `on_stop` and enter the terminal state
    ///
    /// Only the first call has any effect.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.call_plugins(Event::new(names::STOP));
        self.stopped = true;
        log::info!("Engine stopped");
        self.publish_status();
    }

    /// Check if the engine reached its terminal state
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Current loop state; stopped wins over paused
    pub fn state(&self) -> LoopState {
        if self.stopped {
            LoopState::Stopped
        } else if self.is_paused() {
            LoopState::Paused
        } else {
            LoopState::Running
        }
    }

    /// Handle for stopping or pausing from another thread
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: self.shared.clone(),
        }
    }

    /// Shared context, as scenes and plugins see it
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable context, e.g. to seed the `config` and `lobby` sections
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session close watchdog
    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    /// Session state derived from the watchdog and the game record
    pub fn session_state(&self) -> SessionState {
        self.watchdog.state(&self.context.game)
    }

    /// Look up a scene by name
    pub fn find_scene(&self, name: &str) -> Option<&dyn Scene> {
        self.pipeline.find(name)
    }

    /// Cumulative per-scene processing time
    pub fn scene_timings(&self) -> Vec<(String, Duration)> {
        self.pipeline.timings()
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    fn create_context(&mut self) {
        self.context = Context::new();
        self.reset();
    }

    /// Start over with an empty game record
    ///
    /// A lost sync raised while `on_game_reset` is being delivered is
    /// dropped: the session it would abort is already empty.
    pub fn reset(&mut self) {
        self.watchdog.clear();
        self.context.game = GameSection::default();

        let nested = std::mem::replace(&mut self.resetting, true);
        self.call_plugins(Event::new(names::GAME_RESET));
        self.resetting = nested;

        self.context.engine.exceptions_log.clear();
    }

    /// Finish the session normally
    pub fn session_close(&mut self) {
        self.watchdog.clear();
        self.context.finalize_end_time();
        log::info!("Session closed at {:?} ms", self.context.game.end_offset_msec);
        self.call_plugins(Event::new(names::SESSION_END));
        self.reset();
    }

    /// Give up on the session after losing continuity
    pub fn session_abort(&mut self) {
        self.watchdog.clear();
        self.context.finalize_end_time();
        log::info!("Session aborted at {:?} ms", self.context.game.end_offset_msec);
        self.call_plugins(Event::new(names::SESSION_ABORT));
        self.reset();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Broadcast an event now, then deliver whatever it raised
    pub fn call_plugins(&mut self, event: Event) {
        self.broadcast(&event);
        self.flush_immediate();
    }

    /// Queue an event for the end of the current frame
    pub fn call_plugins_later(&mut self, event: Event) {
        self.context.call_plugins_later(event);
    }

    fn broadcast(&mut self, event: &Event) {
        log::debug!("call plug-in hook ({})", event.name);
        self.handle_own_event(event);

        for scene in self.pipeline.scenes_mut() {
            plugins::deliver(scene.as_mut(), event, &mut self.context);
        }
        for plugin in self.plugins.iter_mut() {
            plugins::deliver(plugin.as_mut(), event, &mut self.context);
        }

        if self.lost_sync {
            self.lost_sync = false;
            if self.resetting {
                log::warn!("Lost sync raised during reset; ignored");
            } else {
                log::info!("Stream lost sync; aborting current session");
                self.session_abort();
            }
        }
    }

    /// The engine's own hooks; it is always the first recipient
    fn handle_own_event(&mut self, event: &Event) {
        let now = self.context.engine.msec.unwrap_or(0);
        match event.name.as_str() {
            names::GAME_INDIVIDUAL_RESULT => self.watchdog.on_individual_result(now),
            names::RESULT_GEARS => self.watchdog.on_result_gears(now),
            names::GAME_LOST_SYNC => self.lost_sync = true,
            _ => {}
        }
    }

    /// Deliver events raised through `Context::call_plugins`
    fn flush_immediate(&mut self) {
        let mut delivered = 0;
        while let Some(event) = self.context.outbox.immediate.pop() {
            if delivered >= self.config.max_chained_events {
                let dropped = self.context.outbox.immediate.clear() + 1;
                log::warn!(
                    "Dropped {} chained events after {}; event loop between plugins?",
                    dropped,
                    delivered
                );
                break;
            }
            self.broadcast(&event);
            delivered += 1;
        }
    }

    /// Deliver the events queued during this frame, oldest first
    fn flush_deferred(&mut self) {
        let mut delivered = 0;
        while let Some(event) = self.context.outbox.deferred.pop() {
            if delivered >= self.config.max_chained_events {
                let dropped = self.context.outbox.deferred.clear() + 1;
                log::warn!(
                    "Dropped {} deferred events after {}; event loop between plugins?",
                    dropped,
                    delivered
                );
                break;
            }
            self.call_plugins(event);
            delivered += 1;
        }
    }

    /// Ask every target for a key code; the last one returned wins
    ///
    /// `None` never clears a key returned by an earlier target, since every
    /// target without the hook answers `None` too.
    fn collect_key(&mut self) -> Option<KeyCode> {
        let mut key = None;
        for scene in self.pipeline.scenes_mut() {
            if let Some(k) = plugins::frame_next(scene.as_mut(), &mut self.context) {
                key = Some(k);
            }
        }
        for plugin in self.plugins.iter_mut() {
            if let Some(k) = plugins::frame_next(plugin.as_mut(), &mut self.context) {
                key = Some(k);
            }
        }
        key
    }

    fn dispatch_key(&mut self, key: Option<KeyCode>) {
        for scene in self.pipeline.scenes_mut() {
            plugins::key_press(scene.as_mut(), &mut self.context, key);
        }
        for plugin in self.plugins.iter_mut() {
            plugins::key_press(plugin.as_mut(), &mut self.context, key);
        }
    }

    // =========================================================================
    // Frame cycle
    // =========================================================================

    /// Consume a stop request from a handle, if any
    fn poll_stop_request(&mut self) -> bool {
        if self.shared.stop_requested.swap(false, Ordering::SeqCst) {
            self.stop();
        }
        self.stopped
    }

    fn read_once(&mut self) -> std::result::Result<Option<Frame>, CaptureError> {
        match self.capture.as_mut() {
            Some(capture) => capture.read_frame(),
            None => Err(CaptureError::EndOfStream),
        }
    }

    fn read_next_frame(&mut self) -> FrameRead {
        for _ in 0..self.config.skip_frames {
            if let Err(e) = self.read_once() {
                return Self::end_of_stream(e);
            }
        }

        let frame = loop {
            match self.read_once() {
                Ok(Some(frame)) => break frame,
                Ok(None) => {
                    self.call_plugins(Event::new(names::FRAME_READ_FAILED));
                    if self.poll_stop_request() {
                        return FrameRead::Stopped;
                    }
                    if self.config.read_retry_ms > 0 {
                        thread::sleep(Duration::from_millis(self.config.read_retry_ms));
                    }
                }
                Err(e) => return Self::end_of_stream(e),
            }
        };

        let msec = self
            .capture
            .as_ref()
            .map(|c| c.current_timestamp())
            .unwrap_or(0);
        self.context.engine.msec = Some(msec);
        self.context.engine.preview = Some(frame.clone());
        self.context.engine.frame = Some(frame);
        self.call_plugins(Event::new(names::DEBUG_READ_NEXT_FRAME));

        FrameRead::Ready
    }

    fn end_of_stream(e: CaptureError) -> FrameRead {
        match e {
            CaptureError::EndOfStream => log::info!("Capture source reached end of stream"),
            CaptureError::Device(_) => log::error!("{}; treating as end of stream", e),
        }
        FrameRead::EndOfStream
    }

    /// Read and fully process one frame
    pub fn process_frame(&mut self) -> Result<FrameOutcome> {
        match self.read_next_frame() {
            FrameRead::Ready => {}
            FrameRead::Stopped => return Ok(FrameOutcome::Stopped),
            FrameRead::EndOfStream => return Ok(FrameOutcome::EndOfStream),
        }

        self.call_plugins(Event::new(names::FRAME_READ));

        let in_game = self
            .pipeline
            .detect(&self.config.presence_scene, &mut self.context)?;
        self.context.engine.in_game = in_game;
        self.flush_immediate();

        for index in 0..self.pipeline.len() {
            self.pipeline.process(index, &mut self.context)?;
            self.flush_immediate();
        }

        if let Some(now) = self.context.engine.msec {
            if self.watchdog.expired(now) {
                log::info!("Watchdog fired. Closing current session");
                self.session_close();
            }
        }

        self.call_plugins(Event::new(names::DRAW_PREVIEW));
        self.call_plugins(Event::new(names::SHOW_PREVIEW));

        let key = self.collect_key();
        self.dispatch_key(key);
        self.flush_immediate();

        self.flush_deferred();

        self.frames += 1;
        self.publish_status();
        Ok(FrameOutcome::Processed)
    }

    fn finish_at_eof(&mut self) {
        if self.config.close_session_at_eof {
            if self.watchdog.is_armed() {
                log::info!("Closing current session at EOF");
                self.session_close();
            } else {
                self.session_abort();
            }
        }
        self.stopped = true;
    }

    fn main_loop(&mut self) -> Result<()> {
        while !self.stopped {
            if self.poll_stop_request() {
                break;
            }
            if self.is_paused() {
                self.publish_status();
                thread::sleep(Duration::from_millis(self.config.pause_poll_ms));
                continue;
            }

            match self.process_frame()? {
                FrameOutcome::Processed | FrameOutcome::Stopped => {}
                FrameOutcome::EndOfStream => self.finish_at_eof(),
            }
        }
        Ok(())
    }

    /// Drive frames until stopped
    ///
    /// On exit, whatever the reason, the capture source is closed, the
    /// profile is dumped if enabled and the exception log is printed. Only
    /// strict mode makes this return an error.
    pub fn run(&mut self) -> Result<()> {
        if self.capture.is_none() {
            return Err(EngineError::NoCapture);
        }
        log::info!(
            "Engine running: {} scenes, {} plugins",
            self.pipeline.len(),
            self.plugins.len()
        );

        let result = self.main_loop();

        if let Some(mut capture) = self.capture.take() {
            capture.close();
        }
        if self.config.enable_profile {
            self.pipeline.dump_profile();
        }
        self.context.engine.exceptions_log.dump();
        self.publish_status();

        if let Err(ref e) = result {
            log::error!("Engine terminated: {}", e);
        }
        result
    }

    fn publish_status(&self) {
        let status = EngineStatus {
            state: self.state(),
            frames: self.frames,
            msec: self.context.engine.msec,
            session: self.session_state(),
            failing_scenes: self.context.engine.exceptions_log.len(),
        };
        *self.shared.status.lock() = status;
    }
}
