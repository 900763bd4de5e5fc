//! Scene detectors and the ordered pipeline that runs them
//!
//! A scene looks at the current frame and context, remembers whatever it
//! needs across frames, writes its findings into the context and raises
//! events. Scenes are plugins too, so they hear every broadcast.
//!
//! The pipeline runs scenes in registration order. Later scenes may rely on
//! fields earlier ones set, so the order never changes during a run.

pub mod isolation;

use std::time::{Duration, Instant};

use crate::context::Context;
use crate::error::{EngineError, SceneError};
use crate::plugins::Plugin;
use isolation::{isolate, report, Failure};

/// A named, stateful detector
pub trait Scene: Plugin {
    /// Prepare for a new frame
    fn new_frame(&mut self, _ctx: &mut Context) -> Result<(), SceneError> {
        Ok(())
    }

    /// Inspect the current frame; returns whether the scene matched
    fn match_frame(&mut self, ctx: &mut Context) -> Result<bool, SceneError>;
}

/// Boxed scene type
pub type BoxedScene = Box<dyn Scene>;

struct PipelineEntry {
    scene: BoxedScene,
    took: Duration,
}

/// Ordered list of scenes with failure isolation and optional timing
pub struct ScenePipeline {
    entries: Vec<PipelineEntry>,
    strict: bool,
    profile: bool,
}

impl ScenePipeline {
    /// Create a pipeline; scenes run in the order given
    pub fn new(scenes: Vec<BoxedScene>) -> Self {
        Self {
            entries: scenes
                .into_iter()
                .map(|scene| PipelineEntry {
                    scene,
                    took: Duration::ZERO,
                })
                .collect(),
            strict: false,
            profile: false,
        }
    }

    /// Propagate scene failures instead of recording them
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Accumulate per-scene processing time
    pub fn set_profile(&mut self, profile: bool) {
        self.profile = profile;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scene names in run order
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.scene.name().to_string())
            .collect()
    }

    /// Position of the scene with this name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.scene.name() == name)
    }

    /// Look up a scene by name
    pub fn find(&self, name: &str) -> Option<&dyn Scene> {
        self.entries
            .iter()
            .find(|e| e.scene.name() == name)
            .map(|e| e.scene.as_ref())
    }

    /// Mutable access to every scene, in run order
    pub(crate) fn scenes_mut(&mut self) -> impl Iterator<Item = &mut BoxedScene> {
        self.entries.iter_mut().map(|e| &mut e.scene)
    }

    /// Run `new_frame` then `match_frame` for the scene at `index`
    ///
    /// A failure is logged and counted in the exception log; the caller
    /// moves on to the next scene. In strict mode it is returned instead.
    pub fn process(&mut self, index: usize, ctx: &mut Context) -> Result<(), EngineError> {
        let Some(entry) = self.entries.get_mut(index) else {
            return Ok(());
        };
        let started = self.profile.then(Instant::now);
        let scene = &mut entry.scene;
        let outcome = isolate(|| -> Result<(), SceneError> {
            scene.new_frame(ctx)?;
            scene.match_frame(ctx).map(|_| ())
        });
        if let Some(started) = started {
            entry.took += started.elapsed();
        }

        match outcome {
            Ok(()) => Ok(()),
            Err(failure) => Self::record(entry.scene.name(), failure, ctx, self.strict),
        }
    }

    /// Ask the scene called `name` whether it matches this frame
    ///
    /// Only `match_frame` runs. A missing or failing scene yields `false`.
    pub fn detect(&mut self, name: &str, ctx: &mut Context) -> Result<bool, EngineError> {
        let Some(index) = self.position(name) else {
            return Ok(false);
        };
        let entry = &mut self.entries[index];
        let scene = &mut entry.scene;
        match isolate(|| scene.match_frame(ctx)) {
            Ok(matched) => Ok(matched),
            Err(failure) => {
                Self::record(entry.scene.name(), failure, ctx, self.strict)?;
                Ok(false)
            }
        }
    }

    fn record(name: &str, failure: Failure, ctx: &mut Context, strict: bool) -> Result<(), EngineError> {
        if strict {
            return Err(EngineError::SceneFailed {
                scene: name.to_string(),
                diagnostic: failure.to_string(),
            });
        }
        report(name, "match", &failure);
        ctx.engine.exceptions_log.append(name, failure.to_string());
        Ok(())
    }

    /// Cumulative time spent in each scene
    pub fn timings(&self) -> Vec<(String, Duration)> {
        self.entries
            .iter()
            .map(|e| (e.scene.name().to_string(), e.took))
            .collect()
    }

    /// Log cumulative per-scene timing
    pub fn dump_profile(&self) {
        for (name, took) in self.timings() {
            log::info!("{:>8.3}s {}", took.as_secs_f64(), name);
        }
    }
}
