//! Plugin that forwards every event to registered closures

use super::{Hook, HookResult, Plugin};
use crate::context::Context;
use crate::engine::events::Event;

/// Callback type for broadcast events
pub type EventCallback = Box<dyn Fn(&Event, &Context) + Send + Sync>;

/// Event forwarder with any number of listeners
pub struct CallbackPlugin {
    name: String,
    callbacks: Vec<EventCallback>,
}

impl CallbackPlugin {
    /// Create a forwarder without listeners
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            callbacks: Vec::new(),
        }
    }

    /// Add a listener
    pub fn listen<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Event, &Context) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Check if there are any listeners
    pub fn has_listeners(&self) -> bool {
        !self.callbacks.is_empty()
    }
}

impl Plugin for CallbackPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&mut self, event: &Event, ctx: &mut Context) -> HookResult {
        if self.callbacks.is_empty() {
            return Ok(Hook::NotImplemented);
        }
        for callback in &self.callbacks {
            callback(event, ctx);
        }
        Ok(Hook::Handled)
    }
}
