//! Output plugins and event dispatch
//!
//! A plugin implements any subset of hooks. [`Plugin::on_event`] reports
//! whether it handled an event; when it returns [`Hook::NotImplemented`] the
//! dispatcher falls back to [`Plugin::on_uncaught_event`]. Every call goes
//! through the isolation boundary, so a failing plugin only loses its own
//! delivery.
//!
//! Two hooks have their own signatures and are dispatched separately:
//! [`Plugin::on_frame_next`] may return a key code for the frame and
//! [`Plugin::on_key_press`] receives it. Failures in those two are skipped
//! without a report.

mod callback;

pub use callback::{CallbackPlugin, EventCallback};

use crate::context::Context;
use crate::error::PluginError;
use crate::engine::events::Event;
use crate::scenes::isolation::{isolate, report};

/// Key code captured by a preview plugin
pub type KeyCode = i32;

/// Outcome of a hook that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Handled,
    NotImplemented,
}

/// Handled, not implemented, or failed
pub type HookResult = Result<Hook, PluginError>;

/// Recipient of broadcast events
pub trait Plugin {
    /// Name used in failure reports
    fn name(&self) -> &str;

    /// Handle a named event
    fn on_event(&mut self, _event: &Event, _ctx: &mut Context) -> HookResult {
        Ok(Hook::NotImplemented)
    }

    /// Receives every event `on_event` did not implement
    fn on_uncaught_event(&mut self, _event_name: &str, _ctx: &mut Context) -> HookResult {
        Ok(Hook::NotImplemented)
    }

    /// Called once per frame after preview; may return a key code
    fn on_frame_next(&mut self, _ctx: &mut Context) -> Result<Option<KeyCode>, PluginError> {
        Ok(None)
    }

    /// Receives the key code collected from `on_frame_next`
    fn on_key_press(
        &mut self,
        _ctx: &mut Context,
        _key: Option<KeyCode>,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Deliver one event to one target
///
/// `on_event` first; `on_uncaught_event` only when the target left the
/// event unimplemented. A failure in either is reported, never propagated.
pub(crate) fn deliver<T: Plugin + ?Sized>(target: &mut T, event: &Event, ctx: &mut Context) {
    log::trace!("Call {}.{}", target.name(), event.name);
    match isolate(|| target.on_event(event, ctx)) {
        Ok(Hook::Handled) => {}
        Ok(Hook::NotImplemented) => {
            if let Err(failure) = isolate(|| target.on_uncaught_event(&event.name, ctx)) {
                report(target.name(), "on_uncaught_event", &failure);
            }
        }
        Err(failure) => report(target.name(), &event.name, &failure),
    }
}

/// Ask one target for a key code; failures are skipped
pub(crate) fn frame_next<T: Plugin + ?Sized>(target: &mut T, ctx: &mut Context) -> Option<KeyCode> {
    match isolate(|| target.on_frame_next(ctx)) {
        Ok(key) => key,
        Err(failure) => {
            log::trace!("{}.on_frame_next skipped: {}", target.name(), failure);
            None
        }
    }
}

/// Hand the frame's key code to one target; failures are skipped
pub(crate) fn key_press<T: Plugin + ?Sized>(target: &mut T, ctx: &mut Context, key: Option<KeyCode>) {
    if let Err(failure) = isolate(|| target.on_key_press(ctx, key)) {
        log::trace!("{}.on_key_press skipped: {}", target.name(), failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Picky {
        handled: Vec<String>,
        uncaught: Vec<String>,
    }

    impl Plugin for Picky {
        fn name(&self) -> &str {
            "Picky"
        }

        fn on_event(&mut self, event: &Event, _ctx: &mut Context) -> HookResult {
            match event.name.as_str() {
                "on_game_start" => {
                    self.handled.push(event.name.clone());
                    Ok(Hook::Handled)
                }
                "on_game_killed" => Err(PluginError::msg("upload failed")),
                _ => Ok(Hook::NotImplemented),
            }
        }

        fn on_uncaught_event(&mut self, event_name: &str, _ctx: &mut Context) -> HookResult {
            self.uncaught.push(event_name.to_string());
            Ok(Hook::Handled)
        }
    }

    struct Silent;

    impl Plugin for Silent {
        fn name(&self) -> &str {
            "Silent"
        }
    }

    struct Panicky;

    impl Plugin for Panicky {
        fn name(&self) -> &str {
            "Panicky"
        }

        fn on_frame_next(&mut self, _ctx: &mut Context) -> Result<Option<KeyCode>, PluginError> {
            panic!("window closed")
        }
    }

    #[test]
    fn test_named_hook_wins_over_fallback() {
        let mut ctx = Context::new();
        let mut plugin = Picky::default();
        deliver(&mut plugin, &Event::new("on_game_start"), &mut ctx);
        assert_eq!(plugin.handled, vec!["on_game_start"]);
        assert!(plugin.uncaught.is_empty());
    }

    #[test]
    fn test_fallback_receives_unimplemented_event() {
        let mut ctx = Context::new();
        let mut plugin = Picky::default();
        deliver(&mut plugin, &Event::new("on_lobby_matched"), &mut ctx);
        assert_eq!(plugin.uncaught, vec!["on_lobby_matched"]);
    }

    #[test]
    fn test_failed_hook_does_not_fall_back() {
        let mut ctx = Context::new();
        let mut plugin = Picky::default();
        deliver(&mut plugin, &Event::new("on_game_killed"), &mut ctx);
        assert!(plugin.handled.is_empty());
        assert!(plugin.uncaught.is_empty());
    }

    #[test]
    fn test_plugin_without_hooks() {
        let mut ctx = Context::new();
        deliver(&mut Silent, &Event::new("on_stop"), &mut ctx);
        assert_eq!(frame_next(&mut Silent, &mut ctx), None);
    }

    #[test]
    fn test_frame_next_panic_is_skipped() {
        let mut ctx = Context::new();
        assert_eq!(frame_next(&mut Panicky, &mut ctx), None);
        key_press(&mut Panicky, &mut ctx, Some(27));
    }
}
