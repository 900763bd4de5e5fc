//! Session lifecycle and the close watchdog
//!
//! A session has no object of its own. It is open while the game record has
//! a start time, and it starts closing once a result screen arms the
//! watchdog. When the deadline passes the engine closes the session.

use serde::{Deserialize, Serialize};

use crate::context::GameSection;

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session in progress; the game record is empty
    Closed,
    /// A scene stamped a start time
    Open,
    /// Result data was seen; the session closes at `deadline`
    Closing { deadline: u64 },
}

/// Deadline-based auto-close timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchdog {
    deadline: Option<u64>,
    result_window_ms: u64,
    gears_window_ms: u64,
}

impl Watchdog {
    pub fn new(result_window_ms: u64, gears_window_ms: u64) -> Self {
        Self {
            deadline: None,
            result_window_ms,
            gears_window_ms,
        }
    }

    /// An individual result screen was seen: close in `result_window_ms`
    pub fn on_individual_result(&mut self, now: u64) {
        let deadline = now + self.result_window_ms;
        log::debug!("Session watchdog armed: closes at {} ms", deadline);
        self.deadline = Some(deadline);
    }

    /// Gears were seen: tighten an armed deadline to `gears_window_ms`
    ///
    /// Does nothing when the watchdog is not armed.
    pub fn on_result_gears(&mut self, now: u64) {
        if self.deadline.is_some() {
            let deadline = now + self.gears_window_ms;
            log::debug!("Session watchdog tightened: closes at {} ms", deadline);
            self.deadline = Some(deadline);
        }
    }

    /// Whether an armed deadline has been reached at `now`
    pub fn expired(&self, now: u64) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }

    /// Derive the session state from the watchdog and the game record
    pub fn state(&self, game: &GameSection) -> SessionState {
        match self.deadline {
            Some(deadline) => SessionState::Closing { deadline },
            None if game.is_started() => SessionState::Open,
            None => SessionState::Closed,
        }
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(20_000, 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    #[test]
    fn test_result_arms_twenty_seconds() {
        let mut wdt = Watchdog::default();
        wdt.on_individual_result(5_000);
        assert_eq!(wdt.deadline(), Some(25_000));
        assert!(!wdt.expired(24_999));
        assert!(wdt.expired(25_000));
    }

    #[test]
    fn test_gears_tighten_armed_deadline() {
        let mut wdt = Watchdog::default();
        wdt.on_individual_result(5_000);
        wdt.on_result_gears(8_000);
        assert_eq!(wdt.deadline(), Some(9_000));
        assert!(!wdt.expired(8_999));
        assert!(wdt.expired(9_000));
    }

    #[test]
    fn test_gears_without_result_is_noop() {
        let mut wdt = Watchdog::default();
        wdt.on_result_gears(8_000);
        assert_eq!(wdt.deadline(), None);
        assert!(!wdt.expired(u64::MAX));
    }

    #[test]
    fn test_later_result_rearms() {
        let mut wdt = Watchdog::default();
        wdt.on_individual_result(0);
        wdt.on_result_gears(1_000);
        wdt.on_individual_result(1_500);
        assert_eq!(wdt.deadline(), Some(21_500));
    }

    #[test]
    fn test_state_derivation() {
        let mut wdt = Watchdog::default();
        let mut game = GameSection::default();
        assert_eq!(wdt.state(&game), SessionState::Closed);

        game.start_time = Some(SystemTime::now());
        assert_eq!(wdt.state(&game), SessionState::Open);

        wdt.on_individual_result(100);
        assert_eq!(wdt.state(&game), SessionState::Closing { deadline: 20_100 });

        wdt.clear();
        assert_eq!(wdt.state(&GameSection::default()), SessionState::Closed);
    }
}
