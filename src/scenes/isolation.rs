//! Failure isolation boundary
//!
//! Runs one scene or plugin call and turns both returned errors and panics
//! into a [`Failure`] carrying diagnostic text, so the caller can record it
//! and move on to the next target.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// A caught failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Full diagnostic text
    pub diagnostic: String,
    /// Whether the call panicked rather than returning an error
    pub panicked: bool,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.panicked {
            write!(f, "panicked: {}", self.diagnostic)
        } else {
            write!(f, "{}", self.diagnostic)
        }
    }
}

/// Run `call`, catching errors and panics
pub fn isolate<T, E, F>(call: F) -> Result<T, Failure>
where
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Failure {
            diagnostic: e.to_string(),
            panicked: false,
        }),
        Err(payload) => Err(Failure {
            diagnostic: panic_message(payload.as_ref()),
            panicked: true,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Print a failure framed the way the dispatcher reports it
pub(crate) fn report(target: &str, call: &str, failure: &Failure) {
    log::error!(
        "{}.{}() raised an exception >>>>\n{}\n<<<<<",
        target,
        call,
        failure
    );
}
