//! Error types for the engine and its collaborators

use thiserror::Error;

/// Result type used throughout the engine
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to the caller of the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration could not be parsed
    #[error("Invalid engine configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A detector failed while strict mode was enabled
    #[error("Scene {scene} raised an exception:\n{diagnostic}")]
    SceneFailed { scene: String, diagnostic: String },

    /// `run()` was called before a capture source was registered
    #[error("No capture source registered")]
    NoCapture,
}

/// Failure raised by a scene detector
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SceneError {
    pub message: String,
}

impl SceneError {
    /// Create an error from a message
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its source chain in the message
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::msg(describe_chain(err))
    }
}

/// Failure raised by a plugin hook
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PluginError {
    pub message: String,
}

impl PluginError {
    /// Create an error from a message
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its source chain in the message
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::msg(describe_chain(err))
    }
}

/// Failure reported by a capture source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The source has no more frames
    #[error("End of stream")]
    EndOfStream,

    /// The capture device failed; the stream cannot continue
    #[error("Capture device error: {0}")]
    Device(String),
}

/// Render an error and all of its sources, one per line
pub(crate) fn describe_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str("\ncaused by: ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_scene_error_keeps_source_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        let scene = SceneError::from_error(&err);
        assert_eq!(scene.message, "outer\ncaused by: inner");
    }

    #[test]
    fn test_scene_failed_display() {
        let err = EngineError::SceneFailed {
            scene: "GameKill".to_string(),
            diagnostic: "boom".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("GameKill"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_capture_error_display() {
        assert_eq!(CaptureError::EndOfStream.to_string(), "End of stream");
        assert!(CaptureError::Device("unplugged".into())
            .to_string()
            .contains("unplugged"));
    }
}
