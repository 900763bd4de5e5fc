//! Capture source contract
//!
//! The engine never grabs frames itself. A [`CaptureSource`] hands it frames
//! and a millisecond clock; `Ok(None)` means "nothing yet, try again" while
//! `Err(CaptureError::EndOfStream)` ends the run.

use std::collections::VecDeque;

use crate::error::CaptureError;

/// One frame handed over by a capture source
///
/// The engine only stores and copies frames; decoding pixels is up to the
/// scenes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// RGBA, row-major
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Frame of a single colour, handy for replay material
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        Self::new(width, height, rgba.repeat(pixels))
    }
}

/// Source of frames for the engine
pub trait CaptureSource {
    /// Identifier stored in `engine.input_class`
    fn name(&self) -> &str;

    /// Read the next frame
    ///
    /// `Ok(None)` signals a transient gap, the engine retries after a delay.
    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Timestamp of the last frame read, in milliseconds since the source started
    fn current_timestamp(&self) -> u64;

    /// Release capture resources. Called once after the main loop exits.
    fn close(&mut self) {}
}

/// One scripted step of a [`FrameSequenceCapture`]
#[derive(Debug, Clone)]
pub enum ScriptedFrame {
    /// A frame stamped with the given time
    Frame { msec: u64, frame: Frame },
    /// A transient "not ready" gap
    NotReady,
    /// A device failure
    Fail(String),
}

/// Capture source replaying a fixed sequence of frames
///
/// Used for offline analysis of pre-recorded material and in tests. The
/// stream ends when the sequence is exhausted.
#[derive(Debug, Default)]
pub struct FrameSequenceCapture {
    name: String,
    steps: VecDeque<ScriptedFrame>,
    msec: u64,
    reads: usize,
    closed: bool,
}

impl FrameSequenceCapture {
    /// Create an empty sequence
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a sequence of frames spaced `interval_ms` apart, starting at 0
    pub fn from_frames(frames: Vec<Frame>, interval_ms: u64) -> Self {
        let mut capture = Self::new("FrameSequenceCapture");
        for (i, frame) in frames.into_iter().enumerate() {
            capture = capture.with_frame(i as u64 * interval_ms, frame);
        }
        capture
    }

    /// Append a frame
    pub fn with_frame(mut self, msec: u64, frame: Frame) -> Self {
        self.steps.push_back(ScriptedFrame::Frame { msec, frame });
        self
    }

    /// Append a transient gap
    pub fn with_gap(mut self) -> Self {
        self.steps.push_back(ScriptedFrame::NotReady);
        self
    }

    /// Append a device failure
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.steps.push_back(ScriptedFrame::Fail(message.into()));
        self
    }

    /// Number of `read_frame` calls so far
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl CaptureSource for FrameSequenceCapture {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        self.reads += 1;
        match self.steps.pop_front() {
            Some(ScriptedFrame::Frame { msec, frame }) => {
                self.msec = msec;
                Ok(Some(frame))
            }
            Some(ScriptedFrame::NotReady) => Ok(None),
            Some(ScriptedFrame::Fail(message)) => Err(CaptureError::Device(message)),
            None => Err(CaptureError::EndOfStream),
        }
    }

    fn current_timestamp(&self) -> u64 {
        self.msec
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_frame_layout() {
        let frame = Frame::filled(3, 2, [1, 2, 3, 255]);
        assert_eq!(frame.data.len(), 3 * 2 * 4);
        assert_eq!(&frame.data[20..24], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_filled_frame_with_wide_empty_row() {
        let frame = Frame::filled(u32::MAX, 0, [9; 4]);
        assert!(frame.data.is_empty());
    }

    #[test]
    fn test_sequence_replay() {
        let mut capture = FrameSequenceCapture::new("test")
            .with_gap()
            .with_frame(40, Frame::filled(1, 1, [0; 4]));

        assert_eq!(capture.read_frame(), Ok(None));
        assert!(capture.read_frame().unwrap().is_some());
        assert_eq!(capture.current_timestamp(), 40);
        assert_eq!(capture.read_frame(), Err(CaptureError::EndOfStream));
        assert_eq!(capture.reads(), 3);
    }

    #[test]
    fn test_from_frames_spacing() {
        let frames = vec![Frame::default(), Frame::default(), Frame::default()];
        let mut capture = FrameSequenceCapture::from_frames(frames, 100);
        for expected in [0, 100, 200] {
            capture.read_frame().unwrap();
            assert_eq!(capture.current_timestamp(), expected);
        }
    }
}
