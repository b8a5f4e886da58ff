//! Capture source abstraction.
//!
//! A capture loop owns exactly one [`FrameSource`] for the lifetime of a
//! running period. Sources are opened through a [`SourceOpener`] so the same
//! opener can cold-start a fresh source on every start/resume.

use crate::error::CaptureError;
use crate::frame::Frame;

/// A blocking stream of raw frames.
pub trait FrameSource: Send {
    /// Pulls the next frame.
    ///
    /// Returns `Ok(None)` when the read timeout elapsed without traffic, so
    /// callers get a chance to observe their stop signal between frames.
    /// Any `Err` is terminal for this source.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Opens frame sources for a named interface (or the default one).
pub trait SourceOpener: Send + Sync {
    fn open(&self, interface: Option<&str>) -> Result<Box<dyn FrameSource>, CaptureError>;
}
