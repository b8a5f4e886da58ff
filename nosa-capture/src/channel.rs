//! In-process frame source.
//!
//! Frames pushed into the paired [`Sender`] are handed out in order by every
//! source the opener creates. Once all senders are dropped and the queue is
//! drained, sources report [`CaptureError::Closed`].
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::error::CaptureError;
use crate::frame::Frame;
use crate::source::{FrameSource, SourceOpener};

/// Opens sources backed by a shared crossbeam channel.
#[derive(Debug, Clone)]
pub struct ChannelOpener {
    rx: Receiver<Frame>,
    poll: Duration,
}

impl ChannelOpener {
    /// Creates an unbounded opener and the sender that feeds it.
    pub fn new(poll: Duration) -> (Sender<Frame>, Self) {
        let (tx, rx) = channel::unbounded();
        (tx, Self { rx, poll })
    }
}

impl SourceOpener for ChannelOpener {
    fn open(&self, _interface: Option<&str>) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(ChannelSource {
            rx: self.rx.clone(),
            poll: self.poll,
        }))
    }
}

struct ChannelSource {
    rx: Receiver<Frame>,
    poll: Duration,
}

impl FrameSource for ChannelSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        match self.rx.recv_timeout(self.poll) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CaptureError::Closed),
        }
    }
}
