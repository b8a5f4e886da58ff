//! nosa‑capture
//!
//! The capture primitive used by the nosa engine: a blocking, timeout-driven
//! source of raw link-layer frames.
//!
//! - [`PcapOpener`] opens live captures through libpcap.
//! - [`ChannelOpener`] feeds frames from an in-process channel, used for
//!   replaying prepared traffic and for driving the engine in tests.

pub mod capture;
pub mod channel;
pub mod error;
pub mod frame;
pub mod source;

pub use capture::{list_interfaces, InterfaceInfo, PcapOpener, PcapSettings};
pub use channel::ChannelOpener;
pub use error::CaptureError;
pub use frame::{Frame, LinkKind};
pub use source::{FrameSource, SourceOpener};
