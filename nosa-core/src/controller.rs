//! # Capture lifecycle
//!
//! `Stopped → Running ⇄ Paused → Stopped`. Every running period owns one
//! capture thread with a freshly opened [`FrameSource`]; pausing tears the
//! thread down and resuming starts a new one.
//!
//! Commands serialize on the session mutex. The capture thread never takes
//! that mutex, so waiting for it to exit while holding the lock is safe. The
//! wait is bounded: a thread that does not exit within the shutdown timeout
//! is detached and reported.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use nosa_capture::{CaptureError, FrameSource, SourceOpener};
use nosa_telemetry::EventLogger;
use opentelemetry::KeyValue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::TransitionError;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Stopped,
    Running,
    Paused,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Interface to capture on; `None` picks the default device.
    pub interface: Option<String>,
    /// Upper bound on waiting for the capture thread to exit.
    pub shutdown_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            interface: None,
            shutdown_timeout: Duration::from_millis(2000),
        }
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub state: CaptureState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct Worker {
    stop: Arc<AtomicBool>,
    /// Disconnects when the thread exits.
    exited: Receiver<()>,
    handle: JoinHandle<Result<u64, CaptureError>>,
}

struct Session {
    state: CaptureState,
    started_at: Option<DateTime<Utc>>,
    worker: Option<Worker>,
    last_error: Option<String>,
}

pub struct CaptureController {
    opener: Arc<dyn SourceOpener>,
    pipeline: Pipeline,
    settings: ControllerSettings,
    session: Mutex<Session>,
}

impl CaptureController {
    pub fn new(
        opener: Arc<dyn SourceOpener>,
        pipeline: Pipeline,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            opener,
            pipeline,
            settings,
            session: Mutex::new(Session {
                state: CaptureState::Stopped,
                started_at: None,
                worker: None,
                last_error: None,
            }),
        }
    }

    pub fn start(&self) -> Result<(), TransitionError> {
        let mut session = self.session.lock();
        self.reap(&mut session);
        match session.state {
            CaptureState::Stopped => self.begin_session(&mut session),
            CaptureState::Running | CaptureState::Paused => Err(TransitionError::AlreadyRunning),
        }
    }

    pub fn stop(&self) -> Result<(), TransitionError> {
        let mut session = self.session.lock();
        self.reap(&mut session);
        match session.state {
            CaptureState::Running => {
                let processed = self.halt_worker(&mut session);
                session.state = CaptureState::Stopped;
                EventLogger::log_event(
                    "capture_stopped",
                    &[KeyValue::new("records", processed as i64)],
                );
                Ok(())
            }
            CaptureState::Paused => {
                session.state = CaptureState::Stopped;
                EventLogger::log_event("capture_stopped", &[KeyValue::new("from", "paused")]);
                Ok(())
            }
            CaptureState::Stopped => Err(TransitionError::NotRunning),
        }
    }

    pub fn pause(&self) -> Result<(), TransitionError> {
        let mut session = self.session.lock();
        self.reap(&mut session);
        match session.state {
            CaptureState::Running => {
                let processed = self.halt_worker(&mut session);
                session.state = CaptureState::Paused;
                EventLogger::log_event(
                    "capture_paused",
                    &[KeyValue::new("records", processed as i64)],
                );
                Ok(())
            }
            CaptureState::Paused | CaptureState::Stopped => Err(TransitionError::NotRunning),
        }
    }

    /// Resumes a paused capture. From `Stopped` this behaves like `start`.
    pub fn resume(&self) -> Result<(), TransitionError> {
        let mut session = self.session.lock();
        self.reap(&mut session);
        match session.state {
            CaptureState::Paused => {
                session.worker = Some(self.spawn_worker()?);
                session.state = CaptureState::Running;
                EventLogger::log_event("capture_resumed", &self.interface_attrs());
                Ok(())
            }
            CaptureState::Stopped => self.begin_session(&mut session),
            CaptureState::Running => Err(TransitionError::AlreadyRunning),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.view().state
    }

    pub fn view(&self) -> SessionView {
        let mut session = self.session.lock();
        self.reap(&mut session);
        SessionView {
            state: session.state,
            started_at: session.started_at,
            last_error: session.last_error.clone(),
        }
    }

    fn begin_session(&self, session: &mut Session) -> Result<(), TransitionError> {
        session.worker = Some(self.spawn_worker()?);
        session.state = CaptureState::Running;
        session.started_at = Some(Utc::now());
        session.last_error = None;
        EventLogger::log_event("capture_started", &self.interface_attrs());
        Ok(())
    }

    fn interface_attrs(&self) -> [KeyValue; 1] {
        let interface = self
            .settings
            .interface
            .clone()
            .unwrap_or_else(|| "default".to_string());
        [KeyValue::new("interface", interface)]
    }

    fn spawn_worker(&self) -> Result<Worker, TransitionError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (exit_tx, exited) = channel::bounded::<()>(0);

        let opener = Arc::clone(&self.opener);
        let pipeline = self.pipeline.clone();
        let interface = self.settings.interface.clone();
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("nosa-capture".into())
            .spawn(move || {
                let _exit = exit_tx;
                capture_loop(opener.as_ref(), interface.as_deref(), &pipeline, &flag)
            })?;

        Ok(Worker {
            stop,
            exited,
            handle,
        })
    }

    /// Signals the running worker and waits for it, bounded by the shutdown
    /// timeout. Returns the number of records it accepted, or 0 if unknown.
    fn halt_worker(&self, session: &mut Session) -> u64 {
        let Some(worker) = session.worker.take() else {
            return 0;
        };
        worker.stop.store(true, Ordering::Release);

        match worker.exited.recv_timeout(self.settings.shutdown_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                error!(
                    timeout_ms = self.settings.shutdown_timeout.as_millis() as u64,
                    "Capture thread did not exit in time, detaching dangling capture loop"
                );
                0
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                match Self::join(worker.handle) {
                    Ok(processed) => processed,
                    Err(reason) => {
                        warn!(error = %reason, "Capture thread failed before it was stopped");
                        session.last_error = Some(reason);
                        0
                    }
                }
            }
        }
    }

    /// Collects a worker that exited on its own and forces `Stopped`.
    fn reap(&self, session: &mut Session) {
        let finished = session
            .worker
            .as_ref()
            .is_some_and(|worker| worker.handle.is_finished());
        if !finished {
            return;
        }
        let Some(worker) = session.worker.take() else {
            return;
        };

        let reason = match Self::join(worker.handle) {
            Ok(processed) => {
                debug!(processed, "Capture thread exited");
                "capture loop exited".to_string()
            }
            Err(reason) => reason,
        };
        error!(error = %reason, "Capture stopped unexpectedly");
        EventLogger::log_event("capture_failed", &[KeyValue::new("error", reason.clone())]);
        session.state = CaptureState::Stopped;
        session.last_error = Some(reason);
    }

    fn join(handle: JoinHandle<Result<u64, CaptureError>>) -> Result<u64, String> {
        match handle.join() {
            Ok(Ok(processed)) => Ok(processed),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("capture thread panicked".to_string()),
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some(worker) = self.session.get_mut().worker.take() {
            worker.stop.store(true, Ordering::Release);
        }
    }
}

fn capture_loop(
    opener: &dyn SourceOpener,
    interface: Option<&str>,
    pipeline: &Pipeline,
    stop: &AtomicBool,
) -> Result<u64, CaptureError> {
    let mut source: Box<dyn FrameSource> = opener.open(interface)?;
    info!(interface = interface.unwrap_or("default"), "Capture loop started");

    let mut accepted = 0u64;
    while !stop.load(Ordering::Acquire) {
        let Some(frame) = source.next_frame()? else {
            continue;
        };
        // A stop requested during the pull discards the frame.
        if stop.load(Ordering::Acquire) {
            break;
        }
        if pipeline.handle(&frame) {
            accepted += 1;
        }
    }

    debug!(accepted, "Capture loop observed stop signal");
    Ok(accepted)
}
