//! Read-text workflow module for world-aloud.
//!
//! This module wires the capture → detect → assemble → recognize → speak
//! workflow into a single event-driven state machine.
//!
//! # Architecture
//!
//! ```text
//! host events (MachineHandle)          service completions
//!   ready / tap / background             (spawned tasks)
//!        │                                    │
//!        ▼                                    ▼
//!       WorkflowEvent (mpsc)  ◀───────────────┘
//!        │
//!        ▼
//! ReadTextMachine::run()  ← async tokio task, sole owner of state
//!        │
//!        ├─ tap in LiveCapture → "Processing." + capture_frame
//!        ├─ FrameCaptured      → stop preview, detect_regions
//!        ├─ RegionsDetected    → assemble (inline), display overlay,
//!        │                      recognize
//!        ├─ TextRecognized     → enqueue + speak
//!        └─ UtteranceFinished  → cleanup → LiveCapture
//!
//! tap mid-pass → cancel → cleanup (speech cancel sub-flow if speaking)
//! ```
//!
//! All machine state lives inside the `run` task; services marshal their
//! completions back as [`WorkflowEvent`]s tagged with the issuing
//! [`PassToken`], and stale tokens are discarded on arrival.

pub mod machine;
pub mod state;

use tokio::sync::mpsc;

use crate::capture::{CaptureError, Frame};
use crate::detect::{DetectError, Region};
use crate::recognize::RecognizeError;
use crate::speech::{SpeechError, UtteranceId, UtteranceOutcome};

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use machine::ReadTextMachine;
pub use state::{PassToken, ReadRequest, WorkflowState};

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// Everything the machine's control loop can receive.
///
/// Host events carry no token — they are always current. Service
/// completions carry the [`PassToken`] of the pass that issued them so the
/// machine can discard results of a superseded pass.
#[derive(Debug)]
pub enum WorkflowEvent {
    /// The host surface is on screen and ready for the camera preview.
    HostReady,

    /// The user tapped the host surface.
    ScreenTapped,

    /// The host is leaving the foreground.
    HostBackgrounded,

    /// The capture service confirmed the live preview is running.
    PreviewStarted,

    /// The capture service confirmed the live preview has stopped.
    PreviewStopped,

    /// A snap request finished.
    FrameCaptured {
        token: PassToken,
        outcome: Result<Frame, CaptureError>,
    },

    /// A detection request finished.
    RegionsDetected {
        token: PassToken,
        outcome: Result<Vec<Region>, DetectError>,
    },

    /// A recognition request finished.
    TextRecognized {
        token: PassToken,
        outcome: Result<String, RecognizeError>,
    },

    /// An utterance handed to the speech service ended.
    UtteranceFinished {
        id: UtteranceId,
        outcome: Result<UtteranceOutcome, SpeechError>,
    },

    /// A stage watchdog expired (only armed when
    /// `workflow.stage_timeout_ms` is set).
    StageTimedOut {
        token: PassToken,
        stage: WorkflowState,
    },

    /// Stop the control loop; `run` returns.
    Shutdown,
}

// ---------------------------------------------------------------------------
// MachineHandle
// ---------------------------------------------------------------------------

/// Cloneable sender the host uses to push events into the machine.
///
/// Sends are fire-and-forget: if the machine is gone the event is dropped
/// with a debug log, never an error — the host must not care about the
/// machine's lifetime.
#[derive(Clone)]
pub struct MachineHandle {
    tx: mpsc::Sender<WorkflowEvent>,
}

impl MachineHandle {
    pub fn new(tx: mpsc::Sender<WorkflowEvent>) -> Self {
        Self { tx }
    }

    /// Host surface is ready; start the live preview.
    pub async fn ready(&self) {
        self.send(WorkflowEvent::HostReady).await;
    }

    /// User tapped the surface (start or cancel a pass).
    pub async fn tap(&self) {
        self.send(WorkflowEvent::ScreenTapped).await;
    }

    /// Host is leaving the foreground.
    pub async fn background(&self) {
        self.send(WorkflowEvent::HostBackgrounded).await;
    }

    /// Ask the machine's control loop to exit.
    pub async fn shutdown(&self) {
        self.send(WorkflowEvent::Shutdown).await;
    }

    async fn send(&self, event: WorkflowEvent) {
        if self.tx.send(event).await.is_err() {
            log::debug!("workflow: machine gone, dropping host event");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_delivers_host_events_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = MachineHandle::new(tx);

        handle.ready().await;
        handle.tap().await;
        handle.background().await;

        assert!(matches!(rx.recv().await, Some(WorkflowEvent::HostReady)));
        assert!(matches!(rx.recv().await, Some(WorkflowEvent::ScreenTapped)));
        assert!(matches!(
            rx.recv().await,
            Some(WorkflowEvent::HostBackgrounded)
        ));
    }

    #[tokio::test]
    async fn handle_tolerates_closed_machine() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        let handle = MachineHandle::new(tx);
        // Must not panic or error.
        handle.tap().await;
        handle.shutdown().await;
    }
}
