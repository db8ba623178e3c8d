//! Read-text state machine — drives the full capture → detect → assemble →
//! recognize → speak loop.
//!
//! [`ReadTextMachine`] owns the [`WorkflowState`] and responds to
//! [`WorkflowEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Workflow flow
//!
//! ```text
//! ScreenTapped (in LiveCapture)
//!   └─▶ "Processing.", spawn capture_frame            [AwaitingCapture]
//!
//! FrameCaptured(ok)
//!   └─▶ stop preview, spawn detect_regions            [DetectingText]
//!         ├─ regions empty → cleanup + "No text found."
//!         └─ regions       → assemble inline          [AssemblingImage]
//!               ├─ Ok  → overlay, spawn recognize     [RecognizingText]
//!               │         └─ text → enqueue + speak   [Speaking]
//!               │               └─ done → cleanup → LiveCapture
//!               └─ Err → cleanup → LiveCapture
//!
//! ScreenTapped (mid-pass) → cleanup
//!   └─▶ speech in flight? cancel, await ack           [CancelingSpeech]
//! HostBackgrounded → stop preview, cleanup            [Backgrounded → Idle]
//! ```
//!
//! Every service request runs in a spawned task that sends exactly one
//! completion event back, tagged with the issuing [`PassToken`]. The
//! machine mutates its state only inside [`run`](ReadTextMachine::run),
//! so no locking is needed; stale completions are dropped by comparing
//! tokens. Assembly is pure CPU work on a single frame and runs inline.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::assemble::{ImageAssembler, OcrImage};
use crate::capture::{CaptureError, CaptureService, Frame};
use crate::config::AppConfig;
use crate::detect::{DetectError, Region, TextDetector};
use crate::host::{HostSurface, OverlayFrame};
use crate::recognize::{RecognizeError, TextRecognizer};
use crate::speech::{
    SpeechError, SpeechService, UtteranceId, UtteranceOutcome, UtteranceQueue,
};

use super::state::{PassToken, ReadRequest, WorkflowState};
use super::WorkflowEvent;

// ---------------------------------------------------------------------------
// ReadTextMachine
// ---------------------------------------------------------------------------

/// Drives the complete read-text workflow.
///
/// Create with [`ReadTextMachine::new`], then call [`run`](Self::run)
/// inside a tokio task. Host events arrive through a
/// [`MachineHandle`](super::MachineHandle) bound to the same channel.
pub struct ReadTextMachine {
    config: AppConfig,
    state: WorkflowState,
    /// Current pass generation; bumped on every cleanup.
    token: PassToken,
    request: Option<ReadRequest>,
    queue: UtteranceQueue,
    /// The utterance currently with the speech service, if any.
    in_flight_utterance: Option<UtteranceId>,
    /// Where cleanup lands once any speech cancellation is acknowledged.
    resume: WorkflowState,
    /// Mirror of the preview session, kept from lifecycle confirmations.
    preview_live: bool,
    capture: Arc<dyn CaptureService>,
    detector: Arc<dyn TextDetector>,
    assembler: Arc<dyn ImageAssembler>,
    recognizer: Arc<dyn TextRecognizer>,
    speech: Arc<dyn SpeechService>,
    host: Weak<dyn HostSurface>,
    /// Sender side of the machine's own event channel, cloned into every
    /// spawned service task.
    events: mpsc::Sender<WorkflowEvent>,
}

impl ReadTextMachine {
    /// Create a new machine.
    ///
    /// # Arguments
    ///
    /// * `config`     — application configuration snapshot.
    /// * `capture`    — camera service.
    /// * `detector`   — text-region detector.
    /// * `assembler`  — OCR input assembler (e.g. `RegionComposer`).
    /// * `recognizer` — OCR engine.
    /// * `speech`     — speech synthesizer.
    /// * `host`       — non-owning handle to the hosting surface.
    /// * `events`     — sender for the channel `run` will receive on.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        capture: Arc<dyn CaptureService>,
        detector: Arc<dyn TextDetector>,
        assembler: Arc<dyn ImageAssembler>,
        recognizer: Arc<dyn TextRecognizer>,
        speech: Arc<dyn SpeechService>,
        host: Weak<dyn HostSurface>,
        events: mpsc::Sender<WorkflowEvent>,
    ) -> Self {
        Self {
            config,
            state: WorkflowState::Idle,
            token: 0,
            request: None,
            queue: UtteranceQueue::new(),
            in_flight_utterance: None,
            resume: WorkflowState::LiveCapture,
            preview_live: false,
            capture,
            detector,
            assembler,
            recognizer,
            speech,
            host,
            events,
        }
    }

    /// Current state, for logging and tests.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the machine until a [`WorkflowEvent::Shutdown`] arrives or the
    /// channel closes.
    ///
    /// The machine keeps a sender clone for its own service tasks, so the
    /// channel only closes once every spawned task is gone; `Shutdown` is
    /// the normal way out. Returns `self` so callers can inspect the
    /// final state.
    pub async fn run(mut self, mut rx: mpsc::Receiver<WorkflowEvent>) -> Self {
        while let Some(event) = rx.recv().await {
            if matches!(event, WorkflowEvent::Shutdown) {
                log::info!("machine: shutdown requested");
                break;
            }
            self.handle_event(event);
        }
        self
    }

    // -----------------------------------------------------------------------
    // Event dispatch
    // -----------------------------------------------------------------------

    fn handle_event(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::HostReady => self.handle_host_ready(),
            WorkflowEvent::ScreenTapped => self.handle_tap(),
            WorkflowEvent::HostBackgrounded => self.handle_backgrounded(),
            WorkflowEvent::PreviewStarted => self.handle_preview_started(),
            WorkflowEvent::PreviewStopped => {
                self.preview_live = false;
                log::debug!("machine: preview stopped");
            }
            WorkflowEvent::FrameCaptured { token, outcome } => {
                self.handle_frame_captured(token, outcome);
            }
            WorkflowEvent::RegionsDetected { token, outcome } => {
                self.handle_regions_detected(token, outcome);
            }
            WorkflowEvent::TextRecognized { token, outcome } => {
                self.handle_text_recognized(token, outcome);
            }
            WorkflowEvent::UtteranceFinished { id, outcome } => {
                self.handle_utterance_finished(id, outcome);
            }
            WorkflowEvent::StageTimedOut { token, stage } => {
                self.handle_stage_timed_out(token, stage);
            }
            WorkflowEvent::Shutdown => {
                // Consumed by run(); unreachable through dispatch.
            }
        }
    }

    // -----------------------------------------------------------------------
    // Host events
    // -----------------------------------------------------------------------

    fn handle_host_ready(&mut self) {
        match self.state {
            WorkflowState::Idle | WorkflowState::Backgrounded => {
                log::info!("machine: host ready → LiveCapture");
                self.enter_live_capture();
            }
            other => {
                log::debug!("machine: host ready ignored in {}", other.label());
            }
        }
    }

    fn handle_tap(&mut self) {
        match self.state {
            WorkflowState::LiveCapture => {
                log::info!("machine: tap → starting read pass {}", self.token);
                self.request = Some(ReadRequest::new());
                let phrase = self.config.announce.processing.clone();
                self.announce(phrase);
                self.set_state(WorkflowState::AwaitingCapture);
                self.issue_capture();
            }
            state if state.is_cancelable() => {
                log::info!("machine: tap canceled pass in {}", state.label());
                self.cleanup(WorkflowState::LiveCapture);
            }
            other => {
                log::debug!("machine: tap ignored in {}", other.label());
            }
        }
    }

    fn handle_backgrounded(&mut self) {
        log::info!("machine: host backgrounded from {}", self.state.label());
        self.stop_preview();
        self.set_state(WorkflowState::Backgrounded);
        self.cleanup(WorkflowState::Idle);
    }

    fn handle_preview_started(&mut self) {
        self.preview_live = true;
        if self.state == WorkflowState::LiveCapture {
            let phrase = self.config.announce.camera_ready.clone();
            self.announce(phrase);
        } else {
            log::debug!(
                "machine: preview start confirmation in {}",
                self.state.label()
            );
        }
    }

    // -----------------------------------------------------------------------
    // Service completions
    // -----------------------------------------------------------------------

    fn handle_frame_captured(
        &mut self,
        token: PassToken,
        outcome: Result<Frame, CaptureError>,
    ) {
        if token != self.token || self.state != WorkflowState::AwaitingCapture {
            log::debug!("machine: stale capture completion discarded");
            return;
        }

        match outcome {
            Ok(frame) => {
                self.stop_preview();
                let frame = Arc::new(frame);
                if let Some(request) = self.request.as_mut() {
                    request.frame = Some(Arc::clone(&frame));
                }
                self.set_state(WorkflowState::DetectingText);
                self.issue_detection(frame);
            }
            Err(e) => {
                log::warn!("machine: capture failed: {e}");
                self.cleanup(WorkflowState::LiveCapture);
            }
        }
    }

    fn handle_regions_detected(
        &mut self,
        token: PassToken,
        outcome: Result<Vec<Region>, DetectError>,
    ) {
        if token != self.token || self.state != WorkflowState::DetectingText {
            log::debug!("machine: stale detection completion discarded");
            return;
        }

        match outcome {
            Ok(regions) if regions.is_empty() => {
                log::info!("machine: no text found in frame");
                // Cleanup first so a still-playing announcement is canceled
                // before the result is spoken.
                self.cleanup(WorkflowState::LiveCapture);
                let phrase = self.config.announce.no_text.clone();
                self.announce(phrase);
            }
            Ok(regions) => {
                log::debug!("machine: {} text region(s) detected", regions.len());
                if let Some(request) = self.request.as_mut() {
                    request.regions = regions;
                }
                self.set_state(WorkflowState::AssemblingImage);
                self.run_assembly();
            }
            Err(e) => {
                log::warn!("machine: detection failed: {e}");
                self.cleanup(WorkflowState::LiveCapture);
            }
        }
    }

    /// Assemble the OCR input image for the current pass.
    ///
    /// Runs inline: assembly is pure CPU work on one frame and the machine
    /// has nothing else to do until it finishes. `AssemblingImage` is still
    /// a distinct state so logs and tests can observe the stage.
    fn run_assembly(&mut self) {
        let (frame, regions) = match self.request.as_ref() {
            Some(ReadRequest {
                frame: Some(frame),
                regions,
                ..
            }) => (Arc::clone(frame), regions.clone()),
            _ => {
                log::warn!("machine: assembly requested without a captured frame");
                self.cleanup(WorkflowState::LiveCapture);
                return;
            }
        };

        match self
            .assembler
            .assemble(&frame, &regions, self.config.assembly_mode)
        {
            Ok(image) => {
                let image = Arc::new(image);
                self.display_overlay(&image);
                if let Some(request) = self.request.as_mut() {
                    request.ocr_image = Some(Arc::clone(&image));
                }
                self.set_state(WorkflowState::RecognizingText);
                self.issue_recognition(image);
            }
            Err(e) => {
                log::warn!("machine: assembly failed: {e}");
                self.cleanup(WorkflowState::LiveCapture);
            }
        }
    }

    fn handle_text_recognized(
        &mut self,
        token: PassToken,
        outcome: Result<String, RecognizeError>,
    ) {
        if token != self.token || self.state != WorkflowState::RecognizingText {
            log::debug!("machine: stale recognition completion discarded");
            return;
        }

        match outcome {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    log::info!("machine: recognizer produced no usable text");
                    self.cleanup(WorkflowState::LiveCapture);
                    return;
                }

                log::info!("machine: recognized {} chars, speaking", text.len());
                self.set_state(WorkflowState::Speaking);
                let id = self.announce(text.clone());
                if let Some(request) = self.request.as_mut() {
                    request.recognized = Some(text);
                    request.reading_utterance = Some(id);
                }
            }
            Err(e) => {
                log::warn!("machine: recognition failed: {e}");
                self.cleanup(WorkflowState::LiveCapture);
            }
        }
    }

    fn handle_utterance_finished(
        &mut self,
        id: UtteranceId,
        outcome: Result<UtteranceOutcome, SpeechError>,
    ) {
        if self.in_flight_utterance == Some(id) {
            self.in_flight_utterance = None;
        }

        match &outcome {
            Ok(o) => log::debug!("machine: utterance {id} finished: {o:?}"),
            Err(e) => log::warn!("machine: utterance {id} failed: {e}"),
        }

        match self.state {
            // Cleanup is waiting on the synthesizer. A natural finish
            // racing the cancel request counts as the acknowledgment too.
            WorkflowState::CancelingSpeech | WorkflowState::Backgrounded => {
                if self.resume == WorkflowState::Idle {
                    self.set_state(WorkflowState::Idle);
                } else {
                    self.enter_live_capture();
                }
                self.pump_speech();
            }
            // The pass's reading utterance ended; the pass is over either
            // way — an error mid-utterance cannot be retried sensibly.
            WorkflowState::Speaking if self.reading_utterance() == Some(id) => {
                self.cleanup(WorkflowState::LiveCapture);
            }
            // An announcement finished; keep the queue moving.
            _ => self.pump_speech(),
        }
    }

    fn handle_stage_timed_out(&mut self, token: PassToken, stage: WorkflowState) {
        if token != self.token || self.state != stage {
            log::debug!("machine: expired watchdog for {} discarded", stage.label());
            return;
        }

        log::warn!(
            "machine: stage {} exceeded {}ms, abandoning pass",
            stage.label(),
            self.config.workflow.stage_timeout_ms.unwrap_or_default()
        );
        self.cleanup(WorkflowState::LiveCapture);
    }

    // -----------------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------------

    /// Tear down the current pass and return to `resume`.
    ///
    /// Idempotent: discards the pass record, invalidates outstanding
    /// completions by bumping the pass token, clears overlays and the
    /// utterance queue. If an utterance is in flight, cancellation is
    /// requested and the machine parks in `CancelingSpeech` (or stays
    /// `Backgrounded`) until the acknowledgment arrives; otherwise the
    /// resume target is entered directly. A second invocation finds
    /// nothing left to tear down and must not restart the preview again.
    fn cleanup(&mut self, resume: WorkflowState) {
        log::debug!(
            "machine: cleanup from {} (resume {})",
            self.state.label(),
            resume.label()
        );

        self.request = None;
        self.token += 1;
        self.queue.clear();
        if let Some(host) = self.host.upgrade() {
            host.remove_overlays();
        }
        self.resume = resume;

        if self.in_flight_utterance.is_some() {
            let next = if resume == WorkflowState::Idle {
                WorkflowState::Backgrounded
            } else {
                WorkflowState::CancelingSpeech
            };
            self.set_state(next);
            let speech = Arc::clone(&self.speech);
            tokio::spawn(async move {
                speech.cancel().await;
            });
        } else if resume == WorkflowState::Idle {
            self.set_state(WorkflowState::Idle);
        } else {
            self.enter_live_capture();
        }
    }

    // -----------------------------------------------------------------------
    // Preview lifecycle
    // -----------------------------------------------------------------------

    fn enter_live_capture(&mut self) {
        if self.state != WorkflowState::LiveCapture {
            self.set_state(WorkflowState::LiveCapture);
        }
        self.start_preview_if_needed();
    }

    fn start_preview_if_needed(&mut self) {
        if self.preview_live {
            return;
        }
        // Marked live at request time so overlapping cleanups cannot issue
        // a second start before the confirmation arrives.
        self.preview_live = true;

        let capture = Arc::clone(&self.capture);
        let events = self.events.clone();
        tokio::spawn(async move {
            match capture.start_preview().await {
                Ok(()) => {
                    let _ = events.send(WorkflowEvent::PreviewStarted).await;
                }
                Err(e) => {
                    log::error!("machine: preview start failed: {e}");
                    let _ = events.send(WorkflowEvent::PreviewStopped).await;
                }
            }
        });
    }

    fn stop_preview(&mut self) {
        if !self.preview_live {
            return;
        }
        self.preview_live = false;

        let capture = Arc::clone(&self.capture);
        let events = self.events.clone();
        tokio::spawn(async move {
            match capture.stop_preview().await {
                Ok(()) => {
                    let _ = events.send(WorkflowEvent::PreviewStopped).await;
                }
                Err(e) => log::warn!("machine: preview stop failed: {e}"),
            }
        });
    }

    // -----------------------------------------------------------------------
    // Service requests
    // -----------------------------------------------------------------------

    fn issue_capture(&self) {
        let token = self.token;
        let capture = Arc::clone(&self.capture);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = capture.capture_frame().await;
            let _ = events
                .send(WorkflowEvent::FrameCaptured { token, outcome })
                .await;
        });
        self.arm_watchdog(WorkflowState::AwaitingCapture);
    }

    fn issue_detection(&self, frame: Arc<Frame>) {
        let token = self.token;
        let detector = Arc::clone(&self.detector);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = detector.detect_regions(&frame).await;
            let _ = events
                .send(WorkflowEvent::RegionsDetected { token, outcome })
                .await;
        });
        self.arm_watchdog(WorkflowState::DetectingText);
    }

    fn issue_recognition(&self, image: Arc<OcrImage>) {
        let token = self.token;
        let recognizer = Arc::clone(&self.recognizer);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = recognizer.recognize(&image).await;
            let _ = events
                .send(WorkflowEvent::TextRecognized { token, outcome })
                .await;
        });
        self.arm_watchdog(WorkflowState::RecognizingText);
    }

    /// Arm the per-stage watchdog, when configured.
    ///
    /// The timer fires unconditionally; the handler drops it unless the
    /// token still matches and the machine is still in `stage`.
    fn arm_watchdog(&self, stage: WorkflowState) {
        let Some(ms) = self.config.workflow.stage_timeout_ms else {
            return;
        };
        let token = self.token;
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            let _ = events
                .send(WorkflowEvent::StageTimedOut { token, stage })
                .await;
        });
    }

    // -----------------------------------------------------------------------
    // Speech queue
    // -----------------------------------------------------------------------

    /// Enqueue `text` for speaking and start it immediately if the
    /// synthesizer is free.
    fn announce(&mut self, text: String) -> UtteranceId {
        let id = self.queue.enqueue(text);
        self.pump_speech();
        id
    }

    fn pump_speech(&mut self) {
        if self.in_flight_utterance.is_some() {
            return;
        }
        let Some((id, text)) = self.queue.dequeue() else {
            return;
        };
        self.in_flight_utterance = Some(id);

        let speech = Arc::clone(&self.speech);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = speech.speak(&text).await;
            let _ = events
                .send(WorkflowEvent::UtteranceFinished { id, outcome })
                .await;
        });
    }

    fn reading_utterance(&self) -> Option<UtteranceId> {
        self.request.as_ref().and_then(|r| r.reading_utterance)
    }

    // -----------------------------------------------------------------------
    // Host surface
    // -----------------------------------------------------------------------

    fn display_overlay(&self, image: &OcrImage) {
        if !self.config.overlay.show_ocr_input {
            return;
        }
        if let Some(host) = self.host.upgrade() {
            let frame = OverlayFrame::fit(
                image.width(),
                image.height(),
                host.container_width(),
                self.config.overlay.origin,
            );
            host.display_image(image, frame);
        }
    }

    fn set_state(&mut self, next: WorkflowState) {
        log::debug!("machine: {} → {}", self.state.label(), next.label());
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
