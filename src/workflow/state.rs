//! Workflow state machine types.
//!
//! [`WorkflowState`] drives the read-text machine. Exactly one value holds
//! at any instant and every asynchronous completion handler checks it (and
//! the pass token) before acting, because a stale completion from a
//! canceled pass must never advance the machine.
//!
//! [`ReadRequest`] is the per-pass record: it accumulates the captured
//! frame, detected regions, assembled image and recognized text as the
//! pass advances, and is discarded whole at cleanup.

use std::sync::Arc;

use crate::assemble::OcrImage;
use crate::capture::Frame;
use crate::detect::Region;
use crate::speech::UtteranceId;

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// States of the read-text workflow.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──host ready──▶ LiveCapture
/// LiveCapture ──tap──▶ AwaitingCapture
///   ──frame──▶ DetectingText ──regions──▶ AssemblingImage
///   ──image──▶ RecognizingText ──text──▶ Speaking
///   ──done speaking──▶ cleanup ──▶ LiveCapture
/// DetectingText / RecognizingText / Speaking ──tap──▶ CancelingSpeech
///   ──done canceling──▶ LiveCapture
/// any ──backgrounded──▶ Backgrounded ──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Nothing running; the camera preview is stopped.
    Idle,

    /// Live camera preview on screen, waiting for a tap.
    LiveCapture,

    /// A snap request is in flight with the capture service.
    AwaitingCapture,

    /// The captured frame is with the text detector.
    DetectingText,

    /// The assembler is building the OCR input image.
    AssemblingImage,

    /// The assembled image is with the recognizer.
    RecognizingText,

    /// The recognized text is being spoken.
    Speaking,

    /// Cleanup stopped an active utterance and is waiting for the
    /// synthesizer's cancel acknowledgment.
    CancelingSpeech,

    /// The host went to the background; everything is torn down.
    Backgrounded,
}

impl WorkflowState {
    /// Returns `true` in the states where a tap aborts the in-flight pass.
    ///
    /// ```
    /// use world_aloud::workflow::WorkflowState;
    ///
    /// assert!(WorkflowState::DetectingText.is_cancelable());
    /// assert!(WorkflowState::RecognizingText.is_cancelable());
    /// assert!(WorkflowState::Speaking.is_cancelable());
    /// assert!(!WorkflowState::LiveCapture.is_cancelable());
    /// assert!(!WorkflowState::AwaitingCapture.is_cancelable());
    /// ```
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            WorkflowState::DetectingText
                | WorkflowState::RecognizingText
                | WorkflowState::Speaking
        )
    }

    /// Returns `true` while a pass is somewhere between tap and cleanup.
    pub fn is_pass_active(&self) -> bool {
        matches!(
            self,
            WorkflowState::AwaitingCapture
                | WorkflowState::DetectingText
                | WorkflowState::AssemblingImage
                | WorkflowState::RecognizingText
                | WorkflowState::Speaking
                | WorkflowState::CancelingSpeech
        )
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::LiveCapture => "LiveCapture",
            WorkflowState::AwaitingCapture => "AwaitingCapture",
            WorkflowState::DetectingText => "DetectingText",
            WorkflowState::AssemblingImage => "AssemblingImage",
            WorkflowState::RecognizingText => "RecognizingText",
            WorkflowState::Speaking => "Speaking",
            WorkflowState::CancelingSpeech => "CancelingSpeech",
            WorkflowState::Backgrounded => "Backgrounded",
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::Idle
    }
}

// ---------------------------------------------------------------------------
// PassToken
// ---------------------------------------------------------------------------

/// Generation counter identifying one workflow pass.
///
/// Bumped on every cleanup; a completion stamped with an older token
/// belongs to a superseded pass and is discarded without side effects.
pub type PassToken = u64;

// ---------------------------------------------------------------------------
// ReadRequest
// ---------------------------------------------------------------------------

/// Ephemeral per-pass record.
///
/// Created when a tap starts a pass and dropped whole at cleanup; nothing
/// in it survives into the next pass. Stage results are `Arc`ed so spawned
/// service tasks can borrow them without copying pixels.
#[derive(Debug, Default)]
pub struct ReadRequest {
    /// The captured frame, present from capture completion onward.
    pub frame: Option<Arc<Frame>>,

    /// Detected text regions, empty until detection completes.
    pub regions: Vec<Region>,

    /// The assembled OCR input image.
    pub ocr_image: Option<Arc<OcrImage>>,

    /// Recognized text, present only after successful recognition.
    pub recognized: Option<String>,

    /// Id of the utterance speaking the recognized text. Only this
    /// utterance's natural completion ends the pass; announcements
    /// finishing late must not.
    pub reading_utterance: Option<UtteranceId>,
}

impl ReadRequest {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
