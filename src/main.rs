//! Application entry point — World Aloud desktop harness.
//!
//! Runs the read-text machine against simulated backends so the whole
//! workflow can be exercised from a terminal without camera or
//! synthesizer hardware.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the simulated services (camera, detector, recognizer, speech)
//!    and the terminal host surface.
//! 4. Create the workflow event channel.
//! 5. Spawn [`ReadTextMachine::run`] on the tokio runtime.
//! 6. Read commands from stdin and forward them through a
//!    [`MachineHandle`] until `quit`.
//!
//! # Commands
//!
//! An empty line (or `tap`) taps the surface, `bg` backgrounds the host,
//! `fg` brings it back, `quit` (or `q`) shuts the machine down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Notify};

use world_aloud::{
    assemble::{OcrImage, RegionComposer},
    capture::{CaptureError, CaptureOrientation, CaptureService, Frame},
    config::AppConfig,
    detect::{DetectError, Region, TextDetector},
    host::{HostSurface, OverlayFrame},
    recognize::{RecognizeError, TextRecognizer},
    speech::{SpeechError, SpeechService, UtteranceOutcome},
    workflow::{MachineHandle, ReadTextMachine},
};

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("World Aloud starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Services — simulated backends, defined below. A missing camera is
    //    the one startup error nothing downstream can recover from.
    let capture: Arc<dyn CaptureService> = match SimCamera::probe() {
        Ok(camera) => Arc::new(camera),
        Err(e) => {
            log::error!("no usable camera: {e}");
            return Err(e.into());
        }
    };
    let detector: Arc<dyn TextDetector> = Arc::new(SimDetector);
    let assembler = Arc::new(RegionComposer);
    let recognizer: Arc<dyn TextRecognizer> = Arc::new(SimRecognizer);
    let speech: Arc<dyn SpeechService> = Arc::new(ConsoleSpeech::new());

    let surface: Arc<dyn HostSurface> = Arc::new(TerminalSurface);

    // 4. Workflow event channel
    let (event_tx, event_rx) = mpsc::channel(config.workflow.event_queue_depth);
    let handle = MachineHandle::new(event_tx.clone());

    // 5. Spawn the machine
    let machine = ReadTextMachine::new(
        config,
        capture,
        detector,
        assembler,
        recognizer,
        speech,
        Arc::downgrade(&surface),
        event_tx,
    );
    let machine_task = tokio::spawn(machine.run(event_rx));

    // The host surface is "on screen" as soon as we reach the prompt.
    handle.ready().await;

    // 6. Stdin command loop
    println!("World Aloud — simulated camera harness");
    println!("  <enter>/tap  snap and read    bg  background    fg  foreground    q  quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" | "tap" => handle.tap().await,
            "bg" => handle.background().await,
            "fg" => handle.ready().await,
            "q" | "quit" => {
                handle.shutdown().await;
                break;
            }
            other => println!("unknown command: {other}"),
        }
    }

    let machine = machine_task.await?;
    log::info!("machine exited in {}", machine.state().label());
    Ok(())
}

// ---------------------------------------------------------------------------
// SimCamera — canned frame in place of a camera device
// ---------------------------------------------------------------------------

/// Capture backend that snaps a synthetic "page": a white sheet with two
/// dark text bands, always held upright.
struct SimCamera {
    running: AtomicBool,
}

impl SimCamera {
    /// The simulated device is always present; a real backend returns
    /// [`CaptureError::NoCamera`] here when enumeration finds nothing.
    fn probe() -> Result<Self, CaptureError> {
        Ok(Self {
            running: AtomicBool::new(false),
        })
    }

    fn sample_page() -> Frame {
        let image = RgbaImage::from_fn(320, 240, |_, y| {
            // Text bands at rows 40..60 and 120..140.
            if (40..60).contains(&y) || (120..140).contains(&y) {
                Rgba([30, 30, 30, 255])
            } else {
                Rgba([250, 250, 250, 255])
            }
        });
        Frame::new(image, CaptureOrientation::Upright)
    }
}

#[async_trait]
impl CaptureService for SimCamera {
    async fn start_preview(&self) -> Result<(), CaptureError> {
        if !self.running.swap(true, Ordering::SeqCst) {
            log::info!("camera: preview running");
        }
        Ok(())
    }

    async fn stop_preview(&self) -> Result<(), CaptureError> {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("camera: preview stopped");
        }
        Ok(())
    }

    async fn capture_frame(&self) -> Result<Frame, CaptureError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::Capture("preview is not running".into()));
        }
        // Shutter latency.
        tokio::time::sleep(Duration::from_millis(120)).await;
        Ok(Self::sample_page())
    }
}

// ---------------------------------------------------------------------------
// SimDetector — fixed regions matching SimCamera's text bands
// ---------------------------------------------------------------------------

struct SimDetector;

#[async_trait]
impl TextDetector for SimDetector {
    async fn detect_regions(&self, frame: &Frame) -> Result<Vec<Region>, DetectError> {
        tokio::time::sleep(Duration::from_millis(80)).await;
        log::debug!(
            "detector: scanned {}x{} frame",
            frame.width(),
            frame.height()
        );
        Ok(vec![
            Region::new(0.05, 40.0 / 240.0, 0.9, 20.0 / 240.0),
            Region::new(0.05, 120.0 / 240.0, 0.9, 20.0 / 240.0),
        ])
    }
}

// ---------------------------------------------------------------------------
// SimRecognizer — canned OCR result
// ---------------------------------------------------------------------------

struct SimRecognizer;

#[async_trait]
impl TextRecognizer for SimRecognizer {
    async fn recognize(&self, image: &OcrImage) -> Result<String, RecognizeError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        log::debug!("recognizer: read {}x{} image", image.width(), image.height());
        Ok("The quick brown fox jumps over the lazy dog.".to_string())
    }
}

// ---------------------------------------------------------------------------
// ConsoleSpeech — prints utterances and paces them in real time
// ---------------------------------------------------------------------------

/// Speech backend that prints each phrase and "plays" it for a duration
/// proportional to its length, so cancellation mid-utterance can be tried
/// from the terminal.
struct ConsoleSpeech {
    interrupt: Notify,
}

impl ConsoleSpeech {
    fn new() -> Self {
        Self {
            interrupt: Notify::new(),
        }
    }

    fn playback_time(text: &str) -> Duration {
        Duration::from_millis((text.chars().count() as u64 * 60).clamp(300, 6_000))
    }
}

#[async_trait]
impl SpeechService for ConsoleSpeech {
    async fn speak(&self, text: &str) -> Result<UtteranceOutcome, SpeechError> {
        println!("[speech] {text}");
        tokio::select! {
            _ = tokio::time::sleep(Self::playback_time(text)) => {
                Ok(UtteranceOutcome::Spoken)
            }
            _ = self.interrupt.notified() => {
                println!("[speech] (interrupted)");
                Ok(UtteranceOutcome::Canceled)
            }
        }
    }

    async fn cancel(&self) {
        // Wakes the in-flight speak, if any; a no-op otherwise.
        self.interrupt.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// TerminalSurface — logs overlay traffic instead of drawing
// ---------------------------------------------------------------------------

struct TerminalSurface;

impl HostSurface for TerminalSurface {
    fn container_width(&self) -> f32 {
        320.0
    }

    fn display_image(&self, image: &OcrImage, frame: OverlayFrame) {
        log::info!(
            "surface: overlay {}x{} px at ({}, {}) sized {}x{}",
            image.width(),
            image.height(),
            frame.x,
            frame.y,
            frame.width,
            frame.height
        );
    }

    fn remove_overlays(&self) {
        log::debug!("surface: overlays removed");
    }
}
