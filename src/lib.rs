//! World Aloud — reads printed text out loud.
//!
//! Point the camera at a page, tap, and the text is spoken back. The crate
//! is the platform-independent core of that loop: a single event-driven
//! state machine ([`workflow::ReadTextMachine`]) sequencing five services
//! behind trait seams.
//!
//! # Module map
//!
//! | Module        | Responsibility                                        |
//! |---------------|-------------------------------------------------------|
//! | [`capture`]   | Camera preview lifecycle and still-frame snapping     |
//! | [`detect`]    | Text-region detection on a captured frame             |
//! | [`assemble`]  | Orientation correction + OCR input composition        |
//! | [`recognize`] | OCR over the assembled image                          |
//! | [`speech`]    | Utterance queue and speech synthesis                  |
//! | [`host`]      | Hosting-surface boundary and overlay placement        |
//! | [`workflow`]  | The state machine tying the above together            |
//! | [`config`]    | TOML settings, defaults, platform paths               |
//!
//! Platform backends implement the service traits ([`capture::CaptureService`],
//! [`detect::TextDetector`], [`assemble::ImageAssembler`],
//! [`recognize::TextRecognizer`], [`speech::SpeechService`],
//! [`host::HostSurface`]) and hand the machine `Arc`s; the binary in
//! `main.rs` wires up simulated backends for desktop use.

pub mod assemble;
pub mod capture;
pub mod config;
pub mod detect;
pub mod host;
pub mod recognize;
pub mod speech;
pub mod workflow;
