//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// AssemblyMode
// ---------------------------------------------------------------------------

/// Selects what the image assembler hands to the recognizer.
///
/// | Variant     | OCR input                                            |
/// |-------------|------------------------------------------------------|
/// | TextRegions | detected regions composited at their original spots  |
/// | FullFrame   | the whole orientation-corrected frame                |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyMode {
    /// Composite only the detected text regions onto a blank canvas —
    /// minimizes the pixels the OCR engine has to chew through.
    TextRegions,
    /// Skip cropping and recognize the whole corrected frame.
    FullFrame,
}

impl Default for AssemblyMode {
    fn default() -> Self {
        Self::TextRegions
    }
}

// ---------------------------------------------------------------------------
// AnnounceConfig
// ---------------------------------------------------------------------------

/// Spoken announcement phrases.
///
/// Audio is the primary feedback channel for this application's intended
/// users, so every workflow milestone has a phrase. All phrases are
/// configurable for localization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceConfig {
    /// Spoken whenever the live camera preview (re)starts.
    pub camera_ready: String,
    /// Spoken when a tap starts a read pass.
    pub processing: String,
    /// Spoken when the detector finds no text in the captured frame.
    pub no_text: String,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            camera_ready: "Camera view. Tap to start.".into(),
            processing: "Processing.".into(),
            no_text: "No text found.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OverlayConfig
// ---------------------------------------------------------------------------

/// Host-overlay display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Display the assembled OCR input image on the host surface while
    /// recognition runs. Useful for sighted assistants and debugging.
    pub show_ocr_input: bool,
    /// Overlay origin on the host surface, in container points.
    pub origin: (f32, f32),
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            show_ocr_input: true,
            origin: (0.0, 20.0),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

/// Settings for the read-text state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Capacity of the machine's event channel. Completions are tiny; this
    /// only needs to absorb bursts of host taps.
    pub event_queue_depth: usize,
    /// Optional per-stage watchdog in milliseconds. `None` trusts the
    /// services to always complete; `Some(ms)` abandons a pass whose
    /// in-flight stage exceeds the deadline.
    pub stage_timeout_ms: Option<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            event_queue_depth: 32,
            stage_timeout_ms: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use world_aloud::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// What the assembler produces for the recognizer.
    pub assembly_mode: AssemblyMode,
    /// Spoken announcement phrases.
    pub announce: AnnounceConfig,
    /// Host-overlay display settings.
    pub overlay: OverlayConfig,
    /// State-machine settings.
    pub workflow: WorkflowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assembly_mode: AssemblyMode::default(),
            announce: AnnounceConfig::default(),
            overlay: OverlayConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.assembly_mode, loaded.assembly_mode);
        assert_eq!(original.announce.camera_ready, loaded.announce.camera_ready);
        assert_eq!(original.announce.processing, loaded.announce.processing);
        assert_eq!(original.announce.no_text, loaded.announce.no_text);
        assert_eq!(original.overlay.show_ocr_input, loaded.overlay.show_ocr_input);
        assert_eq!(original.overlay.origin, loaded.overlay.origin);
        assert_eq!(
            original.workflow.event_queue_depth,
            loaded.workflow.event_queue_depth
        );
        assert_eq!(
            original.workflow.stage_timeout_ms,
            loaded.workflow.stage_timeout_ms
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.assembly_mode, default.assembly_mode);
        assert_eq!(config.announce.no_text, default.announce.no_text);
        assert_eq!(
            config.workflow.event_queue_depth,
            default.workflow.event_queue_depth
        );
    }

    /// Verify the default phrases — these are user-facing speech.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.assembly_mode, AssemblyMode::TextRegions);
        assert_eq!(cfg.announce.camera_ready, "Camera view. Tap to start.");
        assert_eq!(cfg.announce.processing, "Processing.");
        assert_eq!(cfg.announce.no_text, "No text found.");
        assert!(cfg.overlay.show_ocr_input);
        assert_eq!(cfg.overlay.origin, (0.0, 20.0));
        assert_eq!(cfg.workflow.event_queue_depth, 32);
        assert!(cfg.workflow.stage_timeout_ms.is_none());
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.assembly_mode = AssemblyMode::FullFrame;
        cfg.announce.no_text = "Nothing to read.".into();
        cfg.overlay.show_ocr_input = false;
        cfg.workflow.stage_timeout_ms = Some(5_000);

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.assembly_mode, AssemblyMode::FullFrame);
        assert_eq!(loaded.announce.no_text, "Nothing to read.");
        assert!(!loaded.overlay.show_ocr_input);
        assert_eq!(loaded.workflow.stage_timeout_ms, Some(5_000));
    }
}
