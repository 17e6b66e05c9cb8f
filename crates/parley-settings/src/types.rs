//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file only needs the fields it overrides.

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// Transcription capability settings.
    pub transcription: TranscriptionSettings,
    /// Diarization capability settings.
    pub diarization: DiarizationSettings,
    /// Orchestration settings.
    pub pipeline: PipelineSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl ParleySettings {
    /// Correct out-of-range values in place.
    ///
    /// Called automatically during loading. Values are corrected with a
    /// warning rather than rejected.
    pub fn validate(&mut self) {
        if self.pipeline.max_concurrent == 0 {
            tracing::warn!("pipeline.maxConcurrent is 0, using 1");
            self.pipeline.max_concurrent = 1;
        }

        let d = &mut self.diarization;
        if let (Some(min), Some(max)) = (d.min_speakers, d.max_speakers) {
            if min > max {
                tracing::warn!(min, max, "diarization.minSpeakers > maxSpeakers, swapping");
                d.min_speakers = Some(max);
                d.max_speakers = Some(min);
            }
        }
        if d.num_speakers == Some(0) {
            tracing::warn!("diarization.numSpeakers is 0, ignoring hint");
            d.num_speakers = None;
        }
    }
}

/// Transcription capability settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionSettings {
    /// Capability backend name.
    pub engine: String,
    /// Model name or size.
    pub model: String,
    /// Inference device (`cuda`, `cpu`).
    pub device: String,
    /// Numeric precision for local inference.
    pub compute_type: String,
    /// Default language code.
    pub language: String,
    /// Beam search width.
    pub beam_size: u32,
    /// Whether voice-activity filtering is enabled.
    pub vad_enabled: bool,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            engine: "sidecar".to_string(),
            model: "large-v3".to_string(),
            device: "cuda".to_string(),
            compute_type: "float16".to_string(),
            language: "zh".to_string(),
            beam_size: 5,
            vad_enabled: true,
        }
    }
}

/// Diarization capability settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiarizationSettings {
    /// Whether diarization runs by default.
    pub enabled: bool,
    /// Capability backend name.
    pub engine: String,
    /// Model name.
    pub model: String,
    /// Inference device.
    pub device: String,
    /// Exact speaker count hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_speakers: Option<u32>,
    /// Lower bound on the speaker count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speakers: Option<u32>,
    /// Upper bound on the speaker count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speakers: Option<u32>,
}

impl Default for DiarizationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: "rttm".to_string(),
            model: "pyannote/speaker-diarization-3.1".to_string(),
            device: "cuda".to_string(),
            num_speakers: None,
            min_speakers: None,
            max_speakers: None,
        }
    }
}

/// Orchestration settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Run transcription and diarization concurrently.
    pub parallel: bool,
    /// Maximum concurrent inputs in batch mode.
    pub max_concurrent: usize,
    /// Per-stage timeout in milliseconds (`None` = unbounded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timeout_ms: Option<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            max_concurrent: 2,
            stage_timeout_ms: None,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`..`error`); `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
