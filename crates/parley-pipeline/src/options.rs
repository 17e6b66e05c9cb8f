//! Per-call processing options.

use std::time::Duration;

use parley_settings::ParleySettings;

use crate::capability::{DiarizationHints, TranscribeOptions};

/// Options for one [`Pipeline::process`](crate::Pipeline::process) call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Run diarization when a diarization capability is configured.
    pub enable_diarization: bool,
    /// Run the two stages concurrently instead of one after the other.
    pub parallel: bool,
    /// Speaker-count hints for diarization.
    pub hints: DiarizationHints,
    /// Options forwarded to transcription.
    pub transcribe: TranscribeOptions,
    /// Upper bound on each capability call.
    pub stage_timeout: Option<Duration>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            enable_diarization: true,
            parallel: true,
            hints: DiarizationHints::default(),
            transcribe: TranscribeOptions::default(),
            stage_timeout: None,
        }
    }
}

impl ProcessOptions {
    /// Skip diarization.
    #[must_use]
    pub fn without_diarization(mut self) -> Self {
        self.enable_diarization = false;
        self
    }

    /// Run transcription, then diarization.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the exact speaker count hint.
    #[must_use]
    pub fn with_num_speakers(mut self, n: u32) -> Self {
        self.hints.num_speakers = Some(n);
        self
    }

    /// Bound every capability call by `timeout`.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Force the transcription language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.transcribe.language = Some(language.into());
        self
    }

    /// The speaker-count hint, if any.
    pub fn num_speakers(&self) -> Option<u32> {
        self.hints.num_speakers
    }
}

impl From<&ParleySettings> for ProcessOptions {
    fn from(settings: &ParleySettings) -> Self {
        let t = &settings.transcription;
        let d = &settings.diarization;
        Self {
            enable_diarization: d.enabled,
            parallel: settings.pipeline.parallel,
            hints: DiarizationHints {
                num_speakers: d.num_speakers,
                min_speakers: d.min_speakers,
                max_speakers: d.max_speakers,
            },
            transcribe: TranscribeOptions {
                language: Some(t.language.clone()).filter(|l| !l.is_empty()),
                beam_size: Some(t.beam_size),
                vad_filter: Some(t.vad_enabled),
            },
            stage_timeout: settings.pipeline.stage_timeout_ms.map(Duration::from_millis),
        }
    }
}
