//! Capability interfaces consumed by the pipeline.
//!
//! A capability is whatever actually produces results: a cloud API client,
//! a local model, or precomputed sidecar files. The pipeline only sees these
//! traits; concrete backends sit behind `Arc<dyn ...>`.
//!
//! Implementations must be `Send + Sync`. One that cannot serve concurrent
//! calls must serialize internally (or the caller must run batches with
//! `max_concurrent = 1`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_core::{DiarizationTurn, Speaker, Transcript, speakers_from_turns};

/// Errors reported by a capability.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The audio reference does not resolve to a readable resource.
    #[error("audio not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The backing resource is not loaded and cannot be loaded lazily.
    #[error("capability not loaded")]
    NotLoaded,

    /// Backend call or model inference failed.
    #[error("inference error: {0}")]
    Inference(String),

    /// Backend returned data that could not be interpreted.
    #[error("malformed result: {0}")]
    Malformed(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extension trait to reduce `.map_err()` boilerplate when wrapping errors
/// into [`CapabilityError`].
pub trait ResultExt<T> {
    /// Wrap the error as [`CapabilityError::Inference`] with `context` prefix.
    fn inference(self, context: &str) -> Result<T, CapabilityError>;
    /// Wrap the error as [`CapabilityError::Malformed`] with `context` prefix.
    fn malformed(self, context: &str) -> Result<T, CapabilityError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn inference(self, context: &str) -> Result<T, CapabilityError> {
        self.map_err(|e| CapabilityError::Inference(format!("{context}: {e}")))
    }
    fn malformed(self, context: &str) -> Result<T, CapabilityError> {
        self.map_err(|e| CapabilityError::Malformed(format!("{context}: {e}")))
    }
}

/// Per-call transcription options. `None` means "capability default".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranscribeOptions {
    /// Language code to force (e.g. `"en"`).
    pub language: Option<String>,
    /// Beam search width.
    pub beam_size: Option<u32>,
    /// Voice-activity filtering.
    pub vad_filter: Option<bool>,
}

/// Speaker-count hints forwarded to diarization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiarizationHints {
    /// Exact number of speakers, if known.
    pub num_speakers: Option<u32>,
    /// Lower bound on the number of speakers.
    pub min_speakers: Option<u32>,
    /// Upper bound on the number of speakers.
    pub max_speakers: Option<u32>,
}

/// Result of one diarization call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diarization {
    /// Speakers with accumulated speaking time.
    pub speakers: Vec<Speaker>,
    /// Speaker turns in backend output order.
    pub turns: Vec<DiarizationTurn>,
}

impl Diarization {
    /// Build a result from turns, deriving the speaker list.
    pub fn from_turns(turns: Vec<DiarizationTurn>) -> Self {
        Self {
            speakers: speakers_from_turns(&turns),
            turns,
        }
    }
}

/// Speech-to-text capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionCapability: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Acquire the backing resource (model weights, client).
    async fn load(&self) -> Result<(), CapabilityError>;

    /// Release the backing resource.
    async fn unload(&self) -> Result<(), CapabilityError>;

    /// Transcribe `audio`.
    ///
    /// The returned transcript has no speakers and no segment attribution.
    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript, CapabilityError>;
}

/// Speaker diarization capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiarizationCapability: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Acquire the backing resource.
    async fn load(&self) -> Result<(), CapabilityError>;

    /// Release the backing resource.
    async fn unload(&self) -> Result<(), CapabilityError>;

    /// Find who spoke when in `audio`.
    async fn diarize(
        &self,
        audio: &Path,
        hints: &DiarizationHints,
    ) -> Result<Diarization, CapabilityError>;
}
