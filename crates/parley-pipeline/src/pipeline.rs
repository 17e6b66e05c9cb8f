//! Single-input orchestration: transcription, optional diarization, merge.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use parley_core::Transcript;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, instrument};

use crate::capability::{
    CapabilityError, Diarization, DiarizationCapability, TranscriptionCapability,
};
use crate::errors::{PipelineError, Stage};
use crate::merge::merge_diarization;
use crate::options::ProcessOptions;

/// How a call was executed, recorded in `metadata["pipeline.mode"]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Diarization disabled or not configured.
    TranscriptionOnly,
    /// Both stages concurrently.
    Parallel,
    /// Transcription, then diarization.
    Sequential,
}

impl ProcessingMode {
    /// Metadata value for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TranscriptionOnly => "transcription-only",
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        }
    }
}

/// Orchestrates a transcription capability and an optional diarization
/// capability over audio inputs.
///
/// Cheap to clone; capabilities are shared.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) transcriber: Arc<dyn TranscriptionCapability>,
    pub(crate) diarizer: Option<Arc<dyn DiarizationCapability>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("transcriber", &self.transcriber.name())
            .field("diarizer", &self.diarizer.as_ref().map(|d| d.name()))
            .finish()
    }
}

impl Pipeline {
    /// Create a transcription-only pipeline.
    pub fn new(transcriber: Arc<dyn TranscriptionCapability>) -> Self {
        Self {
            transcriber,
            diarizer: None,
        }
    }

    /// Attach a diarization capability.
    #[must_use]
    pub fn with_diarizer(mut self, diarizer: Arc<dyn DiarizationCapability>) -> Self {
        self.diarizer = Some(diarizer);
        self
    }

    /// Whether a diarization capability is configured.
    pub fn has_diarizer(&self) -> bool {
        self.diarizer.is_some()
    }

    /// The mode a call with `options` would run in.
    pub fn mode(&self, options: &ProcessOptions) -> ProcessingMode {
        match (&self.diarizer, options.enable_diarization, options.parallel) {
            (None, _, _) | (_, false, _) => ProcessingMode::TranscriptionOnly,
            (Some(_), true, true) => ProcessingMode::Parallel,
            (Some(_), true, false) => ProcessingMode::Sequential,
        }
    }

    /// Process one audio input.
    pub async fn process(
        &self,
        audio: &Path,
        options: &ProcessOptions,
    ) -> Result<Transcript, PipelineError> {
        self.process_with_cancel(audio, options, &CancellationToken::new())
            .await
    }

    /// Process one audio input, aborting when `cancel` fires.
    ///
    /// In parallel mode the first failing stage fails the whole call and the
    /// other stage's future is dropped. No partial transcript is returned.
    #[instrument(skip_all, fields(audio = %audio.display(), mode = tracing::field::Empty))]
    pub async fn process_with_cancel(
        &self,
        audio: &Path,
        options: &ProcessOptions,
        cancel: &CancellationToken,
    ) -> Result<Transcript, PipelineError> {
        let started = Instant::now();
        let mode = self.mode(options);
        let _ = Span::current().record("mode", mode.as_str());
        debug!(transcriber = self.transcriber.name(), "processing");

        let result = match (mode, &self.diarizer) {
            (ProcessingMode::Parallel, Some(diarizer)) => {
                let (transcript, diarization) = tokio::try_join!(
                    self.transcribe(audio, options, cancel),
                    diarize(diarizer.as_ref(), audio, options, cancel),
                )?;
                Ok(merged(transcript, diarization))
            }
            (ProcessingMode::Sequential, Some(diarizer)) => {
                let transcript = self.transcribe(audio, options, cancel).await?;
                let diarization = diarize(diarizer.as_ref(), audio, options, cancel).await?;
                Ok(merged(transcript, diarization))
            }
            _ => self.transcribe(audio, options, cancel).await,
        };

        match result {
            Ok(mut transcript) => {
                transcript.processing_time = started.elapsed().as_secs_f64();
                let _ = transcript
                    .metadata
                    .insert("pipeline.mode".into(), mode.as_str().into());
                info!(
                    segments = transcript.segments.len(),
                    speakers = transcript.speakers.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "processed"
                );
                Ok(transcript)
            }
            Err(e) => {
                error!(stage = %e.stage(), error = %e, "processing failed");
                Err(e)
            }
        }
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: &ProcessOptions,
        cancel: &CancellationToken,
    ) -> Result<Transcript, PipelineError> {
        run_stage(
            Stage::Transcription,
            options.stage_timeout,
            cancel,
            self.transcriber.transcribe(audio, &options.transcribe),
        )
        .await
    }
}

async fn diarize(
    diarizer: &dyn DiarizationCapability,
    audio: &Path,
    options: &ProcessOptions,
    cancel: &CancellationToken,
) -> Result<Diarization, PipelineError> {
    run_stage(
        Stage::Diarization,
        options.stage_timeout,
        cancel,
        diarizer.diarize(audio, &options.hints),
    )
    .await
}

fn merged(mut transcript: Transcript, diarization: Diarization) -> Transcript {
    merge_diarization(&mut transcript, diarization);
    transcript
}

/// Drive one capability call under the stage timeout and cancellation token.
///
/// A panicking call becomes [`PipelineError::Panicked`] for its stage.
async fn run_stage<T, F>(
    stage: Stage,
    limit: Option<Duration>,
    cancel: &CancellationToken,
    call: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, CapabilityError>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();
    let bounded = async {
        let outcome = match limit {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(PipelineError::Timeout { stage, after }),
            },
            None => call.await,
        };
        match outcome {
            Ok(result) => result.map_err(|e| PipelineError::from_capability(stage, e)),
            Err(payload) => Err(PipelineError::Panicked {
                stage,
                message: panic_message(payload.as_ref()),
            }),
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
        result = bounded => result,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
