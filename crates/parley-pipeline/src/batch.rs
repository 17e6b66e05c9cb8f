//! Bounded-concurrency batch processing.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use parley_core::Transcript;
use tracing::{info, instrument, warn};

use crate::errors::PipelineError;
use crate::options::ProcessOptions;
use crate::pipeline::Pipeline;

/// One input that failed in a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the input in the batch.
    pub index: usize,
    /// The input's audio reference.
    pub audio_ref: PathBuf,
    /// Why it failed.
    pub error: PipelineError,
}

/// Result of [`Pipeline::process_batch`].
///
/// Both lists are in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Transcripts of the inputs that succeeded.
    pub transcripts: Vec<Transcript>,
    /// Inputs that failed.
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// Number of successful inputs.
    pub fn succeeded(&self) -> usize {
        self.transcripts.len()
    }

    /// Number of failed inputs.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every input succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Pipeline {
    /// Process many inputs with at most `max_concurrent` in flight.
    ///
    /// Inputs are admitted in order. A failing input is recorded in
    /// [`BatchOutcome::failures`] and never affects the others; a capability
    /// panic surfaces as [`PipelineError::Panicked`] for that input alone.
    /// This call itself cannot fail. `max_concurrent` of 0 is treated as 1.
    #[instrument(
        skip_all,
        fields(inputs = audio_refs.len(), max_concurrent = max_concurrent.max(1))
    )]
    pub async fn process_batch<P: AsRef<Path> + Sync>(
        &self,
        audio_refs: &[P],
        max_concurrent: usize,
        options: &ProcessOptions,
    ) -> BatchOutcome {
        let limit = max_concurrent.max(1);

        let mut results: Vec<(usize, Result<Transcript, PipelineError>)> =
            stream::iter(audio_refs.iter().enumerate())
                .map(|(index, audio)| async move {
                    (index, self.process(audio.as_ref(), options).await)
                })
                .buffer_unordered(limit)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        let mut outcome = BatchOutcome::default();
        for (index, result) in results {
            match result {
                Ok(transcript) => outcome.transcripts.push(transcript),
                Err(error) => {
                    let audio_ref = audio_refs[index].as_ref().to_path_buf();
                    warn!(index, audio = %audio_ref.display(), error = %error, "batch item failed");
                    outcome.failures.push(BatchFailure {
                        index,
                        audio_ref,
                        error,
                    });
                }
            }
        }

        info!(
            succeeded = outcome.succeeded(),
            failed = outcome.failed(),
            "batch finished"
        );
        outcome
    }
}
