//! Capability load/unload around a unit of work.
//!
//! Rust has no async `Drop`, so scoped acquisition is a closure:
//! [`Pipeline::scoped`] loads, runs the body, and unloads on every exit path.
//! If the scope future itself is dropped mid-flight (a timeout, `select!`,
//! task abort), a guard hands the release to a spawned task.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{info, instrument, warn};

use crate::errors::{PipelineError, Stage};
use crate::pipeline::Pipeline;

impl Pipeline {
    /// Load transcription, then diarization.
    ///
    /// If diarization fails to load, transcription is unloaded again before
    /// the error is returned.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<(), PipelineError> {
        self.transcriber
            .load()
            .await
            .map_err(|source| PipelineError::Load {
                stage: Stage::Transcription,
                source,
            })?;

        if let Some(diarizer) = &self.diarizer {
            if let Err(source) = diarizer.load().await {
                warn!(error = %source, "diarization load failed, unloading transcription");
                if let Err(e) = self.transcriber.unload().await {
                    warn!(error = %e, "transcription unload failed during rollback");
                }
                return Err(PipelineError::Load {
                    stage: Stage::Diarization,
                    source,
                });
            }
        }

        info!(
            transcriber = self.transcriber.name(),
            diarizer = self.diarizer.as_ref().map(|d| d.name()),
            "capabilities loaded"
        );
        Ok(())
    }

    /// Unload diarization, then transcription.
    ///
    /// Best-effort: both are attempted regardless of failures, which are
    /// logged and returned.
    #[instrument(skip(self))]
    pub async fn release(&self) -> Vec<PipelineError> {
        let mut failures = Vec::new();

        if let Some(diarizer) = &self.diarizer {
            if let Err(source) = diarizer.unload().await {
                warn!(error = %source, "diarization unload failed");
                failures.push(PipelineError::Unload {
                    stage: Stage::Diarization,
                    source,
                });
            }
        }
        if let Err(source) = self.transcriber.unload().await {
            warn!(error = %source, "transcription unload failed");
            failures.push(PipelineError::Unload {
                stage: Stage::Transcription,
                source,
            });
        }

        if failures.is_empty() {
            info!("capabilities released");
        }
        failures
    }

    /// Run `body` with capabilities loaded.
    ///
    /// Resources are released whether the body returns or panics; a panic is
    /// resumed after release. Release failures are logged only. The returned
    /// error is always an acquisition error; the body's own result comes back
    /// inside `Ok`.
    ///
    /// Dropping the returned future after acquisition still releases: the
    /// release is spawned on the current runtime.
    pub async fn scoped<'a, F, Fut, T>(&'a self, body: F) -> Result<T, PipelineError>
    where
        F: FnOnce(&'a Pipeline) -> Fut,
        Fut: Future<Output = T> + 'a,
    {
        self.acquire().await?;
        let guard = ReleaseGuard::arm(self);

        let outcome = AssertUnwindSafe(async { body(self).await })
            .catch_unwind()
            .await;

        let failures = self.release().await;
        guard.disarm();
        if !failures.is_empty() {
            warn!(count = failures.len(), "release finished with errors");
        }

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Releases in the background if dropped while still armed.
struct ReleaseGuard {
    pipeline: Option<Pipeline>,
}

impl ReleaseGuard {
    fn arm(pipeline: &Pipeline) -> Self {
        Self {
            pipeline: Some(pipeline.clone()),
        }
    }

    fn disarm(mut self) {
        self.pipeline = None;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let Some(pipeline) = self.pipeline.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("scope dropped before release, releasing in background");
                drop(handle.spawn(async move {
                    let failures = pipeline.release().await;
                    if !failures.is_empty() {
                        warn!(count = failures.len(), "background release finished with errors");
                    }
                }));
            }
            Err(_) => warn!("scope dropped outside a runtime, capabilities left loaded"),
        }
    }
}
