//! Pipeline error types.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::capability::CapabilityError;

/// Which capability a failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Speech-to-text.
    Transcription,
    /// Speaker diarization.
    Diarization,
}

impl Stage {
    /// Lowercase stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::Diarization => "diarization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by [`Pipeline`](crate::Pipeline) operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The audio reference does not resolve to a readable resource.
    #[error("{stage}: audio not found: {}", .path.display())]
    NotFound {
        /// Stage that reported the missing audio.
        stage: Stage,
        /// The unresolved reference.
        path: PathBuf,
    },

    /// A capability call failed.
    #[error("{stage} failed: {source}")]
    Capability {
        /// Failing stage.
        stage: Stage,
        /// Underlying capability error.
        source: CapabilityError,
    },

    /// A capability call exceeded the stage timeout.
    #[error("{stage} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Stage that timed out.
        stage: Stage,
        /// Configured bound.
        after: Duration,
    },

    /// The call was cancelled through its cancellation token.
    #[error("{stage} cancelled")]
    Cancelled {
        /// Stage in flight when cancellation fired.
        stage: Stage,
    },

    /// A capability call panicked.
    #[error("{stage} panicked: {message}")]
    Panicked {
        /// Stage whose call panicked.
        stage: Stage,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// Loading a capability's resources failed.
    #[error("failed to load {stage} resources: {source}")]
    Load {
        /// Stage whose load failed.
        stage: Stage,
        /// Underlying capability error.
        source: CapabilityError,
    },

    /// Unloading a capability's resources failed.
    #[error("failed to unload {stage} resources: {source}")]
    Unload {
        /// Stage whose unload failed.
        stage: Stage,
        /// Underlying capability error.
        source: CapabilityError,
    },
}

impl PipelineError {
    /// Attribute a capability error to `stage`.
    ///
    /// [`CapabilityError::NotFound`] is lifted to [`PipelineError::NotFound`].
    pub fn from_capability(stage: Stage, error: CapabilityError) -> Self {
        match error {
            CapabilityError::NotFound(path) => Self::NotFound { stage, path },
            source => Self::Capability { stage, source },
        }
    }

    /// The stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::NotFound { stage, .. }
            | Self::Capability { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage }
            | Self::Panicked { stage, .. }
            | Self::Load { stage, .. }
            | Self::Unload { stage, .. } => *stage,
        }
    }

    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Capability { .. } => "capability",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled { .. } => "cancelled",
            Self::Panicked { .. } => "panic",
            Self::Load { .. } => "load",
            Self::Unload { .. } => "unload",
        }
    }
}
