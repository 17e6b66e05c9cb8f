//! # parley-pipeline
//!
//! Orchestrates a transcription capability and an optional diarization
//! capability over audio inputs, and merges their results into one
//! speaker-attributed [`Transcript`](parley_core::Transcript).
//!
//! - [`Pipeline::process`]: one input, stages in parallel or in sequence
//! - [`Pipeline::process_batch`]: many inputs, bounded concurrency
//! - [`Pipeline::scoped`]: load capabilities, run work, always unload
//!
//! Capabilities are traits ([`TranscriptionCapability`],
//! [`DiarizationCapability`]); [`sidecar`] has file-backed implementations.

#![deny(unsafe_code)]

pub mod batch;
pub mod capability;
pub mod errors;
mod lifecycle;
pub mod merge;
pub mod options;
pub mod pipeline;
pub mod sidecar;

pub use batch::{BatchFailure, BatchOutcome};
pub use capability::{
    CapabilityError, Diarization, DiarizationCapability, DiarizationHints, ResultExt,
    TranscribeOptions, TranscriptionCapability,
};
pub use errors::{PipelineError, Stage};
pub use options::ProcessOptions;
pub use pipeline::{Pipeline, ProcessingMode};
pub use tokio_util::sync::CancellationToken;
