//! # parley-core
//!
//! Foundation types for the parley transcription pipeline: the transcript
//! data model ([`Transcript`], [`Segment`], [`Speaker`], [`DiarizationTurn`])
//! and branded IDs.
//!
//! ## Crate Position
//!
//! Standalone (no parley crate dependencies).
//! Depended on by: parley-pipeline, parley-cli.

#![deny(unsafe_code)]

pub mod ids;
pub mod transcript;

pub use ids::{SegmentId, TranscriptId};
pub use transcript::{
    DiarizationTurn, Segment, Speaker, Transcript, speakers_from_turns, srt_timestamp,
};
