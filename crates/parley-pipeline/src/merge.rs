//! Speaker attribution: fold diarization turns into transcript segments.
//!
//! Everything here is synchronous. Each segment is scored against every turn
//! (O(segments x turns)); inputs are one recording, so that stays small.

use parley_core::{DiarizationTurn, Segment, Speaker, Transcript};
use tracing::{debug, warn};

use crate::capability::Diarization;

/// Seconds of overlap between `[start, end]` and a turn, floored at zero.
pub fn overlap(start: f64, end: f64, turn: &DiarizationTurn) -> f64 {
    (end.min(turn.end) - start.max(turn.start)).max(0.0)
}

/// The turn overlapping `segment` the most.
///
/// Only a strictly greater overlap replaces the current best, so among equal
/// overlaps the earliest turn in `turns` wins. Returns `None` when nothing
/// overlaps by more than zero.
pub fn best_turn<'a>(
    segment: &Segment,
    turns: &'a [DiarizationTurn],
) -> Option<&'a DiarizationTurn> {
    let mut best: Option<&DiarizationTurn> = None;
    let mut best_overlap = 0.0;
    for turn in turns {
        let o = overlap(segment.start, segment.end, turn);
        if o > best_overlap {
            best = Some(turn);
            best_overlap = o;
        }
    }
    best
}

/// Set `speaker_id` on every segment from its best turn.
///
/// Segments with no positive overlap end up with `None`, including any that
/// arrived with a stray id. Order and count are untouched. Returns how many
/// segments were attributed.
pub fn assign_speakers(segments: &mut [Segment], turns: &[DiarizationTurn]) -> usize {
    let mut attributed = 0;
    for segment in segments.iter_mut() {
        segment.speaker_id = best_turn(segment, turns).map(|t| t.speaker_id.clone());
        if segment.speaker_id.is_some() {
            attributed += 1;
        }
    }
    attributed
}

/// Attach a diarization result to a transcript.
///
/// Assigns speakers, installs the speaker list and records the turn count in
/// `metadata["diarization.turns"]`. Any speaker id referenced by a segment but
/// missing from the list is appended as an empty [`Speaker`].
pub fn merge_diarization(transcript: &mut Transcript, diarization: Diarization) {
    let Diarization {
        mut speakers,
        turns,
    } = diarization;

    let attributed = assign_speakers(&mut transcript.segments, &turns);

    for segment in &transcript.segments {
        let Some(id) = segment.speaker_id.as_deref() else {
            continue;
        };
        if !speakers.iter().any(|s| s.id == id) {
            warn!(speaker_id = id, "turn references unknown speaker, adding it");
            speakers.push(Speaker::new(id));
        }
    }

    debug!(
        segments = transcript.segments.len(),
        turns = turns.len(),
        attributed,
        speakers = speakers.len(),
        "merged diarization"
    );

    transcript.speakers = speakers;
    let _ = transcript
        .metadata
        .insert("diarization.turns".into(), turns.len().into());
}
