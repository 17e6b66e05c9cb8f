//! Transcript data model.
//!
//! A [`Transcript`] is produced by a transcription capability with bare
//! [`Segment`]s, then annotated by the pipeline with the [`Speaker`]s a
//! diarization capability found. [`DiarizationTurn`]s are the transient
//! speaker intervals consumed by the merge step.
//!
//! All types serialize with camelCase field names; the transcript is the
//! artifact that renderers and persistence layers consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{SegmentId, TranscriptId};

/// A transcribed span of speech.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Unique segment identifier.
    pub id: SegmentId,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds (`>= start`).
    pub end: f64,
    /// Recognized text.
    pub text: String,
    /// Speaker attribution, set only by the merge step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_id: Option<String>,
    /// Recognizer confidence (backend-specific scale, e.g. average log probability).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Language code of this segment.
    pub language: String,
}

impl Segment {
    /// Create an unattributed segment with a fresh ID.
    pub fn new(
        start: f64,
        end: f64,
        text: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: SegmentId::new(),
            start,
            end,
            text: text.into(),
            speaker_id: None,
            confidence: None,
            language: language.into(),
        }
    }

    /// Segment length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// `[MM:SS -> MM:SS]` label for this segment.
    pub fn time_label(&self) -> String {
        format!("[{} -> {}]", clock(self.start), clock(self.end))
    }

    /// One display line: `[MM:SS -> MM:SS][SPEAKER_00]: text`.
    ///
    /// The speaker tag is omitted when `include_speaker` is false or the
    /// segment is unattributed.
    pub fn formatted(&self, include_speaker: bool) -> String {
        match (&self.speaker_id, include_speaker) {
            (Some(speaker), true) => format!("{}[{speaker}]: {}", self.time_label(), self.text),
            _ => format!("{}: {}", self.time_label(), self.text),
        }
    }
}

/// A speaker found by diarization, with speaking-time accumulators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    /// Speaker label, e.g. `SPEAKER_00`.
    pub id: String,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Total seconds attributed to this speaker.
    #[serde(default)]
    pub total_speaking_time: f64,
    /// Number of turns attributed to this speaker.
    #[serde(default)]
    pub segment_count: u32,
}

impl Speaker {
    /// Create a speaker with zeroed accumulators.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            total_speaking_time: 0.0,
            segment_count: 0,
        }
    }

    /// Account for one more turn of `duration` seconds.
    pub fn record_turn(&mut self, duration: f64) {
        self.total_speaking_time += duration.max(0.0);
        self.segment_count += 1;
    }
}

/// One contiguous speaker interval from diarization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiarizationTurn {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Speaker label.
    pub speaker_id: String,
}

impl DiarizationTurn {
    /// Create a turn.
    pub fn new(start: f64, end: f64, speaker_id: impl Into<String>) -> Self {
        Self {
            start,
            end,
            speaker_id: speaker_id.into(),
        }
    }

    /// Turn length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Build the speaker list for a set of turns.
///
/// Speakers appear in first-appearance order, each accumulating the
/// duration and count of its turns.
pub fn speakers_from_turns(turns: &[DiarizationTurn]) -> Vec<Speaker> {
    let mut speakers: Vec<Speaker> = Vec::new();
    for turn in turns {
        let idx = match speakers.iter().position(|s| s.id == turn.speaker_id) {
            Some(idx) => idx,
            None => {
                speakers.push(Speaker::new(turn.speaker_id.clone()));
                speakers.len() - 1
            }
        };
        speakers[idx].record_turn(turn.duration());
    }
    speakers
}

/// A complete, optionally speaker-attributed transcript of one audio input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// Unique transcript identifier.
    pub id: TranscriptId,
    /// Reference to the audio this transcript was produced from.
    pub audio_ref: String,
    /// Segments in temporal order.
    pub segments: Vec<Segment>,
    /// Speakers found by diarization (empty when diarization did not run).
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    /// Primary language code.
    pub language: String,
    /// Wall-clock processing time in seconds.
    #[serde(default)]
    pub processing_time: f64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Open key/value metadata (engine name, audio duration, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Transcript {
    /// Create an empty transcript for `audio_ref`.
    pub fn new(audio_ref: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: TranscriptId::new(),
            audio_ref: audio_ref.into(),
            segments: Vec::new(),
            speakers: Vec::new(),
            language: language.into(),
            processing_time: 0.0,
            created_at: Utc::now(),
            metadata: Map::new(),
        }
    }

    /// Number of segments.
    pub fn total_segments(&self) -> usize {
        self.segments.len()
    }

    /// Plain text of all segments joined by single spaces.
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One [`Segment::formatted`] line per segment, speaker tags included.
    pub fn formatted_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.formatted(true))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Look up a speaker by ID.
    pub fn speaker(&self, id: &str) -> Option<&Speaker> {
        self.speakers.iter().find(|s| s.id == id)
    }

    /// All segments attributed to `speaker_id`, in order.
    pub fn segments_for_speaker<'a>(
        &'a self,
        speaker_id: &'a str,
    ) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments
            .iter()
            .filter(move |s| s.speaker_id.as_deref() == Some(speaker_id))
    }

    /// Text of segments inside `[start, end]` or straddling either boundary.
    pub fn text_in_range(&self, start: f64, end: f64) -> String {
        self.segments
            .iter()
            .filter(|s| {
                (s.start >= start && s.end <= end)
                    || (s.start <= start && start <= s.end)
                    || (s.start <= end && end <= s.end)
            })
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render as SubRip subtitles.
    ///
    /// Cues are numbered from 1; attributed segments are prefixed with
    /// `[SPEAKER] `. Every cue, including the last, ends with a blank line.
    pub fn to_srt(&self) -> String {
        let mut out = String::new();
        for (idx, seg) in self.segments.iter().enumerate() {
            out.push_str(&format!("{}\n", idx + 1));
            out.push_str(&format!("{} --> {}\n", srt_timestamp(seg.start), srt_timestamp(seg.end)));
            if let Some(ref speaker) = seg.speaker_id {
                out.push_str(&format!("[{speaker}] "));
            }
            out.push_str(&seg.text);
            out.push_str("\n\n");
        }
        out
    }
}

/// `MM:SS` with minutes unbounded.
fn clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `HH:MM:SS,mmm` as used by SubRip.
pub fn srt_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds as u64;
    let millis = (seconds.fract() * 1000.0) as u64;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        whole / 3600,
        (whole % 3600) / 60,
        whole % 60,
        millis
    )
}
