use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parley_core::DiarizationTurn;
use parley_settings::DiarizationSettings;
use tracing::{debug, info, warn};

use super::ensure_audio;
use crate::capability::{
    CapabilityError, Diarization, DiarizationCapability, DiarizationHints, ResultExt,
};

/// `<stem>.rttm` next to `audio`.
pub fn rttm_path(audio: &Path) -> PathBuf {
    audio.with_extension("rttm")
}

/// Parse NIST RTTM speaker records into turns, in file order.
///
/// Only `SPEAKER` records are read:
///
/// ```text
/// SPEAKER <file> <chan> <onset> <duration> <NA> <NA> <speaker> <NA> <NA>
/// ```
///
/// Blank lines, `#`/`;` comments and other record types are skipped. A
/// malformed `SPEAKER` record is an error naming its 1-based line number.
pub fn parse_rttm(content: &str) -> Result<Vec<DiarizationTurn>, CapabilityError> {
    let mut turns = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields[0] != "SPEAKER" {
            continue;
        }

        let lineno = idx + 1;
        let bad = |why: &str| CapabilityError::Malformed(format!("rttm line {lineno}: {why}"));
        if fields.len() < 8 {
            return Err(bad("expected at least 8 fields"));
        }
        let onset: f64 = fields[3].parse().map_err(|_| bad("invalid onset"))?;
        let duration: f64 = fields[4].parse().map_err(|_| bad("invalid duration"))?;
        if !onset.is_finite() || !duration.is_finite() || onset < 0.0 || duration < 0.0 {
            return Err(bad("negative or non-finite time"));
        }
        turns.push(DiarizationTurn::new(onset, onset + duration, fields[7]));
    }
    Ok(turns)
}

/// Diarization from `<stem>.rttm` files.
///
/// Speaker-count hints cannot re-cluster a precomputed file; a mismatch is
/// logged and the file wins.
#[derive(Debug)]
pub struct RttmDiarizer {
    model: String,
    device: String,
    loaded: AtomicBool,
}

impl Default for RttmDiarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RttmDiarizer {
    /// Create an unloaded diarizer.
    pub fn new() -> Self {
        Self {
            model: "rttm".into(),
            device: "cpu".into(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Create from diarization settings.
    pub fn from_settings(settings: &DiarizationSettings) -> Self {
        Self {
            model: settings.model.clone(),
            device: settings.device.clone(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Whether [`load`](DiarizationCapability::load) has run.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

fn check_hints(found: usize, hints: &DiarizationHints) {
    let found = found as u32;
    if let Some(n) = hints.num_speakers {
        if n != found {
            warn!(expected = n, found, "speaker count differs from hint");
        }
    }
    let below = hints.min_speakers.is_some_and(|min| found < min);
    let above = hints.max_speakers.is_some_and(|max| found > max);
    if below || above {
        warn!(
            found,
            min = hints.min_speakers,
            max = hints.max_speakers,
            "speaker count outside hinted range"
        );
    }
}

#[async_trait]
impl DiarizationCapability for RttmDiarizer {
    fn name(&self) -> &'static str {
        "rttm"
    }

    async fn load(&self) -> Result<(), CapabilityError> {
        if !self.loaded.swap(true, Ordering::SeqCst) {
            info!(model = %self.model, device = %self.device, "rttm diarizer loaded");
        }
        Ok(())
    }

    async fn unload(&self) -> Result<(), CapabilityError> {
        if self.loaded.swap(false, Ordering::SeqCst) {
            info!("rttm diarizer unloaded");
        }
        Ok(())
    }

    async fn diarize(
        &self,
        audio: &Path,
        hints: &DiarizationHints,
    ) -> Result<Diarization, CapabilityError> {
        if !self.is_loaded() {
            debug!("diarizer not loaded, loading lazily");
            self.load().await?;
        }
        ensure_audio(audio).await?;

        let path = rttm_path(audio);
        let content = tokio::fs::read_to_string(&path)
            .await
            .malformed(&format!("rttm {}", path.display()))?;
        let diarization = Diarization::from_turns(parse_rttm(&content)?);
        check_hints(diarization.speakers.len(), hints);
        debug!(
            audio = %audio.display(),
            turns = diarization.turns.len(),
            speakers = diarization.speakers.len(),
            "rttm read"
        );
        Ok(diarization)
    }
}
