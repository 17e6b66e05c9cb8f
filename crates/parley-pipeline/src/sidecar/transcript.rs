use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parley_core::{Segment, Transcript};
use parley_settings::TranscriptionSettings;
use serde::Deserialize;
use tracing::{debug, info};

use super::ensure_audio;
use crate::capability::{
    CapabilityError, ResultExt, TranscribeOptions, TranscriptionCapability,
};

/// `<stem>.transcript.json` next to `audio`.
pub fn transcript_sidecar_path(audio: &Path) -> PathBuf {
    audio.with_extension("transcript.json")
}

#[derive(Debug, Deserialize)]
struct SidecarFile {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    segments: Vec<SidecarSegment>,
}

#[derive(Debug, Deserialize)]
struct SidecarSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Transcription from `<stem>.transcript.json` files.
///
/// ```json
/// { "language": "en", "segments": [ { "start": 0.0, "end": 2.1, "text": "Hi" } ] }
/// ```
#[derive(Debug)]
pub struct SidecarTranscriber {
    model: String,
    device: String,
    compute_type: String,
    default_language: String,
    loaded: AtomicBool,
}

impl SidecarTranscriber {
    /// Create a transcriber labelling transcripts with `default_language`
    /// when neither the file nor the call names one.
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            model: "sidecar".into(),
            device: "cpu".into(),
            compute_type: "float32".into(),
            default_language: default_language.into(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Create from transcription settings.
    pub fn from_settings(settings: &TranscriptionSettings) -> Self {
        Self {
            model: settings.model.clone(),
            device: settings.device.clone(),
            compute_type: settings.compute_type.clone(),
            default_language: settings.language.clone(),
            loaded: AtomicBool::new(false),
        }
    }

    /// Whether [`load`](TranscriptionCapability::load) has run.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn parse(
        &self,
        audio: &Path,
        content: &str,
        options: &TranscribeOptions,
    ) -> Result<Transcript, CapabilityError> {
        let context = transcript_sidecar_path(audio).display().to_string();
        let file: SidecarFile = serde_json::from_str(content).malformed(&context)?;

        let language = file
            .language
            .filter(|l| !l.is_empty())
            .or_else(|| options.language.clone())
            .unwrap_or_else(|| self.default_language.clone());

        let mut transcript = Transcript::new(audio.display().to_string(), language.clone());
        for (i, raw) in file.segments.into_iter().enumerate() {
            let valid = raw.start.is_finite()
                && raw.end.is_finite()
                && raw.start >= 0.0
                && raw.end >= raw.start;
            if !valid {
                return Err(CapabilityError::Malformed(format!(
                    "segment {i}: invalid interval {}..{}",
                    raw.start, raw.end
                )));
            }
            let mut segment = Segment::new(raw.start, raw.end, raw.text.trim(), language.clone());
            segment.confidence = raw.confidence;
            transcript.segments.push(segment);
        }

        let meta = &mut transcript.metadata;
        let _ = meta.insert("engine".into(), "sidecar".into());
        let _ = meta.insert("model".into(), self.model.clone().into());
        let _ = meta.insert("device".into(), self.device.clone().into());
        let _ = meta.insert("compute_type".into(), self.compute_type.clone().into());
        if let Some(duration) = file.duration {
            let _ = meta.insert("duration".into(), duration.into());
        }
        Ok(transcript)
    }
}

#[async_trait]
impl TranscriptionCapability for SidecarTranscriber {
    fn name(&self) -> &'static str {
        "sidecar"
    }

    async fn load(&self) -> Result<(), CapabilityError> {
        if !self.loaded.swap(true, Ordering::SeqCst) {
            info!(model = %self.model, device = %self.device, "sidecar transcriber loaded");
        }
        Ok(())
    }

    async fn unload(&self) -> Result<(), CapabilityError> {
        if self.loaded.swap(false, Ordering::SeqCst) {
            info!("sidecar transcriber unloaded");
        }
        Ok(())
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript, CapabilityError> {
        if !self.is_loaded() {
            debug!("transcriber not loaded, loading lazily");
            self.load().await?;
        }
        ensure_audio(audio).await?;

        let path = transcript_sidecar_path(audio);
        let content = tokio::fs::read_to_string(&path)
            .await
            .malformed(&format!("transcript sidecar {}", path.display()))?;
        let transcript = self.parse(audio, &content, options)?;
        debug!(
            audio = %audio.display(),
            segments = transcript.segments.len(),
            language = %transcript.language,
            "transcript sidecar read"
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn write_pair(dir: &Path, stem: &str, sidecar: &str) -> PathBuf {
        let audio = dir.join(format!("{stem}.wav"));
        std::fs::write(&audio, b"RIFF").unwrap();
        std::fs::write(transcript_sidecar_path(&audio), sidecar).unwrap();
        audio
    }

    #[test]
    fn sidecar_path_replaces_extension() {
        assert_eq!(
            transcript_sidecar_path(Path::new("/a/meeting.wav")),
            PathBuf::from("/a/meeting.transcript.json")
        );
    }

    #[tokio::test]
    async fn reads_segments_and_trims_text() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_pair(
            dir.path(),
            "meeting",
            r#"{"language": "en", "duration": 5.0, "segments": [
                {"start": 0.0, "end": 2.0, "text": "  hello ", "confidence": 0.9},
                {"start": 2.0, "end": 5.0, "text": "world"}
            ]}"#,
        );

        let t = SidecarTranscriber::new("zh");
        let out = t.transcribe(&audio, &TranscribeOptions::default()).await.unwrap();
        assert_eq!(out.language, "en");
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.segments[0].text, "hello");
        assert_eq!(out.segments[0].confidence, Some(0.9));
        assert_eq!(out.segments[1].confidence, None);
        assert!(out.segments.iter().all(|s| s.speaker_id.is_none()));
        assert!(out.speakers.is_empty());
        assert_eq!(out.metadata["engine"], "sidecar");
        assert_eq!(out.metadata["duration"], 5.0);
        assert_eq!(out.metadata["compute_type"], "float32");
        assert!(t.is_loaded());
    }

    #[tokio::test]
    async fn language_falls_back_to_options_then_default() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_pair(dir.path(), "a", r#"{"segments": []}"#);
        let t = SidecarTranscriber::new("zh");

        let out = t.transcribe(&audio, &TranscribeOptions::default()).await.unwrap();
        assert_eq!(out.language, "zh");

        let opts = TranscribeOptions {
            language: Some("fr".into()),
            ..TranscribeOptions::default()
        };
        let out = t.transcribe(&audio, &opts).await.unwrap();
        assert_eq!(out.language, "fr");
    }

    #[tokio::test]
    async fn each_call_gets_fresh_ids() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_pair(
            dir.path(),
            "a",
            r#"{"segments": [{"start": 0, "end": 1, "text": "x"}]}"#,
        );
        let t = SidecarTranscriber::new("en");
        let a = t.transcribe(&audio, &TranscribeOptions::default()).await.unwrap();
        let b = t.transcribe(&audio, &TranscribeOptions::default()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.segments[0].id, b.segments[0].id);
    }

    #[tokio::test]
    async fn missing_audio_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("nope.wav");
        let err = SidecarTranscriber::new("en")
            .transcribe(&audio, &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, CapabilityError::NotFound(p) if p == audio);
    }

    #[tokio::test]
    async fn missing_sidecar_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("lonely.wav");
        std::fs::write(&audio, b"RIFF").unwrap();
        let err = SidecarTranscriber::new("en")
            .transcribe(&audio, &TranscribeOptions::default())
            .await
            .unwrap_err();
        let expected = transcript_sidecar_path(&audio).display().to_string();
        assert_matches!(err, CapabilityError::Malformed(ref m) if m.contains(&expected));
    }

    #[tokio::test]
    async fn malformed_json_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_pair(dir.path(), "bad", r#"{"segments": "nope"}"#);
        let err = SidecarTranscriber::new("en")
            .transcribe(&audio, &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, CapabilityError::Malformed(_));
    }

    #[tokio::test]
    async fn inverted_interval_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let audio = write_pair(
            dir.path(),
            "inv",
            r#"{"segments": [{"start": 3.0, "end": 1.0, "text": "x"}]}"#,
        );
        let err = SidecarTranscriber::new("en")
            .transcribe(&audio, &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert_matches!(err, CapabilityError::Malformed(m) if m.starts_with("segment 0"));
    }

    #[tokio::test]
    async fn load_unload_toggle_flag() {
        let t = SidecarTranscriber::new("en");
        assert!(!t.is_loaded());
        t.load().await.unwrap();
        assert!(t.is_loaded());
        t.unload().await.unwrap();
        assert!(!t.is_loaded());
    }
}
