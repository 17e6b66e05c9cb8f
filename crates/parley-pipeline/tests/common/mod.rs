//! Scripted capabilities shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_core::{DiarizationTurn, Segment, Transcript};
use parley_pipeline::{
    CapabilityError, Diarization, DiarizationCapability, DiarizationHints, Pipeline,
    TranscribeOptions, TranscriptionCapability,
};

/// Shared, ordered record of capability activity.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.lock().iter().any(|e| e == event)
    }

    /// Events starting with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Tracks how many calls are in flight and the maximum seen.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        let _ = self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What a scripted call does for one input.
#[derive(Clone)]
pub enum Outcome<T> {
    Succeed(T),
    Fail(&'static str),
    Missing,
    Panic(&'static str),
}

#[derive(Clone)]
struct Script<T> {
    delay: Duration,
    outcome: Outcome<T>,
}

fn file_name(audio: &Path) -> String {
    audio
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn resolve<T>(outcome: Outcome<T>, audio: &Path) -> Result<T, CapabilityError> {
    match outcome {
        Outcome::Succeed(value) => Ok(value),
        Outcome::Fail(msg) => Err(CapabilityError::Inference(msg.into())),
        Outcome::Missing => Err(CapabilityError::NotFound(audio.to_path_buf())),
        Outcome::Panic(msg) => panic!("{msg}"),
    }
}

type Spans = Vec<(f64, f64, &'static str)>;

/// Transcriber driven by per-file scripts.
///
/// Unscripted inputs succeed immediately with one segment `[0, 1]` whose
/// text is the file name.
#[derive(Default)]
pub struct FakeTranscriber {
    scripts: HashMap<String, Script<Spans>>,
    pub events: Events,
    pub gauge: Gauge,
    fail_load: bool,
    fail_unload: bool,
}

impl FakeTranscriber {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            ..Self::default()
        }
    }

    pub fn script(mut self, file: &str, delay_ms: u64, outcome: Outcome<Spans>) -> Self {
        let _ = self.scripts.insert(
            file.to_string(),
            Script {
                delay: Duration::from_millis(delay_ms),
                outcome,
            },
        );
        self
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn fail_unload(mut self) -> Self {
        self.fail_unload = true;
        self
    }
}

#[async_trait]
impl TranscriptionCapability for FakeTranscriber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn load(&self) -> Result<(), CapabilityError> {
        self.events.push("load transcription");
        if self.fail_load {
            return Err(CapabilityError::Inference("weights missing".into()));
        }
        Ok(())
    }

    async fn unload(&self) -> Result<(), CapabilityError> {
        self.events.push("unload transcription");
        if self.fail_unload {
            return Err(CapabilityError::Inference("device busy".into()));
        }
        Ok(())
    }

    async fn transcribe(
        &self,
        audio: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcript, CapabilityError> {
        let name = file_name(audio);
        let script = self.scripts.get(&name).cloned().unwrap_or(Script {
            delay: Duration::ZERO,
            outcome: Outcome::Succeed(Vec::new()),
        });
        let _guard = self.gauge.enter();
        self.events.push(format!("transcribe start {name}"));
        tokio::time::sleep(script.delay).await;
        self.events.push(format!("transcribe end {name}"));

        let spans = resolve(script.outcome, audio)?;
        let language = options.language.clone().unwrap_or_else(|| "en".into());
        let mut transcript = Transcript::new(audio.display().to_string(), language.clone());
        if spans.is_empty() {
            transcript
                .segments
                .push(Segment::new(0.0, 1.0, name.clone(), language));
        } else {
            for (start, end, text) in spans {
                transcript
                    .segments
                    .push(Segment::new(start, end, text, language.clone()));
            }
        }
        Ok(transcript)
    }
}

/// Diarizer driven by per-file scripts.
///
/// Unscripted inputs succeed immediately with one turn `[0, 1]` for
/// `SPEAKER_00`.
#[derive(Default)]
pub struct FakeDiarizer {
    scripts: HashMap<String, Script<Spans>>,
    pub events: Events,
    pub gauge: Gauge,
    fail_load: bool,
    fail_unload: bool,
}

impl FakeDiarizer {
    pub fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            ..Self::default()
        }
    }

    pub fn script(mut self, file: &str, delay_ms: u64, outcome: Outcome<Spans>) -> Self {
        let _ = self.scripts.insert(
            file.to_string(),
            Script {
                delay: Duration::from_millis(delay_ms),
                outcome,
            },
        );
        self
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn fail_unload(mut self) -> Self {
        self.fail_unload = true;
        self
    }
}

#[async_trait]
impl DiarizationCapability for FakeDiarizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn load(&self) -> Result<(), CapabilityError> {
        self.events.push("load diarization");
        if self.fail_load {
            return Err(CapabilityError::Inference("no auth token".into()));
        }
        Ok(())
    }

    async fn unload(&self) -> Result<(), CapabilityError> {
        self.events.push("unload diarization");
        if self.fail_unload {
            return Err(CapabilityError::Inference("device busy".into()));
        }
        Ok(())
    }

    async fn diarize(
        &self,
        audio: &Path,
        _hints: &DiarizationHints,
    ) -> Result<Diarization, CapabilityError> {
        let name = file_name(audio);
        let script = self.scripts.get(&name).cloned().unwrap_or(Script {
            delay: Duration::ZERO,
            outcome: Outcome::Succeed(vec![(0.0, 1.0, "SPEAKER_00")]),
        });
        let _guard = self.gauge.enter();
        self.events.push(format!("diarize start {name}"));
        tokio::time::sleep(script.delay).await;
        self.events.push(format!("diarize end {name}"));

        let spans = resolve(script.outcome, audio)?;
        Ok(Diarization::from_turns(
            spans
                .into_iter()
                .map(|(start, end, speaker)| DiarizationTurn::new(start, end, speaker))
                .collect(),
        ))
    }
}

/// Pipeline over the given fakes, keeping handles for inspection.
pub fn pipeline(
    transcriber: FakeTranscriber,
    diarizer: Option<FakeDiarizer>,
) -> (Pipeline, Arc<FakeTranscriber>, Option<Arc<FakeDiarizer>>) {
    let transcriber = Arc::new(transcriber);
    let diarizer = diarizer.map(Arc::new);
    let mut pipeline = Pipeline::new(transcriber.clone());
    if let Some(d) = &diarizer {
        pipeline = pipeline.with_diarizer(d.clone());
    }
    (pipeline, transcriber, diarizer)
}
