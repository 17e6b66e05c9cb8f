//! Rendering and writing transcripts.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use parley_core::Transcript;

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Header plus one line per segment.
    Text,
    /// SubRip subtitles.
    Srt,
    /// The full transcript as JSON.
    Json,
}

impl Format {
    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Srt => "srt",
            Self::Json => "json",
        }
    }
}

/// Render `transcript` in `format`.
pub fn render(transcript: &Transcript, format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(render_text(transcript)),
        Format::Srt => Ok(transcript.to_srt()),
        Format::Json => {
            serde_json::to_string_pretty(transcript).context("failed to serialize transcript")
        }
    }
}

fn render_text(transcript: &Transcript) -> String {
    let name = Path::new(&transcript.audio_ref)
        .file_name()
        .map_or_else(|| transcript.audio_ref.clone(), |n| n.to_string_lossy().into_owned());

    let mut out = String::new();
    let _ = writeln!(out, "Audio: {name}");
    let _ = writeln!(out, "{}", "=".repeat(50));
    if !transcript.speakers.is_empty() {
        let _ = writeln!(out, "Speakers:");
        for speaker in &transcript.speakers {
            let _ = writeln!(
                out,
                "  {:<12} {:>8.1}s  {} turns",
                speaker.display_name.as_deref().unwrap_or(&speaker.id),
                speaker.total_speaking_time,
                speaker.segment_count
            );
        }
    }
    out.push('\n');
    out.push_str(&transcript.formatted_text());
    out.push('\n');
    out
}

/// Output path for `transcript` under `dir`: `<audio stem>.<ext>`.
pub fn output_path(dir: &Path, transcript: &Transcript, format: Format) -> PathBuf {
    let stem = Path::new(&transcript.audio_ref)
        .file_stem()
        .map_or_else(|| transcript.id.to_string(), |s| s.to_string_lossy().into_owned());
    dir.join(format!("{stem}.{}", format.extension()))
}

/// Fail if two inputs share a file stem and would overwrite each other's
/// output in the same directory.
pub fn ensure_distinct_outputs(inputs: &[PathBuf], format: Format) -> Result<()> {
    let mut seen: HashMap<&std::ffi::OsStr, &Path> = HashMap::new();
    for input in inputs {
        let Some(stem) = input.file_stem() else {
            continue;
        };
        if let Some(first) = seen.insert(stem, input) {
            bail!(
                "{} and {} would both be written to {}.{}",
                first.display(),
                input.display(),
                stem.to_string_lossy(),
                format.extension()
            );
        }
    }
    Ok(())
}

/// Write a rendered transcript into `dir`, returning the path written.
pub fn write_to_dir(dir: &Path, transcript: &Transcript, format: Format) -> Result<PathBuf> {
    let path = output_path(dir, transcript, format);
    let rendered = render(transcript, format)?;
    std::fs::write(&path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
