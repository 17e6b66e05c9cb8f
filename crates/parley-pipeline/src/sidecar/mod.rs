//! Capabilities backed by files precomputed next to the audio.
//!
//! An external recognizer or diarizer writes its output beside each input:
//!
//! ```text
//! meeting.wav
//! meeting.transcript.json   <- SidecarTranscriber
//! meeting.rttm              <- RttmDiarizer
//! ```

mod rttm;
mod transcript;

use std::path::Path;
use std::sync::Arc;

use parley_settings::{ParleySettings, SettingsError};

use crate::capability::CapabilityError;
use crate::pipeline::Pipeline;

pub use rttm::{RttmDiarizer, parse_rttm, rttm_path};
pub use transcript::{SidecarTranscriber, transcript_sidecar_path};

/// Engine name served by [`SidecarTranscriber`].
pub const TRANSCRIPTION_ENGINE: &str = "sidecar";
/// Engine name served by [`RttmDiarizer`].
pub const DIARIZATION_ENGINE: &str = "rttm";

/// Build a pipeline over sidecar capabilities configured from `settings`.
///
/// The diarizer is attached only when `diarization.enabled` is set. Any
/// engine other than `sidecar` / `rttm` is rejected rather than ignored.
pub fn sidecar_pipeline(settings: &ParleySettings) -> Result<Pipeline, SettingsError> {
    check_engine(
        "transcription.engine",
        &settings.transcription.engine,
        TRANSCRIPTION_ENGINE,
    )?;
    let mut pipeline = Pipeline::new(Arc::new(SidecarTranscriber::from_settings(
        &settings.transcription,
    )));

    if settings.diarization.enabled {
        check_engine(
            "diarization.engine",
            &settings.diarization.engine,
            DIARIZATION_ENGINE,
        )?;
        pipeline =
            pipeline.with_diarizer(Arc::new(RttmDiarizer::from_settings(&settings.diarization)));
    }
    Ok(pipeline)
}

fn check_engine(key: &str, configured: &str, supported: &str) -> Result<(), SettingsError> {
    if configured == supported {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue(format!(
            "{key} \"{configured}\" is not available (supported: {supported})"
        )))
    }
}

/// Fail with [`CapabilityError::NotFound`] unless `audio` is a readable file.
async fn ensure_audio(audio: &Path) -> Result<(), CapabilityError> {
    match tokio::fs::metadata(audio).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(CapabilityError::NotFound(audio.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CapabilityError::NotFound(audio.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
