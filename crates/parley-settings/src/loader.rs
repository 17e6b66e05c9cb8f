//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `PARLEY_*` environment variable overrides (highest priority)
//! 4. [`ParleySettings::validate`]

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::ParleySettings;

/// Resolve the default settings file path (`~/.parley/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".parley").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ParleySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON, or a file whose root is not
/// a JSON object, is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    Ok(settings)
}

/// Read and merge the settings file without consulting the environment.
pub fn read_settings_file(path: &Path) -> Result<ParleySettings> {
    let defaults = serde_json::to_value(ParleySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        if !user.is_object() {
            return Err(SettingsError::InvalidValue(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        }
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (file/default value wins).
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Split out from [`apply_env_overrides`] so tests don't touch the process
/// environment.
pub fn apply_overrides(settings: &mut ParleySettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let parsed = |name: &str, parse: &dyn Fn(&str) -> Option<u64>| -> Option<u64> {
        let raw = lookup(name)?;
        let result = parse(&raw);
        if result.is_none() {
            tracing::warn!(key = name, value = %raw, "invalid env var, ignoring");
        }
        result
    };
    let boolean = |name: &str| -> Option<bool> {
        let raw = lookup(name)?;
        let result = parse_bool(&raw);
        if result.is_none() {
            tracing::warn!(key = name, value = %raw, "invalid boolean env var, ignoring");
        }
        result
    };

    // ── Transcription ───────────────────────────────────────────────
    if let Some(v) = string("PARLEY_LANGUAGE") {
        settings.transcription.language = v;
    }
    if let Some(v) = string("PARLEY_DEVICE") {
        settings.transcription.device.clone_from(&v);
        settings.diarization.device = v;
    }

    // ── Diarization ─────────────────────────────────────────────────
    if let Some(v) = boolean("PARLEY_DIARIZATION") {
        settings.diarization.enabled = v;
    }
    if let Some(v) = parsed("PARLEY_NUM_SPEAKERS", &|s: &str| parse_u64_range(s, 1, 64)) {
        settings.diarization.num_speakers = Some(v as u32);
    }

    // ── Pipeline ────────────────────────────────────────────────────
    if let Some(v) = boolean("PARLEY_PARALLEL") {
        settings.pipeline.parallel = v;
    }
    if let Some(v) = parsed("PARLEY_MAX_CONCURRENT", &|s: &str| parse_u64_range(s, 1, 64)) {
        settings.pipeline.max_concurrent = v as usize;
    }
    if let Some(v) = parsed("PARLEY_STAGE_TIMEOUT_MS", &|s: &str| {
        parse_u64_range(s, 1000, 86_400_000)
    }) {
        settings.pipeline.stage_timeout_ms = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("PARLEY_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"pipeline": {"parallel": true, "maxConcurrent": 2}});
        let source = serde_json::json!({"pipeline": {"maxConcurrent": 4}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["pipeline"]["maxConcurrent"], 4);
        assert_eq!(merged["pipeline"]["parallel"], true);
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_and_primitive_replace() {
        let target = serde_json::json!({"items": [1, 2, 3], "x": {"nested": true}});
        let source = serde_json::json!({"items": [4], "x": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4]));
        assert_eq!(merged["x"], 42);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── read_settings_file ──────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = read_settings_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, ParleySettings::default());
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"transcription": {"language": "en"}, "diarization": {"numSpeakers": 3}}"#,
        )
        .unwrap();

        let settings = read_settings_file(&path).unwrap();
        assert_eq!(settings.transcription.language, "en");
        assert_eq!(settings.transcription.model, "large-v3");
        assert_eq!(settings.diarization.num_speakers, Some(3));
        assert!(settings.diarization.enabled);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_settings_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn non_object_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            read_settings_file(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn wrong_field_type_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"pipeline": {"maxConcurrent": "many"}}"#).unwrap();
        assert!(matches!(read_settings_file(&path), Err(SettingsError::Json(_))));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply_valid_values() {
        let mut s = ParleySettings::default();
        apply_overrides(
            &mut s,
            env(&[
                ("PARLEY_LANGUAGE", "en"),
                ("PARLEY_DEVICE", "cpu"),
                ("PARLEY_DIARIZATION", "off"),
                ("PARLEY_NUM_SPEAKERS", "3"),
                ("PARLEY_PARALLEL", "no"),
                ("PARLEY_MAX_CONCURRENT", "6"),
                ("PARLEY_STAGE_TIMEOUT_MS", "30000"),
                ("PARLEY_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(s.transcription.language, "en");
        assert_eq!(s.transcription.device, "cpu");
        assert_eq!(s.diarization.device, "cpu");
        assert!(!s.diarization.enabled);
        assert_eq!(s.diarization.num_speakers, Some(3));
        assert!(!s.pipeline.parallel);
        assert_eq!(s.pipeline.max_concurrent, 6);
        assert_eq!(s.pipeline.stage_timeout_ms, Some(30_000));
        assert_eq!(s.logging.level, "debug");
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut s = ParleySettings::default();
        apply_overrides(
            &mut s,
            env(&[
                ("PARLEY_DIARIZATION", "maybe"),
                ("PARLEY_MAX_CONCURRENT", "0"),
                ("PARLEY_STAGE_TIMEOUT_MS", "10"),
                ("PARLEY_NUM_SPEAKERS", "lots"),
                ("PARLEY_LANGUAGE", ""),
            ]),
        );
        assert_eq!(s, ParleySettings::default());
    }

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "ON"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("1", 1, 64), Some(1));
        assert_eq!(parse_u64_range("64", 1, 64), Some(64));
        assert_eq!(parse_u64_range("65", 1, 64), None);
        assert_eq!(parse_u64_range(" 8 ", 1, 64), Some(8));
        assert_eq!(parse_u64_range("x", 1, 64), None);
    }
}
