use anyhow::{Result, anyhow};
use log::debug;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::validate::extension_of;

/// A file picked for transcription, held in memory until the session drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub size_bytes: u64,
    pub content: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: content.len() as u64,
            content,
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let name = file_name(path)?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read audio file: {}", e))?;
        debug!("Loaded {} ({} bytes)", name, content.len());
        Ok(Self::new(name, content))
    }
}

/// Name and on-disk size, read without loading the file.
pub async fn stat(path: &Path) -> Result<(String, u64)> {
    let name = file_name(path)?;
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| anyhow!("Audio file not found: {}", path.display()))?;
    if !metadata.is_file() {
        return Err(anyhow!("Not a file: {}", path.display()));
    }
    Ok((name, metadata.len()))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))
}

/// Playback length in seconds read from the container headers. `None` when
/// the format is not recognised or does not declare a frame count.
pub fn probe_duration(name: &str, content: &[u8]) -> Option<f64> {
    let source = Cursor::new(content.to_vec());
    let stream = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(&extension_of(name));

    let probed = match symphonia::default::get_probe().format(
        &hint,
        stream,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(e) => {
            debug!("Could not probe {name}: {e}");
            return None;
        }
    };

    let track = probed.format.default_track()?;
    let params = &track.codec_params;
    let frames = params.n_frames?;
    let time_base = params
        .time_base
        .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))?;

    let time = time_base.calc_time(frames);
    Some(time.seconds as f64 + time.frac)
}

/// Shown while a selection's duration probe has not produced a value.
pub const DURATION_PENDING: &str = "Loading...";
/// Shown when a finished probe could not determine the duration.
pub const DURATION_UNKNOWN: &str = "unknown";

pub fn format_duration(duration: Option<f64>) -> String {
    format_duration_or(duration, DURATION_PENDING)
}

pub fn format_probed_duration(duration: Option<f64>) -> String {
    format_duration_or(duration, DURATION_UNKNOWN)
}

fn format_duration_or(duration: Option<f64>, placeholder: &str) -> String {
    match duration {
        Some(seconds) => format!("{seconds:.1}s"),
        None => placeholder.to_string(),
    }
}
