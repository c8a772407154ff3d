//! File loading: tags first, then samples, then commit to the engine.

use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::{FormatHint, PlaybackEngine, SampleDecoder};
use crate::error::LoadError;
use crate::logging::OperationTimer;
use crate::metadata::{TagDecoder, TagReport};
use crate::models::Tags;

const TAG_DECODE_THRESHOLD: Duration = Duration::from_millis(50);
const SAMPLE_DECODE_THRESHOLD: Duration = Duration::from_secs(2);

/// Whether a media type names audio content
pub fn is_audio_media_type(media_type: &str) -> bool {
    media_type.contains("audio")
}

/// Media type implied by a file extension
pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "wav" | "wave" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "m4a" | "mp4" | "aac" => "audio/mp4",
        "aiff" | "aif" => "audio/aiff",
        "caf" => "audio/x-caf",
        "mka" | "webm" => "audio/webm",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Raw file contents as handed over by the file picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub path: Option<PathBuf>,
}

impl RawFile {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            path: None,
        }
    }

    pub async fn read(path: &Path) -> Result<Self, std::io::Error> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            bytes,
            media_type: media_type_for_path(path).to_string(),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn is_audio(&self) -> bool {
        is_audio_media_type(&self.media_type)
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.as_deref()?.extension()?.to_str()
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<memory>".to_string())
    }
}

/// Result of a successful load
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    pub session: u64,
    pub tags: Tags,
    /// `None` when the file carries no tag marker
    pub tag_report: Option<TagReport>,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
    pub load_time: Duration,
}

/// Decode tags when the marker is present, otherwise warn and return
/// empty tags
pub fn read_tags(bytes: &[u8]) -> (Tags, Option<TagReport>) {
    if !TagDecoder::has_marker(bytes) {
        warn!("No tag marker found, skipping metadata");
        return (Tags::new(), None);
    }

    let report = crate::time_operation_with_threshold!("tag decode", TAG_DECODE_THRESHOLD, {
        TagDecoder::decode(bytes)
    });

    if let Some(diagnostic) = &report.diagnostic {
        warn!("Tag region partially read: {}", diagnostic);
    }
    (report.tags.clone(), Some(report))
}

/// Loads files into a [`PlaybackEngine`]
#[derive(Clone)]
pub struct LoadingPipeline {
    engine: PlaybackEngine,
    decoder: Arc<dyn SampleDecoder>,
}

impl LoadingPipeline {
    pub fn new(engine: PlaybackEngine, decoder: Arc<dyn SampleDecoder>) -> Self {
        Self { engine, decoder }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Load `file`, replacing whatever was playing.
    ///
    /// The previous session is torn down before decoding starts. If another
    /// load begins while this one is decoding, this one returns
    /// [`LoadError::Superseded`] and commits nothing.
    pub async fn load(&self, file: RawFile) -> Result<LoadedTrack, LoadError> {
        let load_timer = OperationTimer::new(format!("load {}", file.display_name()));
        let session = self.engine.begin_session()?;

        let (tags, tag_report) = read_tags(&file.bytes);
        let hint = FormatHint::new(Some(&file.media_type), file.extension());

        let decoder = Arc::clone(&self.decoder);
        let bytes = file.bytes;
        let buffer = tokio::task::spawn_blocking(move || {
            crate::time_operation_with_threshold!("sample decode", SAMPLE_DECODE_THRESHOLD, {
                decoder.decode_samples(bytes, &hint)
            })
        })
        .await
        .map_err(|e| LoadError::TaskFailed(e.to_string()))??;

        let duration = buffer.duration();
        let sample_rate = buffer.sample_rate();
        let channels = buffer.channels();
        self.engine.load_session(session, buffer)?;

        let load_time = load_timer.finish();
        info!("Session {} ready ({:.2}s)", session, duration.as_secs_f64());

        Ok(LoadedTrack {
            session,
            tags,
            tag_report,
            duration,
            sample_rate,
            channels,
            load_time,
        })
    }
}
