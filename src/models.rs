use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Metadata fields recognised in an embedded tag block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagField {
    Title,
    Artist,
    Album,
    Year,
    ContentType,
    Picture,
}

impl TagField {
    /// Map a 4-character frame identifier to the field it populates
    pub fn from_frame_id(id: &[u8; 4]) -> Option<Self> {
        match id {
            b"TIT2" => Some(TagField::Title),
            b"TPE1" => Some(TagField::Artist),
            b"TALB" => Some(TagField::Album),
            b"APIC" => Some(TagField::Picture),
            b"TCON" => Some(TagField::ContentType),
            b"TYER" | b"TDRC" => Some(TagField::Year),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagField::Title => "title",
            TagField::Artist => "artist",
            TagField::Album => "album",
            TagField::Year => "year",
            TagField::ContentType => "contentType",
            TagField::Picture => "picture",
        }
    }
}

/// Image embedded in a picture frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedPicture {
    pub mime_type: String,
    pub picture_type: u8,
    pub data: Vec<u8>,
}

impl EmbeddedPicture {
    /// File extension matching the MIME type, used when exporting the image
    pub fn extension(&self) -> &'static str {
        match self.mime_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "jpg" | "jpeg" => "jpg",
            "image/png" | "png" => "png",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/webp" => "webp",
            _ => "bin",
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decoded tag fields; the first frame seen for a field wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<String>,
    pub content_type: Option<String>,
    pub picture: Option<EmbeddedPicture>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any field was populated
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.year.is_none()
            && self.content_type.is_none()
            && self.picture.is_none()
    }

    pub fn is_set(&self, field: TagField) -> bool {
        match field {
            TagField::Title => self.title.is_some(),
            TagField::Artist => self.artist.is_some(),
            TagField::Album => self.album.is_some(),
            TagField::Year => self.year.is_some(),
            TagField::ContentType => self.content_type.is_some(),
            TagField::Picture => self.picture.is_some(),
        }
    }

    /// Store a text value unless the field already holds one.
    /// Returns whether the value was taken.
    pub fn set_text(&mut self, field: TagField, value: String) -> bool {
        let slot = match field {
            TagField::Title => &mut self.title,
            TagField::Artist => &mut self.artist,
            TagField::Album => &mut self.album,
            TagField::Year => &mut self.year,
            TagField::ContentType => &mut self.content_type,
            TagField::Picture => return false,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn set_picture(&mut self, picture: EmbeddedPicture) -> bool {
        if self.picture.is_some() {
            return false;
        }
        self.picture = Some(picture);
        true
    }

    /// Title for display, falling back to the given file name
    pub fn display_title(&self, fallback: &str) -> String {
        self.title.clone().unwrap_or_else(|| fallback.to_string())
    }

    pub fn artist_name(&self) -> String {
        self.artist
            .clone()
            .unwrap_or_else(|| "Unknown Artist".to_string())
    }

    pub fn album_name(&self) -> String {
        self.album
            .clone()
            .unwrap_or_else(|| "Unknown Album".to_string())
    }
}

/// Decoded PCM audio held by the playback engine for one session.
/// Samples are interleaved `f32` frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    /// A buffer of silence lasting `seconds`
    pub fn silent(sample_rate: u32, channels: u16, seconds: f64) -> Self {
        let frames = (sample_rate as f64 * seconds).round() as usize;
        Self::new(sample_rate, channels, vec![0.0; frames * channels as usize])
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Sample at `frame` on `channel`, zero outside the buffer
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        if channel >= channels {
            return 0.0;
        }
        self.samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate > 0 {
            self.frames() as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }
}

/// Playback engine lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlaybackState {
    Unloaded,
    Loaded,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Get a human-readable string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Unloaded => "No file",
            PlaybackState::Loaded => "Ready",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the player for status displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub file: Option<PathBuf>,
    pub tags: Tags,
    pub position: Duration,
    pub duration: Duration,
    pub volume: f32,
    pub is_loop: bool,
    pub output_device: Option<String>,
}

impl PlayerStatus {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Unloaded,
            file: None,
            tags: Tags::default(),
            position: Duration::from_secs(0),
            duration: Duration::from_secs(0),
            volume: 1.0,
            is_loop: false,
            output_device: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing)
    }

    /// Title for display: tag title, then file stem
    pub fn display_name(&self) -> String {
        let fallback = self
            .file
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown");
        self.tags.display_title(fallback)
    }

    /// Get progress as a fraction (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration.as_secs_f64() > 0.0 {
            (self.position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }

    /// Format position as MM:SS
    pub fn position_formatted(&self) -> String {
        format_mm_ss(self.position)
    }

    /// Format duration as MM:SS
    pub fn duration_formatted(&self) -> String {
        format_mm_ss(self.duration)
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn format_mm_ss(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
