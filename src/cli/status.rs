use std::time::Duration;

use crate::error::{AudioError, DecodeError, ErrorSeverity, LoadError, PlayerError};
use crate::models::{EmbeddedPicture, PlaybackState, PlayerStatus, Tags};

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Full status box: tags, position, progress, loop and output settings
    pub fn display_full_status(status: &PlayerStatus) {
        println!("┌─ Player Status ─────────────────────────────────────────┐");

        if status.state == PlaybackState::Unloaded {
            println!("│ No file loaded");
            println!("│ Status: {}", Self::format_playback_state(status.state));
        } else {
            Self::display_track_info(status);
            Self::display_playback_info(status);
        }

        Self::display_output_info(status);
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// One-line status
    pub fn display_compact_status(status: &PlayerStatus) {
        println!("{}", Self::compact_line(status));
    }

    pub fn compact_line(status: &PlayerStatus) -> String {
        if status.state == PlaybackState::Unloaded {
            return format!("{} | No file loaded", status.state.as_str());
        }
        format!(
            "{} | {} - {} | {}/{} ({}%){}",
            status.state.as_str(),
            Self::truncate(&status.tags.artist_name(), 25),
            Self::truncate(&status.display_name(), 30),
            Self::format_duration(status.position),
            Self::format_duration(status.duration),
            (status.progress() * 100.0) as u8,
            if status.is_loop { " | loop" } else { "" }
        )
    }

    /// Every decoded tag field
    pub fn display_tags(tags: &Tags) {
        println!("┌─ Tags ──────────────────────────────────────────────────┐");
        if tags.is_empty() {
            println!("│ No tags found");
        } else {
            Self::print_field("Title", tags.title.as_deref());
            Self::print_field("Artist", tags.artist.as_deref());
            Self::print_field("Album", tags.album.as_deref());
            Self::print_field("Year", tags.year.as_deref());
            Self::print_field("Genre", tags.content_type.as_deref());
            if let Some(picture) = &tags.picture {
                println!("│ Picture: {}", Self::describe_picture(picture));
            }
        }
        println!("└─────────────────────────────────────────────────────────┘");
    }

    fn print_field(label: &str, value: Option<&str>) {
        if let Some(value) = value {
            println!("│ {}: {}", label, Self::truncate(value, 48));
        }
    }

    pub fn describe_picture(picture: &EmbeddedPicture) -> String {
        let mime_type = if picture.mime_type.is_empty() {
            "unknown type"
        } else {
            picture.mime_type.as_str()
        };
        format!(
            "{} ({}), {}",
            mime_type,
            Self::picture_type_name(picture.picture_type),
            Self::format_file_size(picture.len() as u64)
        )
    }

    fn display_track_info(status: &PlayerStatus) {
        println!("│ Track: {}", Self::truncate(&status.display_name(), 50));
        println!("│ Artist: {}", Self::truncate(&status.tags.artist_name(), 49));
        println!("│ Album: {}", Self::truncate(&status.tags.album_name(), 50));

        match (&status.tags.year, &status.tags.content_type) {
            (Some(year), Some(genre)) => println!("│ Year: {} | Genre: {}", year, Self::truncate(genre, 35)),
            (Some(year), None) => println!("│ Year: {}", year),
            (None, Some(genre)) => println!("│ Genre: {}", Self::truncate(genre, 50)),
            (None, None) => {}
        }
        if let Some(picture) = &status.tags.picture {
            println!("│ Cover: {}", Self::describe_picture(picture));
        }
    }

    fn display_playback_info(status: &PlayerStatus) {
        println!("│");
        println!("│ Status: {}", Self::format_playback_state(status.state));
        println!(
            "│ Position: {} / {}",
            Self::format_duration(status.position),
            Self::format_duration(status.duration)
        );

        let progress = status.progress();
        println!(
            "│ Progress: [{}] {:.1}%",
            Self::create_progress_bar(progress, 40),
            progress * 100.0
        );

        let remaining = status.duration.saturating_sub(status.position);
        println!("│ Remaining: {}", Self::format_duration(remaining));
    }

    fn display_output_info(status: &PlayerStatus) {
        println!("│");
        println!("│ Volume: {}", Self::format_volume(status.volume));
        println!("│ Loop: {}", if status.is_loop { "on" } else { "off" });
        match &status.output_device {
            Some(device) => println!("│ Device: {}", Self::truncate(device, 49)),
            None => println!("│ Device: Default"),
        }
    }

    pub fn display_devices(devices: &[String], current: Option<&str>) {
        if devices.is_empty() {
            println!("No output devices found");
            return;
        }
        println!("Output devices:");
        for device in devices {
            let marker = if Some(device.as_str()) == current { "*" } else { " " };
            println!(" {} {}", marker, device);
        }
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &PlayerError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
            ErrorSeverity::Critical => "🔥",
        };

        eprintln!(
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            severity_icon,
            severity.as_str()
        );

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        if let Some(hint) = Self::error_context(error) {
            eprintln!("│");
            eprintln!("│ {}", hint);
        }

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Extra hint for errors the user can act on from the prompt
    pub fn error_context(error: &PlayerError) -> Option<&'static str> {
        match error {
            PlayerError::Audio(AudioError::DeviceNotFound { .. }) => Some("Use 'devices' to see available devices"),
            PlayerError::Decode(DecodeError::UnsupportedFormat { .. })
            | PlayerError::Load(LoadError::Decode(DecodeError::UnsupportedFormat { .. })) => {
                Some("Supported: MP3, FLAC, WAV, OGG/Vorbis, AAC/M4A")
            }
            PlayerError::Load(LoadError::Decode(DecodeError::CorruptedFile(_))) => {
                Some("File may need to be re-downloaded or re-encoded")
            }
            PlayerError::Config(_) => Some("Configuration will use default values"),
            _ => None,
        }
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());
        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.chars().count() + word.chars().count() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
        lines
    }

    /// Format duration as MM:SS or HH:MM:SS for longer tracks
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
        let mut size_f = size as f64;
        let mut unit_index = 0;

        while size_f >= 1024.0 && unit_index < UNITS.len() - 1 {
            size_f /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size_f, UNITS[unit_index])
        }
    }

    /// Volume as a signed gain; negative values invert polarity
    pub fn format_volume(volume: f32) -> String {
        format!("{:+.2}", volume)
    }

    /// Name of an attached-picture type byte
    pub fn picture_type_name(picture_type: u8) -> &'static str {
        match picture_type {
            0 => "other",
            1 | 2 => "file icon",
            3 => "front cover",
            4 => "back cover",
            5 => "leaflet page",
            6 => "media",
            7 => "lead artist",
            8 => "artist",
            9 => "conductor",
            10 => "band",
            11 => "composer",
            12 => "lyricist",
            13 => "recording location",
            14 => "during recording",
            15 => "during performance",
            16 => "video capture",
            18 => "illustration",
            19 => "band logotype",
            20 => "publisher logotype",
            _ => "unknown",
        }
    }

    /// Truncate to `max_len` characters with a trailing ellipsis
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len || max_len <= 3 {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{}...", kept)
        }
    }

    pub fn create_progress_bar(progress: f32, width: usize) -> String {
        let filled = ((progress.clamp(0.0, 1.0) * width as f32) as usize).min(width);
        format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
    }

    pub fn format_playback_state(state: PlaybackState) -> String {
        match state {
            PlaybackState::Unloaded => "⏏ No file".to_string(),
            PlaybackState::Loaded => "⏹ Ready".to_string(),
            PlaybackState::Playing => "▶ Playing".to_string(),
            PlaybackState::Paused => "⏸ Paused".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_status() -> PlayerStatus {
        let mut tags = Tags::new();
        tags.title = Some("Test Song".to_string());
        tags.artist = Some("Test Artist".to_string());
        tags.album = Some("Test Album".to_string());
        tags.year = Some("2023".to_string());

        PlayerStatus {
            state: PlaybackState::Playing,
            file: Some(PathBuf::from("/test/path/song.mp3")),
            tags,
            position: Duration::from_secs(60),
            duration: Duration::from_secs(180),
            volume: 0.8,
            is_loop: true,
            output_device: Some("Test Device".to_string()),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(StatusDisplay::format_duration(Duration::from_secs(30)), "00:30");
        assert_eq!(StatusDisplay::format_duration(Duration::from_secs(185)), "03:05");
        assert_eq!(StatusDisplay::format_duration(Duration::from_secs(3661)), "01:01:01");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(StatusDisplay::format_file_size(512), "512 B");
        assert_eq!(StatusDisplay::format_file_size(1536), "1.5 KB");
        assert_eq!(StatusDisplay::format_file_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(StatusDisplay::truncate("short", 10), "short");
        assert_eq!(StatusDisplay::truncate("this is a very long string", 10), "this is...");
        assert_eq!(StatusDisplay::truncate("abc", 2), "abc");
        // Multi-byte characters are never split
        assert_eq!(StatusDisplay::truncate("ééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_create_progress_bar() {
        assert_eq!(StatusDisplay::create_progress_bar(0.0, 10), "░░░░░░░░░░");
        assert_eq!(StatusDisplay::create_progress_bar(1.0, 10), "██████████");
        assert_eq!(StatusDisplay::create_progress_bar(0.5, 10), "█████░░░░░");
        assert_eq!(StatusDisplay::create_progress_bar(1.7, 4), "████");
    }

    #[test]
    fn test_format_playback_state() {
        assert_eq!(StatusDisplay::format_playback_state(PlaybackState::Playing), "▶ Playing");
        assert_eq!(StatusDisplay::format_playback_state(PlaybackState::Loaded), "⏹ Ready");
    }

    #[test]
    fn test_compact_line() {
        let status = create_test_status();
        assert_eq!(
            StatusDisplay::compact_line(&status),
            "Playing | Test Artist - Test Song | 01:00/03:00 (33%) | loop"
        );
        assert_eq!(StatusDisplay::compact_line(&PlayerStatus::new()), "No file | No file loaded");
    }

    #[test]
    fn test_describe_picture() {
        let picture = EmbeddedPicture {
            mime_type: "image/png".to_string(),
            picture_type: 3,
            data: vec![0; 2048],
        };
        assert_eq!(StatusDisplay::describe_picture(&picture), "image/png (front cover), 2.0 KB");
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(StatusDisplay::format_volume(0.5), "+0.50");
        assert_eq!(StatusDisplay::format_volume(-1.0), "-1.00");
    }

    #[test]
    fn test_error_context() {
        let error = PlayerError::Audio(AudioError::DeviceNotFound {
            device: "x".to_string(),
        });
        assert!(StatusDisplay::error_context(&error).unwrap().contains("devices"));

        let error = PlayerError::Load(LoadError::Superseded { session: 3 });
        assert_eq!(StatusDisplay::error_context(&error), None);
    }

    #[test]
    fn test_wrap_text() {
        let lines = StatusDisplay::wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_display_functions_dont_panic() {
        let status = create_test_status();
        StatusDisplay::display_full_status(&status);
        StatusDisplay::display_compact_status(&status);
        StatusDisplay::display_tags(&status.tags);
        StatusDisplay::display_tags(&Tags::new());
        StatusDisplay::display_devices(&["A".to_string(), "B".to_string()], Some("B"));
        StatusDisplay::display_full_status(&PlayerStatus::new());
        StatusDisplay::display_error(&PlayerError::Load(LoadError::Decode(DecodeError::EmptyStream)));
    }
}
