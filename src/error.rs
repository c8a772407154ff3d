use thiserror::Error;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message with suggested solutions
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Audio(err) => err.user_message(),
            PlayerError::File(err) => Self::format_file_error(err),
            PlayerError::Decode(err) => err.user_message(),
            PlayerError::Load(err) => err.user_message(),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested recovery actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Audio(err) => err.recovery_suggestions(),
            PlayerError::File(err) => Self::file_error_suggestions(err),
            PlayerError::Decode(err) => err.recovery_suggestions(),
            PlayerError::Load(err) => err.recovery_suggestions(),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    /// Check if this error allows for automatic recovery
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlayerError::Audio(err) => err.is_recoverable(),
            PlayerError::File(_) => false,
            PlayerError::Decode(err) => err.is_recoverable(),
            PlayerError::Load(err) => err.is_recoverable(),
            PlayerError::Config(err) => err.is_recoverable(),
            PlayerError::Parse(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Audio(AudioError::DeviceNotFound { .. }) => ErrorSeverity::Error,
            PlayerError::Audio(AudioError::EngineShutDown) => ErrorSeverity::Warning,
            PlayerError::Audio(_) => ErrorSeverity::Critical,
            PlayerError::File(_) => ErrorSeverity::Error,
            PlayerError::Decode(DecodeError::UnsupportedFormat { .. }) => ErrorSeverity::Warning,
            PlayerError::Decode(_) => ErrorSeverity::Error,
            PlayerError::Load(LoadError::Superseded { .. }) => ErrorSeverity::Info,
            PlayerError::Load(_) => ErrorSeverity::Error,
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::Parse(_) => ErrorSeverity::Info,
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied - cannot access file".to_string(),
            std::io::ErrorKind::InvalidData => "File contains invalid or corrupted data".to_string(),
            std::io::ErrorKind::UnexpectedEof => "File appears to be truncated or corrupted".to_string(),
            _ => format!("File system error: {}", err),
        }
    }

    fn file_error_suggestions(err: &std::io::Error) -> Vec<String> {
        match err.kind() {
            std::io::ErrorKind::NotFound => vec![
                "Check that the file path is correct".to_string(),
                "Try using absolute path instead of relative path".to_string(),
            ],
            std::io::ErrorKind::PermissionDenied => vec![
                "Check file permissions".to_string(),
                "Ensure the file is not locked by another application".to_string(),
            ],
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => vec![
                "Try re-downloading or re-copying the file".to_string(),
                "Check if the file is completely downloaded".to_string(),
            ],
            _ => vec!["Try the operation again".to_string()],
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
            ErrorSeverity::Critical => log::Level::Error,
        }
    }
}

/// Audio output and playback engine errors
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Audio initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Invalid volume range: {min} to {max}")]
    InvalidVolumeRange { min: f32, max: f32 },

    #[error("Playback engine has been torn down")]
    EngineShutDown,
}

impl AudioError {
    pub fn user_message(&self) -> String {
        match self {
            AudioError::DeviceNotFound { device } => {
                format!("Audio device '{}' is not available or has been disconnected", device)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Output sample format '{}' is not supported", format)
            }
            AudioError::StreamError(msg) => {
                format!("Audio playback interrupted: {}", msg)
            }
            AudioError::InitializationFailed(msg) => {
                format!("Failed to initialize audio system: {}", msg)
            }
            AudioError::InvalidVolumeRange { min, max } => {
                format!("Volume range {} to {} is empty or not finite", min, max)
            }
            AudioError::EngineShutDown => {
                "The player is shutting down and no longer accepts files".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            AudioError::DeviceNotFound { .. } => vec![
                "Use 'devices' to see available audio devices".to_string(),
                "Check that your audio device is connected and powered on".to_string(),
                "Remove 'preferred_device' from the configuration to use the default device".to_string(),
            ],
            AudioError::UnsupportedFormat { .. } => vec![
                "Select a different output device".to_string(),
                "Check your audio device specifications".to_string(),
            ],
            AudioError::StreamError(_) => vec![
                "Try pausing and resuming playback".to_string(),
                "Check audio device connections".to_string(),
            ],
            AudioError::InitializationFailed(_) => vec![
                "Restart the application".to_string(),
                "Check that no other applications are using exclusive audio access".to_string(),
                "Verify audio drivers are properly installed".to_string(),
            ],
            AudioError::InvalidVolumeRange { .. } => vec![
                "Set 'volume_min' lower than 'volume_max' in the configuration".to_string(),
            ],
            AudioError::EngineShutDown => vec!["Restart the application".to_string()],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            AudioError::DeviceNotFound { .. } => true,
            AudioError::UnsupportedFormat { .. } => false,
            AudioError::StreamError(_) => true,
            AudioError::InitializationFailed(_) => true,
            AudioError::InvalidVolumeRange { .. } => false,
            AudioError::EngineShutDown => false,
        }
    }
}

/// Sample decoding errors
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Decoded stream contains no samples")]
    EmptyStream,
}

impl DecodeError {
    pub fn user_message(&self) -> String {
        match self {
            DecodeError::UnsupportedFormat { format } => {
                format!("Audio format '{}' is not supported by this player", format)
            }
            DecodeError::CorruptedFile(msg) => {
                format!("Audio file appears to be corrupted or damaged: {}", msg)
            }
            DecodeError::DecodeFailed(msg) => {
                format!("Failed to decode audio data: {}", msg)
            }
            DecodeError::EmptyStream => "The file decoded to an empty audio stream".to_string(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            DecodeError::UnsupportedFormat { format } => vec![
                "Supported formats: MP3, FLAC, WAV, OGG/Vorbis, AAC/M4A".to_string(),
                format!("Convert '{}' to a supported format using audio conversion software", format),
            ],
            DecodeError::CorruptedFile(_) => vec![
                "Try re-downloading or re-copying the file".to_string(),
                "Try playing the file in another audio player to confirm corruption".to_string(),
            ],
            DecodeError::DecodeFailed(_) => vec![
                "Try re-encoding the file with different settings".to_string(),
                "Check if the file is completely downloaded".to_string(),
            ],
            DecodeError::EmptyStream => vec![
                "Check that the file actually contains audio".to_string(),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        false
    }
}

/// Loading pipeline errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Sample decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Load superseded by session {session}")]
    Superseded { session: u64 },

    #[error("Decode task failed: {0}")]
    TaskFailed(String),

    #[error("Engine rejected the buffer: {0}")]
    Engine(#[from] AudioError),
}

impl LoadError {
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Decode(err) => err.user_message(),
            LoadError::Superseded { .. } => "A newer file was opened while this one was loading".to_string(),
            LoadError::TaskFailed(msg) => format!("Loading was interrupted: {}", msg),
            LoadError::Engine(err) => err.user_message(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            LoadError::Decode(err) => err.recovery_suggestions(),
            LoadError::Superseded { .. } => Vec::new(),
            LoadError::TaskFailed(_) => vec!["Try opening the file again".to_string()],
            LoadError::Engine(err) => err.recovery_suggestions(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            LoadError::Decode(err) => err.is_recoverable(),
            LoadError::Superseded { .. } => true,
            LoadError::TaskFailed(_) => true,
            LoadError::Engine(err) => err.is_recoverable(),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
            ConfigError::InvalidValue { key, reason } => {
                format!("Configuration value '{}' is invalid: {}", key, reason)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your home directory".to_string(),
                "Try creating the directory manually: ~/.config/waveplay/".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Configuration will use default values".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
            ConfigError::InvalidValue { key, .. } => vec![
                format!("Fix or remove '{}' in ~/.config/waveplay/config.toml", key),
            ],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        true
    }
}
