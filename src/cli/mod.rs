use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub mod status;
pub use status::StatusDisplay;

/// Interactive audio player with embedded tag support
#[derive(Debug, Parser)]
#[command(name = "waveplay")]
#[command(about = "Play an audio file from an interactive prompt")]
#[command(version)]
pub struct CliApp {
    /// Audio file to open on start
    pub file: Option<PathBuf>,

    /// Output device name (overrides the configured device)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Loop the opened file
    #[arg(short = 'l', long = "loop")]
    pub looping: bool,

    /// Initial volume, clamped into the configured range
    #[arg(long, allow_hyphen_values = true)]
    pub volume: Option<f32>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Commands accepted at the interactive prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Commands {
    /// Load a file, replacing whatever is loaded
    Open { path: PathBuf },
    Play,
    /// Pause, keeping the position
    Pause,
    /// Pause and rewind to the start
    Stop,
    Seek { position: String },
    /// Toggle looping
    Loop,
    Volume { level: f32 },
    Status,
    Tags,
    /// Write the embedded picture to `path`
    Cover { path: PathBuf },
    Devices,
    Quit,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            match dirs::home_dir() {
                Some(home_dir) => home_dir.join(rest),
                None => PathBuf::from(path),
            }
        } else if path == "~" {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
        } else {
            PathBuf::from(path)
        }
    }

    /// Parse one line typed at the prompt
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        let Some((&command, rest)) = args.split_first() else {
            return Err(ParseError::EmptyCommand);
        };

        match command {
            "open" | "load" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument {
                        command: "open".to_string(),
                        argument: "path".to_string(),
                    });
                }
                Ok(Commands::Open {
                    path: Self::expand_path(&rest.join(" ")),
                })
            }
            "play" | "resume" => Ok(Commands::Play),
            "pause" => Ok(Commands::Pause),
            "stop" => Ok(Commands::Stop),
            "seek" => match rest.first() {
                Some(position) => Ok(Commands::Seek {
                    position: position.to_string(),
                }),
                None => Err(ParseError::MissingArgument {
                    command: "seek".to_string(),
                    argument: "position".to_string(),
                }),
            },
            "loop" => Ok(Commands::Loop),
            "volume" | "vol" => {
                let Some(value) = rest.first() else {
                    return Err(ParseError::MissingArgument {
                        command: "volume".to_string(),
                        argument: "level".to_string(),
                    });
                };
                match value.parse::<f32>() {
                    Ok(level) if level.is_finite() => Ok(Commands::Volume { level }),
                    _ => Err(ParseError::InvalidArgument {
                        argument: "volume level".to_string(),
                        value: value.to_string(),
                        expected: "a number such as 0.5 or -1".to_string(),
                    }),
                }
            }
            "status" => Ok(Commands::Status),
            "tags" | "info" => Ok(Commands::Tags),
            "cover" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument {
                        command: "cover".to_string(),
                        argument: "path".to_string(),
                    });
                }
                Ok(Commands::Cover {
                    path: Self::expand_path(&rest.join(" ")),
                })
            }
            "devices" => Ok(Commands::Devices),
            "quit" | "exit" | "q" => Ok(Commands::Quit),
            "help" | "?" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: command.to_string(),
            }),
        }
    }

    pub fn display_help() {
        println!("waveplay - Available Commands:");
        println!();
        println!("Playback Control:");
        println!("  open <path>     - Load an audio file");
        println!("  play            - Start or resume playback");
        println!("  pause           - Pause playback");
        println!("  stop            - Stop playback and rewind");
        println!("  seek <time>     - Seek to position (e.g., '1:30', '90s')");
        println!("  loop            - Toggle looping");
        println!("  volume <value>  - Set volume (negative values invert polarity)");
        println!();
        println!("Information:");
        println!("  status          - Show current player status");
        println!("  tags            - Show decoded tags");
        println!("  cover <path>    - Save the embedded picture");
        println!("  devices         - List audio output devices");
        println!();
        println!("General:");
        println!("  help            - Show this help message");
        println!("  exit, quit      - Exit the player");
    }

    /// Parse "1:30", "90", "90s" or "1:30.5" into a duration
    pub fn parse_time(time_str: &str) -> Result<Duration, ParseError> {
        let trimmed = time_str.trim();
        let invalid = || ParseError::InvalidTimeFormat {
            input: time_str.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid());
        }

        let total_seconds = if let Some((minutes, seconds)) = trimmed.split_once(':') {
            let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
            let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(invalid());
            }
            minutes as f64 * 60.0 + seconds
        } else {
            let seconds: f64 = trimmed.strip_suffix('s').unwrap_or(trimmed).parse().map_err(|_| invalid())?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid());
            }
            seconds
        };

        // Values too large for a Duration are rejected rather than panicking
        Duration::try_from_secs_f64(total_seconds).map_err(|_| invalid())
    }

    /// Reject positions past the end of the loaded track
    pub fn validate_seek_time(position: Duration, duration: Option<Duration>) -> Result<Duration, ParseError> {
        if let Some(track_duration) = duration {
            if position > track_duration {
                return Err(ParseError::SeekBeyondDuration {
                    position: position.as_secs_f64(),
                    duration: track_duration.as_secs_f64(),
                });
            }
        }
        Ok(position)
    }

    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error("Invalid time format: {input}")]
    InvalidTimeFormat { input: String },

    #[error("Seek position {position:.2}s exceeds track duration {duration:.2}s")]
    SeekBeyondDuration { position: f64, duration: f64 },

    #[error("Help requested")]
    HelpRequested,
}

#[cfg(test)]
mod tests;
