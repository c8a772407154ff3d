use super::{CliApp, Commands, ParseError};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_parse_command_open() {
    match CliApp::parse_command("open /path/to/song.mp3").unwrap() {
        Commands::Open { path } => assert_eq!(path, PathBuf::from("/path/to/song.mp3")),
        other => panic!("Expected Open command, got {:?}", other),
    }

    // Paths may contain spaces
    match CliApp::parse_command("open /path/with spaces/song (1).mp3").unwrap() {
        Commands::Open { path } => assert_eq!(path, PathBuf::from("/path/with spaces/song (1).mp3")),
        other => panic!("Expected Open command, got {:?}", other),
    }

    match CliApp::parse_command("open").unwrap_err() {
        ParseError::MissingArgument { command, argument } => {
            assert_eq!(command, "open");
            assert_eq!(argument, "path");
        }
        other => panic!("Expected MissingArgument error, got {:?}", other),
    }
}

#[test]
fn test_parse_command_basic_controls() {
    let cases = [
        ("play", Commands::Play),
        ("resume", Commands::Play),
        ("pause", Commands::Pause),
        ("stop", Commands::Stop),
        ("loop", Commands::Loop),
        ("status", Commands::Status),
        ("tags", Commands::Tags),
        ("devices", Commands::Devices),
        ("quit", Commands::Quit),
        ("exit", Commands::Quit),
    ];

    for (input, expected) in cases {
        assert_eq!(CliApp::parse_command(input).unwrap(), expected, "input: {}", input);
    }
}

#[test]
fn test_parse_command_seek() {
    for (input, expected) in [("seek 30", "30"), ("seek 1:30", "1:30"), ("seek 90s", "90s")] {
        assert_eq!(
            CliApp::parse_command(input).unwrap(),
            Commands::Seek {
                position: expected.to_string()
            }
        );
    }

    match CliApp::parse_command("seek").unwrap_err() {
        ParseError::MissingArgument { command, argument } => {
            assert_eq!(command, "seek");
            assert_eq!(argument, "position");
        }
        other => panic!("Expected MissingArgument error, got {:?}", other),
    }
}

#[test]
fn test_parse_command_volume() {
    assert_eq!(CliApp::parse_command("volume 0.5").unwrap(), Commands::Volume { level: 0.5 });
    assert_eq!(CliApp::parse_command("volume -1").unwrap(), Commands::Volume { level: -1.0 });
    // Out-of-range values are clamped by the engine, not rejected here
    assert_eq!(CliApp::parse_command("vol 7").unwrap(), Commands::Volume { level: 7.0 });

    match CliApp::parse_command("volume loud").unwrap_err() {
        ParseError::InvalidArgument { argument, value, .. } => {
            assert_eq!(argument, "volume level");
            assert_eq!(value, "loud");
        }
        other => panic!("Expected InvalidArgument error, got {:?}", other),
    }
    assert!(matches!(
        CliApp::parse_command("volume NaN"),
        Err(ParseError::InvalidArgument { .. })
    ));
    assert!(matches!(
        CliApp::parse_command("volume"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_cover() {
    match CliApp::parse_command("cover /tmp/front.jpg").unwrap() {
        Commands::Cover { path } => assert_eq!(path, PathBuf::from("/tmp/front.jpg")),
        other => panic!("Expected Cover command, got {:?}", other),
    }
    assert!(matches!(
        CliApp::parse_command("cover"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_errors() {
    assert!(matches!(CliApp::parse_command(""), Err(ParseError::EmptyCommand)));
    assert!(matches!(CliApp::parse_command("   "), Err(ParseError::EmptyCommand)));
    assert!(matches!(CliApp::parse_command("help"), Err(ParseError::HelpRequested)));

    match CliApp::parse_command("rewind").unwrap_err() {
        ParseError::UnknownCommand { command } => assert_eq!(command, "rewind"),
        other => panic!("Expected UnknownCommand error, got {:?}", other),
    }

    // Commands are case-sensitive
    assert!(CliApp::parse_command("PLAY").is_err());
    assert!(CliApp::parse_command("pla").is_err());
}

#[test]
fn test_parse_time() {
    assert_eq!(CliApp::parse_time("1:30").unwrap(), Duration::from_secs(90));
    assert_eq!(CliApp::parse_time("0:05").unwrap(), Duration::from_secs(5));
    assert_eq!(CliApp::parse_time("90").unwrap(), Duration::from_secs(90));
    assert_eq!(CliApp::parse_time("90s").unwrap(), Duration::from_secs(90));
    assert_eq!(CliApp::parse_time("90.5").unwrap(), Duration::from_millis(90500));
    assert_eq!(CliApp::parse_time("1:30.25").unwrap(), Duration::from_millis(90250));
    assert_eq!(CliApp::parse_time("5.5s").unwrap(), Duration::from_millis(5500));
    assert_eq!(CliApp::parse_time("0").unwrap(), Duration::ZERO);
    assert_eq!(CliApp::parse_time("999:59").unwrap().as_secs(), 999 * 60 + 59);

    for input in ["1:60", "1:2:3", "abc", "1:abc", "-30", "1:-30", "", "   ", ":30", "30:", "inf"] {
        assert!(CliApp::parse_time(input).is_err(), "input: {:?}", input);
    }
}

#[test]
fn test_parse_time_rejects_values_too_large_for_duration() {
    for input in ["1e30", "1e30s", "307445734561825861:00", "18446744073709551615:59"] {
        match CliApp::parse_time(input) {
            Err(ParseError::InvalidTimeFormat { input: reported }) => assert_eq!(reported, input),
            other => panic!("Expected InvalidTimeFormat for {:?}, got {:?}", input, other),
        }
    }
    assert!(matches!(
        CliApp::parse_command("seek 1e30"),
        Ok(Commands::Seek { .. })
    ));
}

#[test]
fn test_validate_seek_time() {
    let track_duration = Duration::from_secs(180);

    assert_eq!(
        CliApp::validate_seek_time(Duration::from_secs(180), Some(track_duration)).unwrap(),
        Duration::from_secs(180)
    );

    match CliApp::validate_seek_time(Duration::from_secs(200), Some(track_duration)).unwrap_err() {
        ParseError::SeekBeyondDuration { position, duration } => {
            assert_eq!(position, 200.0);
            assert_eq!(duration, 180.0);
        }
        other => panic!("Expected SeekBeyondDuration error, got {:?}", other),
    }

    assert!(CliApp::validate_seek_time(Duration::from_secs(1000), None).is_ok());
}

#[test]
fn test_format_duration() {
    assert_eq!(CliApp::format_duration(Duration::from_secs(0)), "00:00");
    assert_eq!(CliApp::format_duration(Duration::from_secs(90)), "01:30");
    assert_eq!(CliApp::format_duration(Duration::from_secs(3661)), "61:01");
}

#[test]
fn test_parse_error_display() {
    assert_eq!(ParseError::EmptyCommand.to_string(), "Empty command");
    assert_eq!(
        ParseError::MissingArgument {
            command: "volume".to_string(),
            argument: "level".to_string(),
        }
        .to_string(),
        "Missing argument for volume: level"
    );
    assert_eq!(
        ParseError::InvalidTimeFormat {
            input: "1:60".to_string(),
        }
        .to_string(),
        "Invalid time format: 1:60"
    );
}

#[test]
fn test_command_line_arguments() {
    let app = CliApp::try_parse_from(["waveplay", "song.mp3", "--loop", "--volume", "-0.5"]).unwrap();
    assert_eq!(app.file, Some(PathBuf::from("song.mp3")));
    assert!(app.looping);
    assert_eq!(app.volume, Some(-0.5));
    assert_eq!(app.device, None);

    let app = CliApp::try_parse_from(["waveplay", "--device", "Speakers", "--log-level", "debug"]).unwrap();
    assert_eq!(app.file, None);
    assert_eq!(app.device.as_deref(), Some("Speakers"));
    assert_eq!(app.log_level.as_deref(), Some("debug"));
}

#[test]
fn test_display_help_does_not_panic() {
    CliApp::display_help();
}
