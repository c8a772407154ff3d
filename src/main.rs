use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use waveplay::audio::{CpalOutput, DeviceManager, PlaybackEngine, PlaybackNotification, SymphoniaDecoder};
use waveplay::cli::{CliApp, Commands, ParseError, StatusDisplay};
use waveplay::config::{ConfigManager, PlayerConfig};
use waveplay::error::{DecodeError, ErrorSeverity, PlayerError};
use waveplay::logging::{PlayerLogger, LOG_LEVEL_ENV};
use waveplay::models::{PlaybackState, PlayerStatus};
use waveplay::pipeline::{LoadedTrack, LoadingPipeline, RawFile};

/// Owns the engine and the loading pipeline for one interactive session
pub struct AppController {
    engine: PlaybackEngine,
    pipeline: LoadingPipeline,
    logger: PlayerLogger,
    file: Option<PathBuf>,
    track: Option<LoadedTrack>,
}

impl AppController {
    pub fn new(cli: &CliApp, config: &PlayerConfig) -> Result<Self, PlayerError> {
        let mut engine_config = config.engine_config()?;
        if let Some(volume) = cli.volume {
            engine_config.initial_volume = engine_config.clamp_volume(volume);
        }
        engine_config.loop_by_default |= cli.looping;

        let device = cli.device.as_deref().or(config.preferred_device.as_deref());
        let output = CpalOutput::open(device)?;
        let (engine, event_loop) = PlaybackEngine::create(Box::new(output), engine_config);
        tokio::spawn(event_loop.run());

        let pipeline = LoadingPipeline::new(engine.clone(), Arc::new(SymphoniaDecoder::new()));
        info!("Application controller initialized");

        Ok(Self {
            engine,
            pipeline,
            logger: PlayerLogger::new(),
            file: None,
            track: None,
        })
    }

    pub async fn execute_command(&mut self, command: Commands) -> Result<(), PlayerError> {
        match command {
            Commands::Open { path } => self.open(&path).await?,
            Commands::Play => {
                if !self.engine.is_loaded() {
                    println!("No file loaded. Use 'open <path>' first.");
                    return Ok(());
                }
                self.engine.play()?;
                self.logger.log_playback_started(self.engine.current_time());
                println!("▶ Playing: {}", self.status().display_name());
            }
            Commands::Pause => {
                self.engine.pause(false)?;
                self.logger.log_playback_paused(self.engine.current_time());
                println!("⏸ Paused at {}", CliApp::format_duration(self.position()));
            }
            Commands::Stop => {
                self.engine.stop()?;
                self.logger.log_playback_stopped("user request");
                println!("⏹ Stopped");
            }
            Commands::Seek { position } => {
                let target = CliApp::parse_time(&position)?;
                let duration = self.track.as_ref().map(|track| track.duration);
                let target = CliApp::validate_seek_time(target, duration)?;

                let from = self.engine.current_time();
                self.engine.seek(target.as_secs_f64())?;
                self.logger.log_seek_operation(from, target.as_secs_f64());
                println!("Seeked to {}", CliApp::format_duration(target));
            }
            Commands::Loop => {
                let enabled = self.engine.toggle_loop();
                self.logger.log_loop_toggled(enabled);
                println!("Loop {}", if enabled { "on" } else { "off" });
            }
            Commands::Volume { level } => {
                let applied = self.engine.change_volume(level);
                self.logger.log_volume_changed(level, applied);
                println!("Volume: {}", StatusDisplay::format_volume(applied));
            }
            Commands::Status => StatusDisplay::display_full_status(&self.status()),
            Commands::Tags => match &self.track {
                Some(track) => StatusDisplay::display_tags(&track.tags),
                None => println!("No file loaded"),
            },
            Commands::Cover { path } => self.export_cover(path).await?,
            Commands::Devices => {
                let manager = DeviceManager::new()?;
                StatusDisplay::display_devices(&manager.list_devices(), self.engine.device_name().as_deref());
            }
            Commands::Quit => {}
        }
        Ok(())
    }

    async fn open(&mut self, path: &Path) -> Result<(), PlayerError> {
        let file = RawFile::read(path).await?;
        if !file.is_audio() {
            return Err(DecodeError::UnsupportedFormat {
                format: file.media_type.clone(),
            }
            .into());
        }

        println!("Loading {}...", file.display_name());
        let track = match self.pipeline.load(file).await {
            Ok(track) => track,
            Err(e) => {
                self.file = None;
                self.track = None;
                self.logger.log_decode_error(&path.display().to_string(), &e.to_string());
                return Err(e.into());
            }
        };

        let name = path.display().to_string();
        match &track.tag_report {
            None => self.logger.log_metadata_skipped(&name, "no tag marker"),
            Some(report) if !report.is_complete() => {
                if let Some(diagnostic) = &report.diagnostic {
                    self.logger.log_metadata_skipped(&name, &diagnostic.to_string());
                }
            }
            Some(_) => {}
        }
        self.logger.log_track_loaded(&name, track.duration, track.load_time);

        self.file = Some(path.to_path_buf());
        self.track = Some(track);
        StatusDisplay::display_compact_status(&self.status());
        Ok(())
    }

    async fn export_cover(&self, path: PathBuf) -> Result<(), PlayerError> {
        let Some(picture) = self.track.as_ref().and_then(|track| track.tags.picture.as_ref()) else {
            println!("No embedded picture");
            return Ok(());
        };

        let path = if path.extension().is_none() {
            path.with_extension(picture.extension())
        } else {
            path
        };
        tokio::fs::write(&path, &picture.data).await?;
        println!("Saved {} to {}", StatusDisplay::describe_picture(picture), path.display());
        Ok(())
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(self.engine.current_time().max(0.0))
    }

    fn status(&self) -> PlayerStatus {
        let mut status = PlayerStatus::new();
        status.state = self.engine.state();
        status.volume = self.engine.volume();
        status.is_loop = self.engine.is_loop();
        status.output_device = self.engine.device_name();

        if status.state != PlaybackState::Unloaded {
            status.file = self.file.clone();
            status.position = self.position();
            status.duration = Duration::from_secs_f64(self.engine.duration().max(0.0));
            if let Some(track) = &self.track {
                status.tags = track.tags.clone();
            }
        }
        status
    }

    fn handle_notification(&self, notification: PlaybackNotification) {
        match notification {
            PlaybackNotification::Started => debug!("Playback started"),
            PlaybackNotification::Paused { reset } => debug!("Playback paused (reset: {})", reset),
            PlaybackNotification::Ended { looping } => {
                self.logger.log_playback_stopped("end of file");
                println!();
                if looping {
                    println!("↻ Looping: {}", self.status().display_name());
                } else {
                    println!("■ Finished: {}", self.status().display_name());
                }
            }
        }
    }

    fn handle_error(&self, error: &PlayerError) {
        match error.severity() {
            ErrorSeverity::Info => info!("{}", error),
            ErrorSeverity::Warning => warn!("{}", error),
            ErrorSeverity::Error | ErrorSeverity::Critical => error!("{}", error),
        }
        if let PlayerError::Audio(e) = error {
            self.logger.log_stream_error(&e.to_string());
        }
        StatusDisplay::display_error(error);
    }

    pub async fn run_interactive_mode(&mut self) -> Result<(), PlayerError> {
        println!("waveplay {}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let shutdown_flag_clone = Arc::clone(&shutdown_flag);
        if let Err(e) = ctrlc::set_handler(move || {
            println!("\nReceived interrupt signal. Shutting down...");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }

        // stdin is read on its own thread so notifications are shown while
        // the prompt waits
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut notifications = self.engine.subscribe();
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        let mut awaiting_input = false;

        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                break;
            }

            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    awaiting_input = false;
                    let Some(line) = line else {
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(Commands::Quit) => {
                            println!("Goodbye!");
                            break;
                        }
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command).await {
                                self.handle_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            println!("Type 'help' for available commands.");
                        }
                    }
                }

                notification = notifications.recv() => {
                    match notification {
                        Ok(notification) => {
                            self.handle_notification(notification);
                            awaiting_input = false;
                        }
                        Err(RecvError::Lagged(skipped)) => debug!("Skipped {} playback notifications", skipped),
                        Err(RecvError::Closed) => break,
                    }
                }

                _ = interval.tick() => {}
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Stop playback and release the output
    pub fn shutdown(&mut self) {
        println!("Shutting down...");
        self.engine.teardown();

        let stats = self.logger.get_event_statistics();
        debug!("Session events: {:?}", stats);
    }
}

#[tokio::main]
async fn main() {
    let cli = CliApp::parse();

    // Fall back to defaults when the config is unusable; the reason is
    // logged once the logger is up
    let (config, config_error) = match ConfigManager::new() {
        Ok(manager) => (manager.get_config().clone(), None),
        Err(e) => (PlayerConfig::default(), Some(e)),
    };

    if let Some(level) = &cli.log_level {
        std::env::set_var(LOG_LEVEL_ENV, level);
    }
    if let Err(e) = PlayerLogger::init(&config.log_level) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    if let Some(e) = config_error {
        warn!("Ignoring config file, using defaults: {}", e);
        eprintln!("Warning: {}", e);
    }

    let mut app = match AppController::new(&cli, &config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    if let Some(path) = &cli.file {
        let path = CliApp::expand_path(&path.to_string_lossy());
        if let Err(e) = app.open(&path).await {
            app.handle_error(&e);
        } else if let Err(e) = app.execute_command(Commands::Play).await {
            app.handle_error(&e);
        }
    }

    if let Err(e) = app.run_interactive_mode().await {
        app.handle_error(&e);
        std::process::exit(1);
    }

    info!("Application shutdown complete");
}
