// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use reelsync::app_config::{self, Config};
use reelsync::app_controller::Controller;
use reelsync::file_utils::FileManager;
use reelsync::pipeline::TimingEngine;
use reelsync::subtitle_processor::{self, SubtitleFileWriter};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a text in one or more voices: script, speech, subtitles and video
    Generate(GenerateArgs),

    /// Time an existing transcript against a WAV file and write subtitles
    Timing(TimingArgs),

    /// Validate the configuration and, optionally, an ASS subtitle file
    Check {
        /// ASS file to parse and check for ordering problems
        #[arg(value_name = "SUBTITLES")]
        subtitles: Option<PathBuf>,
    },

    /// Generate shell completions for reelsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Source text (use --input to read it from a file)
    #[arg(value_name = "TEXT", conflicts_with = "input")]
    text: Option<String>,

    /// File holding the source text
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Comma-separated voices, each rendered independently
    #[arg(short, long, value_delimiter = ',', required = true)]
    voices: Vec<String>,

    /// Background video file, or a directory to pick one from at random
    #[arg(short, long, default_value = "backgrounds")]
    background: PathBuf,

    /// Output root (overrides output.root)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep intermediate files
    #[arg(long)]
    keep_temp: bool,
}

#[derive(Args, Debug)]
struct TimingArgs {
    /// Transcript text file
    #[arg(value_name = "TRANSCRIPT")]
    transcript: PathBuf,

    /// Mono WAV file of the narration
    #[arg(value_name = "AUDIO")]
    audio: PathBuf,

    /// Voice whose pacing profile to use
    #[arg(long, default_value = "default")]
    voice: String,

    /// ASS output path
    #[arg(short, long, default_value = "subtitles.ass")]
    output: PathBuf,

    /// Also write spoken cues as SRT
    #[arg(long)]
    srt: Option<PathBuf>,
}

/// reelsync - narrated short videos with synced subtitles
///
/// Turns a text into a narration script per voice, synthesizes it, times
/// subtitles against the audio and burns them into a background video.
#[derive(Parser, Debug)]
#[command(name = "reelsync")]
#[command(version)]
#[command(about = "Narrated short videos with synced subtitles")]
#[command(long_about = "reelsync renders a text in one or more voices, times subtitles against the speech and composites a vertical video.

EXAMPLES:
    reelsync generate -v fireship,keanu_reeves -i story.txt   # Two voices, one run
    reelsync generate -v walter_cronkite \"Cats learn to code\" # Text on the command line
    reelsync timing script.txt narration.wav -o subs.ass       # Timing only, offline
    reelsync check subs.ass                                    # Validate config and subtitles
    reelsync completions bash > reelsync.bash                  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::get_color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts every level; set_max_level does the filtering
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(cmd_log_level) = &cli.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "reelsync", &mut std::io::stdout());
            Ok(())
        }
        Commands::Generate(args) => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            run_generate(config, args).await
        }
        Commands::Timing(args) => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            run_timing(config, args).await
        }
        Commands::Check { subtitles } => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            run_check(&config, subtitles.as_deref())
        }
    }
}

/// Load the configuration, writing a default one if it does not exist
fn load_config(config_path: &str, cli_log_level: Option<&CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    match cli_log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(level_filter(&config.log_level)),
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_generate(mut config: Config, args: GenerateArgs) -> Result<()> {
    config.validate_credentials()?;

    if let Some(root) = args.output {
        config.output.root = root;
    }
    if args.keep_temp {
        config.output.keep_temp_files = true;
    }

    let source = match (args.text, args.input) {
        (Some(text), _) => text,
        (None, Some(input)) => FileManager::read_to_string(&input)?,
        (None, None) => return Err(anyhow!("Provide the source TEXT or --input <FILE>")),
    };

    let controller = Controller::with_config(config, args.background)?;
    let report = controller.run(&source, &args.voices).await?;

    for outcome in report.succeeded() {
        info!("Success: {}", outcome.artifacts.final_video.display());
    }
    if report.all_succeeded() {
        Ok(())
    } else {
        for failure in report.failed() {
            error!("{} (partial outputs kept for diagnosis)", failure);
        }
        Err(anyhow!("{}", report.summary()))
    }
}

async fn run_timing(config: Config, args: TimingArgs) -> Result<()> {
    let transcript = FileManager::read_to_string(&args.transcript)?;
    let voice = config.voice_registry().resolve(&args.voice).clone();

    let engine = TimingEngine::from_config(&config);
    let report = engine.run(&transcript, &voice, &args.audio).await?;

    SubtitleFileWriter::new(&config.subtitle_style, &config.video).write_ass(
        &args.output,
        &report.cues,
        report.audio_duration,
    )?;
    info!(
        "Wrote {} cues ({} timing, {:.2}s audio) to {}",
        report.cues.len(),
        report.source,
        report.audio_duration,
        args.output.display()
    );

    if let Some(srt) = args.srt {
        subtitle_processor::write_srt(&srt, &report.cues)?;
        info!("Wrote SRT to {}", srt.display());
    }
    Ok(())
}

fn run_check(config: &Config, subtitles: Option<&Path>) -> Result<()> {
    info!(
        "Configuration is valid ({} voices, aligner {})",
        config.voice_registry().names().len(),
        config.aligner.backend
    );
    if let Err(e) = config.validate_credentials() {
        warn!("{}", e);
    }

    let Some(path) = subtitles else {
        return Ok(());
    };

    let entries = subtitle_processor::parse_ass_file(path)?;
    let mut problems = 0;
    for pair in entries.windows(2) {
        if pair[1].start_time_ms < pair[0].end_time_ms {
            warn!(
                "Dialogue {} starts before dialogue {} ends ({} < {})",
                pair[1].seq_num,
                pair[0].seq_num,
                subtitle_processor::SubtitleEntry::format_srt_timestamp(pair[1].start_time_ms),
                subtitle_processor::SubtitleEntry::format_srt_timestamp(pair[0].end_time_ms)
            );
            problems += 1;
        }
    }
    for entry in entries.iter().filter(|e| e.end_time_ms < e.start_time_ms) {
        warn!("Dialogue {} ends before it starts", entry.seq_num);
        problems += 1;
    }

    if problems > 0 {
        return Err(anyhow!("{}: {} timing problem(s) in {} dialogues", path.display(), problems, entries.len()));
    }
    info!("{}: {} dialogues, timing is sequential", path.display(), entries.len());
    Ok(())
}
