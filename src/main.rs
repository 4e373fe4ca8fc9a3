// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, error, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use subconv::app_config::{self, Config};
use subconv::formats::{CodecOptions, FormatRegistry};
use subconv::request::{self, ConversionRequest};
use subconv::Controller;

/// Options accepted in the legacy `/name:value` form
const LEGACY_OPTIONS: [&str; 10] = [
    "offset",
    "encoding",
    "fps",
    "targetfps",
    "inputfolder",
    "outputfolder",
    "pac-codepage",
    "overwrite",
    "list",
    "sourceformat",
];

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
    /// Convert subtitle files to another format
    Convert(ConvertArgs),

    /// Generate shell completions for subconv
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input file, comma-separated list or wildcard pattern
    #[arg(value_name = "PATTERN", required_unless_present = "list")]
    pattern: Option<String>,

    /// Target format name (see --list)
    #[arg(value_name = "FORMAT", required_unless_present = "list")]
    target_format: Option<String>,

    /// Shift all times by [-]hh:mm:ss:ms
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<String>,

    /// Output text encoding (utf-8, utf-16le, windows-1252, ...)
    #[arg(long)]
    encoding: Option<String>,

    /// Frame rate of the input
    #[arg(long)]
    fps: Option<String>,

    /// Retarget times to this frame rate
    #[arg(long)]
    targetfps: Option<String>,

    /// Folder the pattern is resolved against
    #[arg(long)]
    inputfolder: Option<PathBuf>,

    /// Folder output files are written to
    #[arg(long)]
    outputfolder: Option<PathBuf>,

    /// Code page written into binary formats
    #[arg(long = "pac-codepage")]
    pac_codepage: Option<u32>,

    /// Overwrite existing output files
    #[arg(long)]
    overwrite: bool,

    /// List the supported formats and exit
    #[arg(long)]
    list: bool,

    /// Skip detection and read input as this format
    #[arg(long)]
    sourceformat: Option<String>,
}

/// subconv - subtitle format converter
///
/// Converts subtitle files between formats, one file or a whole batch at a time.
#[derive(Parser, Debug)]
#[command(name = "subconv")]
#[command(version)]
#[command(about = "Subtitle format converter")]
#[command(long_about = "subconv converts subtitle files between text and binary formats and extracts subtitle tracks from Matroska files.

EXAMPLES:
    subconv convert movie.sub SubRip                       # MicroDVD to SubRip
    subconv convert \"*.srt\" \"Advanced Sub Station Alpha\"   # Every SubRip file in the folder
    subconv convert movie.mkv SubRip                       # Every text track of a container
    subconv convert movie.srt ebustl /offset:-00:00:01:500 # Legacy option syntax
    subconv convert --list                                 # Supported formats
    subconv completions bash > subconv.bash                # Generate bash completions

CONFIGURATION:
    subconv.json in the working directory is read when present; --config
    selects another file. No configuration file is ever written.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

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
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
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
            let color = Self::color_for_level(record.level());
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

/// Rewrite `/name[:value]` and `-name[:value]` tokens naming a known option
/// into `--name[=value]`; everything else passes through
fn rewrite_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let body = match text.strip_prefix('/') {
                Some(rest) => rest,
                None if !text.starts_with("--") => match text.strip_prefix('-') {
                    Some(rest) => rest,
                    None => return arg,
                },
                None => return arg,
            };
            let (name, value) = match body.split_once(':') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };
            let name = name.to_ascii_lowercase();
            if !LEGACY_OPTIONS.contains(&name.as_str()) {
                return arg;
            }
            match value {
                Some(value) => OsString::from(format!("--{}={}", name, value)),
                None => OsString::from(format!("--{}", name)),
            }
        })
        .collect()
}

#[tokio::main]
async fn main() {
    // Warn until the configuration says otherwise
    if let Err(e) = CustomLogger::init(LevelFilter::Warn) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let args = rewrite_legacy_args(std::env::args_os());
    let cli = match CommandLineOptions::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: CommandLineOptions) -> Result<i32> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subconv", &mut std::io::stdout());
            Ok(0)
        }
        Commands::Convert(args) => run_convert(args, cli.config, cli.log_level).await,
    }
}

async fn run_convert(args: ConvertArgs, config_path: Option<PathBuf>, log_level: Option<CliLogLevel>) -> Result<i32> {
    if args.list {
        let mut stdout = std::io::stdout().lock();
        for line in FormatRegistry::new().listing() {
            writeln!(stdout, "{}", line)?;
        }
        return Ok(0);
    }

    let working_dir = std::env::current_dir().context("Failed to resolve the working directory")?;
    let config = Config::load(config_path.as_deref(), &working_dir)?;

    // If log level was not set via command line, update it from config now
    if log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }
    debug!("Configuration: {:?}", config);

    let request = build_request(args)?;
    let controller = Controller::with_config(config);

    let cancel = controller.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current file");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let summary = tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout().lock();
        controller.run(&request, &mut stdout)
    })
    .await
    .context("Conversion task failed")?;

    Ok(summary.exit_code())
}

fn build_request(args: ConvertArgs) -> Result<ConversionRequest> {
    let (Some(pattern), Some(target_format)) = (args.pattern, args.target_format) else {
        anyhow::bail!("A file pattern and a target format are required");
    };

    let mut request = ConversionRequest::new(pattern, target_format);
    // An unreadable offset is reported and ignored; the batch still runs
    request.offset = args.offset.as_deref().and_then(|raw| match request::parse_offset(raw) {
        Ok(offset) => Some(offset),
        Err(e) => {
            warn!("Unable to read offset '{}', converting without it: {}", raw, e);
            None
        }
    });
    request.source_frame_rate = args
        .fps
        .as_deref()
        .map(request::parse_frame_rate)
        .transpose()
        .context("Invalid --fps")?;
    request.target_frame_rate = args
        .targetfps
        .as_deref()
        .map(request::parse_frame_rate)
        .transpose()
        .context("Invalid --targetfps")?;
    request.encoding = args.encoding;
    request.input_folder = args.inputfolder;
    request.output_folder = args.outputfolder;
    request.overwrite = args.overwrite;
    request.source_format = args.sourceformat;
    request.codec_options = CodecOptions {
        code_page: args.pac_codepage,
    };
    Ok(request)
}
