// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tmxstore::app_config::{self, Config};
use tmxstore::{Session, TaskKind, UnitQuery, merge_files, split_file};

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
    /// Load a TMX file and print unit and word counts per language
    Info {
        /// TMX file to inspect
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Run cleaning operations and save the result
    Clean(CleanArgs),

    /// Write the units matching a filter to a new TMX file
    Export(ExportArgs),

    /// Rename a language code throughout a file
    RenameLanguage {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Current language code
        old: String,
        /// New language code
        new: String,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove every variant of a language
    RemoveLanguage {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Language code to remove
        language: String,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Split a TMX file into parts of equal size
    Split {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Number of parts
        #[arg(short, long, default_value_t = 2)]
        parts: usize,
    },

    /// Merge TMX files into one
    Merge {
        /// Files to merge, in order
        #[arg(value_name = "INPUTS", num_args = 2.., required = true)]
        inputs: Vec<PathBuf>,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate shell completions for tmxstore
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct CleanArgs {
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Remove units whose sort-language text repeats an earlier unit
    #[arg(long)]
    duplicates: bool,

    /// Remove units untranslated with respect to this source language
    #[arg(long, value_name = "LANG")]
    untranslated: Option<String>,

    /// Remove target variants identical to this source language
    #[arg(long, value_name = "LANG")]
    same_as_source: Option<String>,

    /// Merge units sharing text in this language
    #[arg(long, value_name = "LANG")]
    consolidate: Option<String>,

    /// Trim leading and trailing whitespace
    #[arg(long)]
    spaces: bool,

    /// Strip inline tags
    #[arg(long)]
    tags: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Language the filter text applies to
    #[arg(short, long)]
    language: Option<String>,

    /// Text to search for
    #[arg(short, long, requires = "language")]
    filter: Option<String>,

    /// Treat the filter as a regular expression
    #[arg(long)]
    regexp: bool,

    /// Match case exactly
    #[arg(long)]
    case_sensitive: bool,

    /// Keep only units untranslated with respect to this source language
    #[arg(long, value_name = "LANG")]
    untranslated: Option<String>,
}

/// tmxstore - Translation memory store and cleaner
///
/// Loads TMX files into a disposable SQLite store and runs editing and
/// cleaning operations over corpora too large for memory.
#[derive(Parser, Debug)]
#[command(name = "tmxstore")]
#[command(version)]
#[command(about = "TMX translation memory store and cleaner")]
#[command(long_about = "tmxstore loads TMX translation memories into a disposable store, cleans them and writes them back.

EXAMPLES:
    tmxstore info memory.tmx                                  # Units and words per language
    tmxstore clean --duplicates --spaces -o out.tmx memory.tmx
    tmxstore clean --untranslated en -o out.tmx memory.tmx    # Drop units lacking a translation
    tmxstore export -l fr -f 'bonjour' -o hits.tmx memory.tmx
    tmxstore rename-language memory.tmx en-US en -o out.tmx
    tmxstore split -p 4 memory.tmx                            # memory_1.tmx .. memory_4.tmx
    tmxstore merge a.tmx b.tmx -o all.tmx
    tmxstore completions bash > tmxstore.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, global = true, value_enum)]
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

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
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
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at trace and narrow once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "tmxstore", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)
        .with_context(|| format!("Failed to load config file: {}", cli.config_path))?;
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level.into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.into());
    debug!("Using configuration {:?}", config);

    match cli.command {
        Commands::Info { input } => run_info(&config, input).await,
        Commands::Clean(args) => run_clean(&config, args).await,
        Commands::Export(args) => run_export(&config, args).await,
        Commands::RenameLanguage { input, old, new, output } => {
            let session = open_session(&config, input).await?;
            session.spawn(TaskKind::Batch, move |store| {
                if !store.change_language(&old, &new)? {
                    log::warn!("{} already exists, nothing renamed", new);
                }
                Ok(())
            })?;
            track(&session, "Renaming").await?;
            save(&session, output).await
        }
        Commands::RemoveLanguage { input, language, output } => {
            let session = open_session(&config, input).await?;
            session.spawn(TaskKind::Batch, move |store| store.remove_language(&language))?;
            track(&session, "Removing").await?;
            save(&session, output).await
        }
        Commands::Split { input, parts } => {
            let indentation = config.store.indentation;
            let outputs =
                tokio::task::spawn_blocking(move || split_file(input, parts, indentation)).await??;
            for output in outputs {
                println!("{}", output.display());
            }
            Ok(())
        }
        Commands::Merge { inputs, output } => {
            let indentation = config.store.indentation;
            let written =
                tokio::task::spawn_blocking(move || merge_files(&inputs, &output, indentation))
                    .await??;
            info!("Merged {} units", written);
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Poll a running task with a spinner until it ends
async fn track(session: &Session, label: &str) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .map_err(|e| anyhow!("Invalid progress template: {}", e))?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    loop {
        let status = session.status();
        spinner.set_message(format!("{}: {} units", label, status.processed));
        if !status.running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    session.wait().await?;
    spinner.finish_and_clear();

    let status = session.status();
    if let Some(error) = status.error {
        return Err(anyhow!("{} failed: {}", label, error));
    }
    info!("{}: {} units", label, status.processed);
    Ok(())
}

async fn open_session(config: &Config, input: PathBuf) -> Result<Session> {
    if !input.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", input));
    }
    let session = Session::new(config.store.clone());
    session.open(input).await?;
    track(&session, "Loading").await?;
    Ok(session)
}

async fn save(session: &Session, output: PathBuf) -> Result<()> {
    session.spawn(TaskKind::Save, move |store| store.write_file(&output).map(|_| ()))?;
    track(session, "Saving").await?;
    session.close().await?;
    Ok(())
}

async fn run_info(config: &Config, input: PathBuf) -> Result<()> {
    let session = open_session(config, input).await?;
    let (header, statistics, database) = session.with_store(|store| {
        Ok((store.header()?, store.statistics()?, store.backend().stats()?))
    })?;
    session.close().await?;
    debug!("Working database: {}", database);

    println!("Source language: {}", header.srclang());
    println!("Units: {}", statistics.units);
    for language in statistics.languages {
        println!(
            "  {:<10} {:>10} variants {:>12} words",
            language.language, language.variants, language.words
        );
    }
    Ok(())
}

async fn run_clean(config: &Config, args: CleanArgs) -> Result<()> {
    let session = open_session(config, args.input).await?;

    if args.spaces {
        session.spawn(TaskKind::Batch, |store| store.remove_spaces().map(|_| ()))?;
        track(&session, "Normalizing spaces").await?;
    }
    if args.tags {
        session.spawn(TaskKind::Batch, |store| store.remove_tags().map(|_| ()))?;
        track(&session, "Removing tags").await?;
    }
    if let Some(lang) = args.same_as_source {
        session.spawn(TaskKind::Batch, move |store| {
            store.remove_same_as_source(&lang).map(|_| ())
        })?;
        track(&session, "Removing same-as-source").await?;
    }
    if let Some(lang) = args.consolidate {
        session.spawn(TaskKind::Batch, move |store| store.consolidate_units(&lang).map(|_| ()))?;
        track(&session, "Consolidating").await?;
    }
    if args.duplicates {
        session.spawn(TaskKind::Batch, |store| store.remove_duplicates().map(|_| ()))?;
        track(&session, "Removing duplicates").await?;
    }
    if let Some(lang) = args.untranslated {
        session.spawn(TaskKind::Batch, move |store| {
            store.remove_untranslated(&lang).map(|_| ())
        })?;
        track(&session, "Removing untranslated").await?;
    }

    save(&session, args.output).await
}

async fn run_export(config: &Config, args: ExportArgs) -> Result<()> {
    let mut query = UnitQuery::default();
    if let (Some(language), Some(filter)) = (&args.language, &args.filter) {
        query = query.with_filter(language, filter, args.case_sensitive, args.regexp);
    }
    if let Some(source) = &args.untranslated {
        query = query.untranslated(source);
    }

    let session = open_session(config, args.input).await?;
    let output = args.output;
    session.spawn(TaskKind::Export, move |store| {
        store.export_file(&output, &query).map(|_| ())
    })?;
    track(&session, "Exporting").await?;
    session.close().await?;
    Ok(())
}
