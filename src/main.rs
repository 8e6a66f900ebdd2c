// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use sqlchat::app_config::{self, Config, DatabaseBackend, TranslationProvider};
use sqlchat::database::seed;
use sqlchat::file_utils::FileManager;
use sqlchat::render;
use sqlchat::translation::history::GREETING;
use sqlchat::translation::{ChatHistory, ExportFormat, QueryResult};
use sqlchat::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Groq,
    OpenAI,
    Anthropic,
    Ollama,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Groq => TranslationProvider::Groq,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

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
    /// Answer a single question
    Ask {
        /// The question, in plain language
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Also draw a bar chart of the first numeric column
        #[arg(long)]
        chart: bool,

        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive session
    Chat {
        /// Draw a bar chart under each result
        #[arg(long)]
        chart: bool,
    },

    /// Create the demo STUDENT database
    Seed {
        /// Database file to create (defaults to the configured SQLite path)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Check that the configured provider answers
    Check,

    /// Generate shell completions for sqlchat
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// sqlchat - ask a SQL database questions in plain language
#[derive(Parser, Debug)]
#[command(name = "sqlchat")]
#[command(version)]
#[command(about = "Ask a SQL database questions in plain language")]
#[command(long_about = "sqlchat turns questions into SQL with a language model, runs them and prints the rows.

EXAMPLES:
    sqlchat seed                                      # Create the demo STUDENT database
    sqlchat ask \"Show all students with marks over 80\"
    sqlchat ask --chart \"Average marks per class\"
    sqlchat -p ollama -m llama3 chat                  # Interactive session on a local model
    sqlchat -d other.db --read-write chat             # Query (and modify) another file
    sqlchat completions bash > sqlchat.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in sqlchat.json by default. If the file doesn't
    exist, a default one is created. The API key is taken from --api-key, then
    from the provider's environment variable (GROQ_API_KEY for Groq), then
    from the configuration file.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "sqlchat.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Provider used to generate SQL
    #[arg(short, long, global = true, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API key for the provider
    #[arg(long, global = true, hide = true)]
    api_key: Option<String>,

    /// SQLite database file to query
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Open the SQLite file with write access
    #[arg(long, global = true)]
    read_write: bool,

    /// Ask the model to explain each generated query
    #[arg(long, global = true)]
    explain: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
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
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "sqlchat", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Seed { path } => {
            let config = load_config(&cli)?;
            let path = path.clone().unwrap_or(config.database.sqlite_path);
            let inserted = seed::seed_demo_database(&path).await?;
            println!("Seeded {} new record(s) into {}", inserted, path.display());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Check => {
            controller.check_provider().await?;
            println!("Provider is reachable.");
        }
        Commands::Ask { question, chart, json } => {
            controller.connect().await?;
            let mut history = ChatHistory::new();
            let spinner = spinner("Generating SQL...");
            let outcome = controller.ask(&mut history, &question).await;
            spinner.finish_and_clear();

            match outcome {
                Ok(result) if json => println!("{}", serde_json::to_string_pretty(&*result)?),
                Ok(result) => print_result(&result, chart),
                Err(e) => {
                    error!("{} failed: {}", e.stage(), e);
                    controller.close().await?;
                    return Err(anyhow!(e.user_message()));
                }
            }
            controller.close().await?;
        }
        Commands::Chat { chart } => {
            controller.connect().await?;
            run_chat(&controller, chart).await?;
            controller.close().await?;
        }
        Commands::Completions { .. } | Commands::Seed { .. } => {}
    }

    Ok(())
}

/// Load the config file and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(provider) = &cli.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &cli.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }
    config.apply_api_key(cli.api_key.clone());

    if let Some(database) = &cli.database {
        config.database.backend = DatabaseBackend::Sqlite;
        config.database.sqlite_path = database.clone();
    }
    if cli.read_write {
        config.database.read_only = false;
    }
    if cli.explain {
        config.pipeline.explain = true;
    }

    // Update log level from config if not set via command line
    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_result(result: &QueryResult, chart: bool) {
    println!("SQL: {}\n", result.sql);
    println!("{}", render::format_table(result));
    if chart {
        match render::format_bar_chart(result, 40) {
            Some(chart) => println!("\n{}", chart),
            None => info!("Nothing numeric to chart"),
        }
    }
    if let Some(explanation) = &result.explanation {
        println!("\n{}", explanation);
    }
    println!("\nExecuted in {:.2} seconds", result.elapsed_secs);
}

const CHAT_HELP: &str = "Commands: /clear, /switch <path>, /export csv|json [path], /quit";

async fn run_chat(controller: &Controller, chart: bool) -> Result<()> {
    let mut history = ChatHistory::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", GREETING);
    println!("{}", CHAT_HELP);

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/quit") | Some("/exit") => break,
            Some("/help") => println!("{}", CHAT_HELP),
            Some("/clear") => {
                history.clear();
                println!("{}", GREETING);
            }
            Some("/switch") => match parts.next() {
                Some(path) => match controller.switch_database(&PathBuf::from(path)).await {
                    Ok(()) => println!("Switched to {}", path),
                    Err(e) => error!("{:#}", e),
                },
                None => warn!("Usage: /switch <path>"),
            },
            Some("/export") => {
                match parts.next().map(str::parse::<ExportFormat>) {
                    Some(Ok(format)) => {
                        let path = parts.next().map(PathBuf::from).unwrap_or_else(|| {
                            FileManager::timestamped_path(".", "chat_history", format.extension())
                        });
                        match history.export(&path, format) {
                            Ok(()) => println!("Exported {} entries to {}", history.len(), path.display()),
                            Err(e) => error!("{:#}", e),
                        }
                    }
                    Some(Err(e)) => warn!("{}", e),
                    None => warn!("Usage: /export csv|json [path]"),
                }
            }
            _ => {
                let spinner = spinner("Generating SQL...");
                let outcome = controller.ask(&mut history, line).await;
                spinner.finish_and_clear();

                match outcome {
                    Ok(result) => print_result(&result, chart),
                    Err(e) => {
                        warn!("{} failed: {}", e.stage(), e);
                        println!("{}", e.user_message());
                    }
                }
            }
        }
    }

    Ok(())
}
