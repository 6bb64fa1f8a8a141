use std::path::PathBuf;
use std::process;

use casedavedere::config::{self, RunPaths};
use casedavedere::pipeline::{self, RunOptions};
use casedavedere::scraper::WebScraper;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "casedavedere")]
#[command(about = "A casedavedere.it listing scraper and notifier", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct PathArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Directory holding the JSON configuration and run state"
    )]
    config_dir: PathBuf,

    #[arg(long, value_name = "FILE", help = "Where to write the HTML report")]
    report: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Where to keep the codes seen by the last run")]
    codes: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Gmail authorized-user token file")]
    token: Option<PathBuf>,
}

impl PathArgs {
    fn into_paths(self) -> RunPaths {
        let mut paths = RunPaths::in_dir(&self.config_dir);
        if let Some(report) = self.report {
            paths.report = report;
        }
        if let Some(codes) = self.codes {
            paths.codes = codes;
        }
        if let Some(token) = self.token {
            paths.token = token;
        }
        paths
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every configured area, write the report and email new matches
    Run {
        #[command(flatten)]
        paths: PathArgs,

        #[arg(long, help = "Do not send the notification email")]
        no_notify: bool,
    },
    /// Fetch a single listing page and show the extracted attributes
    Detail {
        #[arg(help = "URL of the listing detail page to fetch")]
        url: String,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Show the configured filter
    Filter {
        #[arg(
            long,
            value_name = "DIR",
            default_value = ".",
            help = "Directory holding the JSON configuration"
        )]
        config_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Run { paths, no_notify } => {
            let paths = paths.into_paths();
            let options = RunOptions { notify: !no_notify };

            let summary = pipeline::run(&paths, options).await.unwrap_or_else(|e| {
                log::error!("Run aborted: {}", e);
                process::exit(1);
            });

            print!("{}", summary);
        }

        Commands::Detail { url, format } => {
            let scraper = WebScraper::new().unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });

            log::info!("Fetching listing from {}...", url);

            let record = scraper.fetch_listing(&url).await.unwrap_or_else(|e| {
                log::error!("Error fetching listing: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => match serde_json::to_string_pretty(&record) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        log::error!("Error serializing to JSON: {}", e);
                        process::exit(1);
                    }
                },
                OutputFormat::Text => println!("{}", record),
            }
        }

        Commands::Filter { config_dir } => {
            let paths = RunPaths::in_dir(&config_dir);
            match config::load_filter(&paths.filter) {
                Ok(Some(filter)) => print!("{}", filter),
                Ok(None) => {
                    log::error!("No filter configured at {}", paths.filter.display());
                    process::exit(1);
                }
                Err(e) => {
                    log::error!("{}", e);
                    process::exit(1);
                }
            }
        }
    }
}
