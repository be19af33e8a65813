use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use rowpipe::cli::{check_pipeline, fetch_resource, run_pipeline};
use rowpipe::extract::CacheConfig;
use rowpipe::row::TOPIC_FIELD;
use std::path::PathBuf;
use std::time::Duration;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Row pipelines: extract resources, route rows through transforms, load the output
#[derive(Parser)]
#[command(name = "rowpipe", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline file
    Run {
        /// YAML file declaring the pipeline
        pipeline: PathBuf,

        /// NDJSON file receiving the output rows (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a pipeline file without running it
    Check {
        /// YAML file declaring the pipeline
        pipeline: PathBuf,
    },

    /// Fetch a file, HTTP or FTP resource and display it
    Fetch {
        /// Local path or http(s):// / ftp:// URI
        uri: String,

        /// Field receiving the content
        #[arg(short, long, default_value = TOPIC_FIELD)]
        field: String,

        /// Cache file to serve the content from
        #[arg(short, long)]
        cache: Option<PathBuf>,

        /// Cache lifetime in seconds
        #[arg(short, long, default_value_t = 3600, requires = "cache")]
        ttl: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(err) = dotenvy::from_filename(&cli.env) {
        if !err.not_found() {
            return Err(err.into());
        }
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    match cli.command {
        Commands::Run { pipeline, output } => {
            log::info!("Running pipeline {}", pipeline.display().bright_black());
            let summary = run_pipeline(&pipeline, output.as_deref())?;
            log::info!(
                "Loaded {} of {} extracted rows",
                summary.loaded.cyan(),
                summary.extracted.cyan()
            );
        }
        Commands::Check { pipeline } => {
            let nodes = check_pipeline(&pipeline)?;
            log::info!(
                "Pipeline {} is valid: {}",
                pipeline.display().bright_black(),
                nodes.join(" → ")
            );
        }
        Commands::Fetch {
            uri,
            field,
            cache,
            ttl,
        } => {
            let cache = cache.map(|path| CacheConfig::new(path, Duration::from_secs(ttl)));
            let rows = fetch_resource(&uri, &field, cache)?;
            log::debug!("Fetched {} rows from {}", rows.len(), uri.bright_black());
        }
    }

    Ok(())
}
