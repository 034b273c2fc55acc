mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "wtx", version, about = "Automated test-case exploration for web applications")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./wtx.yaml, then ~/.wtx/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// URL of the WebDriver server
    #[arg(long, global = true, default_value = "http://localhost:4444")]
    webdriver_url: String,

    /// Ask the browser to run headless
    #[arg(long, global = true)]
    headless: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Explore the application and write test cases
    Explore {
        /// Start URL, overriding the config file
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        max_length: Option<usize>,
        /// Zero-based partition to explore
        #[arg(long, requires = "partitions")]
        partition: Option<usize>,
        /// Number of partitions the seed frontier is split into
        #[arg(long)]
        partitions: Option<usize>,
        #[arg(long)]
        queue_file: Option<PathBuf>,
        /// Continue from the queue file of an earlier run
        #[arg(long)]
        resume: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay recorded test cases
    Replay {
        /// Glob of test case files, e.g. "testcases/*.json"
        pattern: String,
    },
    /// Print the sequences queued in a frontier checkpoint
    Frontier { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let driver = commands::DriverOptions {
        webdriver_url: args.webdriver_url,
        headless: args.headless,
    };

    match args.command {
        Command::Explore {
            url,
            max_length,
            partition,
            partitions,
            queue_file,
            resume,
            output_dir,
        } => {
            let overrides = commands::ExploreOverrides {
                url,
                max_length,
                partition,
                partitions,
                queue_file,
                resume,
                output_dir,
            };
            commands::explore(args.config.as_deref(), overrides, &driver).await
        }
        Command::Replay { pattern } => {
            commands::replay(args.config.as_deref(), &pattern, &driver).await
        }
        Command::Frontier { file } => commands::frontier(&file).await,
    }
}
