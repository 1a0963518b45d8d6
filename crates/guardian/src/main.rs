mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "guardian",
    version,
    about = "Phishing-risk analysis for Thai banking and e-commerce pages"
)]
pub struct Cli {
    /// Config file (default: GUARDIAN_CONFIG, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a saved page locally
    Analyze {
        /// HTML file to analyze ("-" for stdin)
        file: String,

        /// URL the page was served from
        #[arg(long)]
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Record the verdict in the store and escalate it like the extension would
        #[arg(long)]
        record: bool,

        /// Tab the recorded verdict belongs to
        #[arg(long, default_value_t = 0)]
        tab: u32,
    },

    /// Print the feature snapshot extracted from a saved page
    Features {
        /// HTML file to read ("-" for stdin)
        file: String,

        /// URL the page was served from
        #[arg(long)]
        url: String,
    },

    /// Run the escalation coordinator over stdio (one JSON message per line)
    Coordinator,

    /// Show the stored verdict as the popup would
    Popup {
        /// Active tab (falls back to the most recent verdict)
        #[arg(long)]
        tab: Option<u32>,

        /// Re-run local analysis on this HTML file first
        #[arg(long, requires = "url")]
        rerun: Option<String>,

        /// URL of the re-run page
        #[arg(long)]
        url: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    cli::init_logging();

    let cli = Cli::parse();
    let config = guardian_core::config::Config::discover(cli.config.as_deref());

    let exit_code = match cli.command {
        Commands::Analyze {
            file,
            url,
            json,
            record,
            tab,
        } => cli::analyze::run(&config, &file, &url, json, record, tab),

        Commands::Features { file, url } => cli::analyze::features(&config, &file, &url),

        Commands::Coordinator => cli::coordinator::run(&config),

        Commands::Popup {
            tab,
            rerun,
            url,
            json,
        } => cli::popup::run(&config, tab, rerun.as_deref(), url.as_deref(), json),
    };

    std::process::exit(exit_code);
}
