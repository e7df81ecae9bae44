use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "fund-insight")]
#[command(about = "Portfolio analytics over fund workbooks, with AI-assisted analysis")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Gemini API key (overrides config and GEMINI_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log process CPU/memory per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the dashboard: overview, performance, risk, holdings, sectors, alerts
    Summary {
        /// Workbook (.xlsx/.xls/.ods), zip of CSV sheets, or directory of CSV sheets
        workbook: PathBuf,

        /// Print the processed portfolio as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Export a time series sheet as CSV
    Series {
        workbook: PathBuf,

        #[arg(long)]
        sheet: String,

        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the AI analysis and recommendations
    Analyze { workbook: PathBuf },

    /// Ask questions about the portfolio (interactive unless --message is given)
    Chat {
        workbook: PathBuf,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Write a report bundle (.zip) with text report, JSON summary and CSV tables
    Export {
        workbook: PathBuf,

        /// Output directory (defaults to [report].output_path)
        #[arg(short, long)]
        output: Option<String>,

        /// Include AI analysis and recommendations
        #[arg(long)]
        with_ai: bool,
    },

    /// Show statistics of the persisted snapshot index
    IndexStats,

    /// Verify the API key and model with a test request
    Check,
}
