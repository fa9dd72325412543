//! CLI argument definitions

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "citerag")]
#[command(
    author,
    version,
    about = "Ask questions about your documents and get answers with citations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "CITERAG_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Ask a question
    Ask(AskArgs),

    /// Ingest a file or a piece of text
    Ingest(IngestArgs),

    /// List ingested documents, newest first
    Documents,

    /// Show or initialize configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 0.0.0.0:3001
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Ask a running citerag server instead of calling providers directly
    #[arg(long)]
    pub remote: Option<String>,

    /// Wait for the full answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,
}

impl AskArgs {
    pub fn question_text(&self) -> String {
        self.question.join(" ")
    }
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "text"])))]
pub struct IngestArgs {
    /// File to ingest (PDF or text)
    pub file: Option<PathBuf>,

    /// Ingest this text instead of a file
    #[arg(long)]
    pub text: Option<String>,

    /// Source name recorded with every chunk
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write a default config file if none exists
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
}
