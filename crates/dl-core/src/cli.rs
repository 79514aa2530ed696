use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::session::QuickAction;

/// Ask the litigation Oracle about a claims portfolio and export the answers as PDF.
#[derive(Parser, Debug)]
#[command(name = "docketlens", version)]
pub struct Cli {
    /// Report theme: executive, midnight or ivory. Overrides the config file.
    #[arg(long, global = true)]
    pub theme: Option<String>,

    /// Page size: a4 or letter. Overrides the config file.
    #[arg(long, global = true)]
    pub page: Option<String>,

    /// Directory exported files are written to.
    #[arg(long, global = true, value_name = "DIR")]
    pub out: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a free-form question and stream the answer.
    Ask {
        question: String,
        /// JSON array of claim records.
        #[arg(long, value_name = "FILE")]
        claims: PathBuf,
        /// Also write the answer to a PDF.
        #[arg(long)]
        export: bool,
    },
    /// Run one of the canned analyses.
    Quick {
        #[arg(value_enum)]
        action: QuickAction,
        #[arg(long, value_name = "FILE")]
        claims: PathBuf,
        #[arg(long)]
        export: bool,
    },
    /// Lay out a text file (or `-` for stdin) as an Oracle analysis PDF.
    Export { input: PathBuf },
    /// Write the portfolio overview report.
    Portfolio {
        #[arg(long, value_name = "FILE")]
        claims: PathBuf,
    },
    /// Write the portfolio breakdowns as a multi-sheet spreadsheet.
    Workbook {
        #[arg(long, value_name = "FILE")]
        claims: PathBuf,
    },
}
