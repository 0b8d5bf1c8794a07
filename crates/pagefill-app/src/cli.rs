//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use pagefill_core::{Margin, PaperSize};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pagefill")]
#[command(about = "Place text fields on a scanned page and export it as PDF")]
pub struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the saved document (defaults to the user data dir).
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the saved document.
    Status {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Set the background page image.
    Background {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Add a text field with its top-left corner at (x, y).
    Add {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        text: String,
    },
    /// Run a text command such as "자동 채우기" or "match style".
    Command {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Export the page.
    Export {
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = PaperArg::A4)]
        paper: PaperArg,
        #[arg(long)]
        landscape: bool,
        #[arg(long, value_enum, default_value_t = MarginArg::Normal)]
        margin: MarginArg,
        /// Write the composed HTML instead of rendering a PDF.
        #[arg(long)]
        html: bool,
        /// Seal every "(인)" field with a red name stamp.
        #[arg(long, value_name = "NAME")]
        stamp: Option<String>,
    },
    /// Delete every text field, the background and the saved data.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaperArg {
    A4,
    Letter,
    A5,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::A5 => PaperSize::A5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarginArg {
    None,
    Narrow,
    Normal,
    Wide,
}

impl From<MarginArg> for Margin {
    fn from(arg: MarginArg) -> Self {
        match arg {
            MarginArg::None => Margin::None,
            MarginArg::Narrow => Margin::Narrow,
            MarginArg::Normal => Margin::Normal,
            MarginArg::Wide => Margin::Wide,
        }
    }
}
