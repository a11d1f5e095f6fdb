use crate::config::{parse_dialect, parse_log_level, parse_page_lines, Options};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// Conversation-script interpreter for point-and-click adventures
#[derive(Parser, Debug)]
#[command(name = "parlor")]
#[command(version = "0.1.0")]
#[command(about = "Inspect and play adventure-game talk files", long_about = None)]
pub struct Cli {
    /// Options file (default: parlor.cfg in the working directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Directory holding .tlk talk files
    #[arg(short = 'C', long, value_name = "CONTENTDIR")]
    pub contentdir: Option<String>,

    /// Script dialect (scalpel, tattoo)
    #[arg(short, long, value_name = "DIALECT")]
    pub dialect: Option<String>,

    /// Log verbosity (nothing, user, error, warning, info, debug, all or 0-6)
    #[arg(short, long, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// Dialogue window width in pixels
    #[arg(long, value_name = "PIXELS")]
    pub windowwidth: Option<u32>,

    /// Lines per dialogue page
    #[arg(long, value_name = "LINES")]
    pub pagelines: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the statements of a talk file and their talk map
    Dump {
        /// Talk file name (without extension) or path to a .tlk file
        file: String,
    },
    /// Run a conversation headless, printing each page of text
    Play {
        /// Talk file name (without extension) or path to a .tlk file
        file: String,

        /// Talk-map indices to choose, in order
        #[arg(long, value_delimiter = ',', value_name = "INDEX")]
        choose: Vec<usize>,

        /// Speaker number of the character being talked to
        #[arg(long, default_value_t = 1)]
        talkto: u8,

        /// Flags to set (negative to clear) before starting
        #[arg(long = "flag", value_delimiter = ',', allow_negative_numbers = true)]
        flags: Vec<i32>,

        /// Speaker names, starting with the player
        #[arg(long, value_delimiter = ',', value_name = "NAME")]
        cast: Vec<String>,
    },
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref dir) = self.contentdir {
            opts.content_dir = Some(dir.clone());
        }
        if let Some(ref dialect) = self.dialect {
            opts.dialect = parse_dialect(dialect)?;
        }
        if let Some(ref level) = self.loglevel {
            opts.log_level = parse_log_level(level)?;
        }
        if let Some(width) = self.windowwidth {
            if width == 0 {
                anyhow::bail!("Window width must be positive");
            }
            opts.window_width = width;
        }
        if let Some(ref lines) = self.pagelines {
            opts.page_lines = parse_page_lines(lines).context("Invalid --pagelines")?;
        }
        Ok(opts)
    }
}
