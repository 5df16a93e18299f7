//! Argument parsing and the entry point of the `tokenfs` binary.

use crate::logging;
use crate::shell::Shell;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use token_fs::{TokenFs, TokenFsConfig};

/// The options for the tokenfs command shell
#[derive(Debug, Parser)]
#[clap(name = "tokenfs", about = "Interactive shell over a token-fs store.", version)]
pub struct Cli {
    /// Read commands from FILE instead of stdin
    #[clap(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Maximum number of nodes, root included
    #[clap(long, env = "TOKENFS_MAX_NODES")]
    pub max_nodes: Option<u64>,

    /// Maximum number of tokens a single file may hold
    #[clap(long, env = "TOKENFS_MAX_TOKENS_PER_FILE")]
    pub max_tokens_per_file: Option<u64>,

    /// Longest accepted name, also the longest listing sentence
    #[clap(long, default_value_t = TokenFsConfig::default().max_name_len)]
    pub max_name_len: usize,

    /// Entries fetched per directory batch
    #[clap(long, default_value_t = TokenFsConfig::default().readdir_batch)]
    pub readdir_batch: usize,
}

impl Cli {
    /// Store configuration described by the flags.
    pub fn config(&self) -> TokenFsConfig {
        TokenFsConfig {
            max_nodes: self.max_nodes,
            max_tokens_per_file: self.max_tokens_per_file,
            max_name_len: self.max_name_len,
            readdir_batch: self.readdir_batch,
        }
    }

    /// Build the store and feed every input line to the shell.
    pub fn execute(&self) -> Result<()> {
        let fs = TokenFs::new(self.config()).context("invalid store configuration")?;
        let stdout = io::stdout();
        let mut shell = Shell::new(fs, stdout.lock());

        match &self.script {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open `{}`", path.display()))?;
                shell.run(BufReader::new(file))
            }
            None => shell.run(io::stdin().lock()),
        }
    }
}

/// The main function for the tokenfs binary.
pub fn tokenfs_main() -> Result<()> {
    let cli = Cli::parse();
    logging::set_up_logging(cli.verbose);
    tracing::debug!(?cli, "starting");
    cli.execute()
}
