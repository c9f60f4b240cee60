//! Command-line and shell command definitions
//!
//! The interactive shell parses each input line with the same subcommands as
//! the process arguments. JSON bodies may span several words; they are joined
//! back together before parsing.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "backoffice", version, about = "Back-office command-line client")]
pub struct Cli {
    /// Config file (defaults to CONFIG_PATH, then backoffice.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Sign in (password from BACKOFFICE_PASSWORD)
    Login {
        username: String,
        /// Keep the session in memory only
        #[arg(long)]
        temporary: bool,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user and token expiry
    Status,
    /// GET a backend path
    Get { path: String },
    /// DELETE a backend path
    Delete { path: String },
    /// POST a JSON body
    Post {
        path: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        body: Vec<String>,
    },
    /// PUT a JSON body
    Put {
        path: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        body: Vec<String>,
    },
    /// PATCH a JSON body
    Patch {
        path: String,
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        body: Vec<String>,
    },
    /// PUT a file to a pre-signed storage URL
    Upload {
        #[arg(value_name = "PRESIGNED_URL")]
        url: String,
        file: PathBuf,
    },
    /// Read commands from stdin, one per line
    Shell,
}

/// One line typed into the shell.
#[derive(Parser, Debug)]
#[command(name = "backoffice", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

impl Command {
    /// Parse one shell line. Help requests come back as errors whose text is
    /// the help output.
    pub fn parse_line(line: &str) -> std::result::Result<Self, clap::Error> {
        let line = ShellLine::try_parse_from(line.split_whitespace())?;
        if line.command == Command::Shell {
            return Err(clap::Error::raw(
                clap::error::ErrorKind::InvalidSubcommand,
                "already in the shell\n",
            ));
        }
        Ok(line.command)
    }
}

/// Join a multi-word JSON argument and parse it.
pub fn json_body(words: &[String]) -> Result<serde_json::Value> {
    serde_json::from_str(&words.join(" ")).context("request body is not valid JSON")
}

/// Content type for an upload, from the file extension.
pub fn content_type_for(file: &std::path::Path) -> &'static str {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}
