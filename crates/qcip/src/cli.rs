//! Command line parsing
//!
//! ```text
//! qcip [-c|--config <path>] [-n|--winnotify] [-ip|--ipaddr <ipv4>]
//! qcip -v|--version
//! qcip -h|--help
//! ```
//!
//! `-ip` predates the clap parser and is not a valid short flag, so it is
//! rewritten to `--ipaddr` before parsing.

use clap::{ArgAction, CommandFactory, Parser};
use qcip_core::config::DEFAULT_CONFIG_PATH;
use qcip_core::{Error, Result};
use std::net::Ipv4Addr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "qcip",
    about = "Keep Tencent Cloud firewall rules pointed at your current public IP",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Show this help
    #[arg(
        short = 'h',
        long = "help",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["version", "config", "ipaddr", "winnotify"]
    )]
    help: bool,

    /// Show version information and check for updates
    #[arg(
        short = 'v',
        long = "version",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["config", "ipaddr", "winnotify"]
    )]
    version: bool,

    /// Config file to use
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Send notification cards (Windows only)
    #[arg(short = 'n', long = "winnotify", action = ArgAction::SetTrue)]
    winnotify: bool,

    /// Use this IPv4 address instead of detecting it (also `-ip`)
    #[arg(long = "ipaddr", value_name = "IPV4")]
    ipaddr: Option<Ipv4Addr>,
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Version,
    Run(RunOptions),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub ip: Option<Ipv4Addr>,
    pub notify: bool,
}

/// Parse `args` (including the program name)
pub fn parse_args<I>(args: I) -> Result<Action>
where
    I: IntoIterator<Item = String>,
{
    let cli = Cli::try_parse_from(rewrite_legacy_args(args)).map_err(|e| {
        let rendered = e.to_string();
        let first = rendered.lines().next().unwrap_or_default();
        Error::argument(first.trim_start_matches("error: ").to_string())
    })?;

    if cli.help {
        return Ok(Action::Help);
    }
    if cli.version {
        return Ok(Action::Version);
    }
    if cli.winnotify && !cfg!(windows) {
        return Err(Error::argument("-n is only available on Windows"));
    }

    Ok(Action::Run(RunOptions {
        config_path: cli
            .config
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        ip: cli.ipaddr,
        notify: cli.winnotify,
    }))
}

/// Rendered `--help` text
pub fn help_text() -> String {
    Cli::command().render_help().to_string()
}

fn rewrite_legacy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            if arg == "-ip" {
                "--ipaddr".to_string()
            } else if let Some(value) = arg.strip_prefix("-ip=") {
                format!("--ipaddr={}", value)
            } else {
                arg
            }
        })
        .collect()
}
