//! Command-line interface definition.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Debug, Parser)]
#[command(name = "cumulus", version, about = "Offline-first personal cloud storage client")]
pub struct Cli {
    /// Config file (TOML, YAML or JSON). Defaults to the platform config dir.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep a copy of a file for reading offline, under its remote id.
    Save {
        id: String,
        file: PathBuf,
        #[arg(long, default_value = DEFAULT_MIME)]
        mime: String,
    },
    /// Drop the offline copy of a file.
    Remove { id: String },
    /// Print (or write out) an offline copy.
    Read {
        id: String,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// List files available offline.
    List,
    /// Upload a file now if the remote is reachable, otherwise queue it.
    Upload {
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value = DEFAULT_MIME)]
        mime: String,
    },
    /// Queue a file for upload on the next reconciliation.
    Enqueue {
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value = DEFAULT_MIME)]
        mime: String,
    },
    /// List queued uploads, oldest first.
    Queue,
    /// Show cache and queue totals.
    Stats,
    /// Reconcile once, assuming the remote is reachable.
    Sync,
    /// Remove every offline copy.
    ClearCache,
    /// Discard every queued upload without sending it.
    ClearQueue,
    /// Probe the remote and reconcile on every reconnection until Ctrl-C.
    Watch,
    /// List files recorded by the remote.
    RemoteLs,
    /// Flag (or unflag) a remote file as wanted offline.
    RemoteFlag {
        id: String,
        #[arg(long)]
        off: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["cumulus", "stats", "-vv", "--config", "c.toml"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Command::Stats));
    }

    #[test]
    fn test_enqueue_defaults() {
        let cli = Cli::parse_from(["cumulus", "enqueue", "report.pdf"]);
        let Command::Enqueue { file, folder, mime } = cli.command else {
            panic!("expected enqueue");
        };
        assert_eq!(file, PathBuf::from("report.pdf"));
        assert!(folder.is_none());
        assert_eq!(mime, DEFAULT_MIME);
    }

    #[test]
    fn test_remote_flag_off() {
        let cli = Cli::parse_from(["cumulus", "remote-flag", "f-1", "--off"]);
        assert!(matches!(cli.command, Command::RemoteFlag { off: true, .. }));
    }
}
