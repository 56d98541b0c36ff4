//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use lxd_client::StateAction;

/// lxdctl - talk to an LXD server over its REST API
#[derive(Parser, Debug)]
#[command(name = "lxdctl")]
#[command(about = "lxdctl - talk to an LXD server over its REST API")]
#[command(version)]
pub struct Args {
    /// LXD base URI, overrides LXD_URI (must end with '/')
    #[arg(long)]
    pub uri: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported API versions
    Apis,

    /// Show server configuration and environment
    Info,

    /// List containers
    Containers,

    /// Show one container
    Container { name: String },

    /// List images
    Images,

    /// List profiles
    Profiles,

    /// List networks
    Networks,

    /// List background operations
    Operations,

    /// Show one operation (UUID or /1.0/operations/... URL)
    Operation { reference: String },

    /// Wait once for an operation to finish
    Wait {
        reference: String,

        /// Server-side wait timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Change container state (start, stop, restart, freeze, unfreeze)
    State {
        name: String,

        action: StateAction,

        /// Seconds the server waits for the change
        #[arg(long)]
        timeout: Option<i64>,

        /// Force the state change
        #[arg(long)]
        force: bool,

        /// Wait for the resulting operation
        #[arg(long)]
        wait: bool,
    },

    /// Delete a container
    Delete {
        name: String,

        /// Wait for the resulting operation
        #[arg(long)]
        wait: bool,
    },

    /// Run a command in a container (output is recorded server-side)
    Exec {
        name: String,

        /// Command and arguments, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,

        /// Wait for the resulting operation
        #[arg(long)]
        wait: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wait() {
        let args = Args::try_parse_from(["lxdctl", "wait", "/1.0/operations/u1", "--timeout", "30"])
            .unwrap();
        match args.command {
            Command::Wait { reference, timeout } => {
                assert_eq!(reference, "/1.0/operations/u1");
                assert_eq!(timeout, Some(30));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_parse_state() {
        let args = Args::try_parse_from([
            "lxdctl", "--uri", "https://lxd:8443/", "state", "c1", "stop", "--force", "--wait",
        ])
        .unwrap();
        assert_eq!(args.uri.as_deref(), Some("https://lxd:8443/"));
        match args.command {
            Command::State {
                name,
                action,
                force,
                wait,
                ..
            } => {
                assert_eq!(name, "c1");
                assert_eq!(action, StateAction::Stop);
                assert!(force);
                assert!(wait);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_exec() {
        let args = Args::try_parse_from(["lxdctl", "exec", "c1", "--", "ls", "-la"]).unwrap();
        match args.command {
            Command::Exec { name, command, wait } => {
                assert_eq!(name, "c1");
                assert_eq!(command, vec!["ls", "-la"]);
                assert!(!wait);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_action() {
        assert!(Args::try_parse_from(["lxdctl", "state", "c1", "reboot"]).is_err());
    }
}
