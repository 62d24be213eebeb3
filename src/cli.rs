//! Command-line interface for shopassist
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Barcode and label reader for the shop floor
#[derive(Parser, Debug)]
#[command(
    name = "shopassist",
    version,
    about = "Scan barcodes, read labels and hear the result"
)]
pub struct Cli {
    /// Subcommand to execute (default: interactive session)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Camera device (e.g., /dev/video2)
    #[arg(long, global = true, value_name = "DEVICE")]
    pub device: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the session in the background, controlled over a Unix socket
    Daemon {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/shopassist.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Arm the daemon's scanner for the next barcode
    Scan {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/shopassist.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Take a photo with the daemon's camera and read its text
    Recognize {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/shopassist.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Ask the daemon to retry camera access
    Grant {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/shopassist.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show the daemon's session state
    Status {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/shopassist.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Stop the daemon
    Stop {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/shopassist.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Look up a product code in the catalog
    Lookup {
        /// EAN-13, QR or Code-128 payload
        code: String,
    },

    /// Recognize text in an image file
    Ocr {
        /// Image to read
        image: PathBuf,
    },

    /// Speak a phrase with the configured voice
    Say {
        /// Text to speak
        text: String,
    },

    /// Check system dependencies
    Check,

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Get a configuration value by key (e.g., camera.device)
    Get {
        /// Dotted key path (e.g., speech.rate, catalog.base_url)
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_command() {
        let cli = Cli::try_parse_from(["shopassist"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.device.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["shopassist", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shopassist",
            "daemon",
            "--device",
            "/dev/video2",
            "-q",
            "--config",
            "/tmp/c.toml",
        ])
        .unwrap();
        assert_eq!(cli.device.as_deref(), Some("/dev/video2"));
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Some(Commands::Daemon { socket: None })));
    }

    #[test]
    fn test_parse_ipc_commands_with_socket() {
        for name in ["scan", "recognize", "grant", "status", "stop"] {
            let cli =
                Cli::try_parse_from(["shopassist", name, "--socket", "/tmp/s.sock"]).unwrap();
            let socket = match cli.command {
                Some(Commands::Scan { socket })
                | Some(Commands::Recognize { socket })
                | Some(Commands::Grant { socket })
                | Some(Commands::Status { socket })
                | Some(Commands::Stop { socket }) => socket,
                other => panic!("unexpected command for {name}: {other:?}"),
            };
            assert_eq!(socket, Some(PathBuf::from("/tmp/s.sock")));
        }
    }

    #[test]
    fn test_parse_lookup_requires_code() {
        assert!(Cli::try_parse_from(["shopassist", "lookup"]).is_err());
        let cli = Cli::try_parse_from(["shopassist", "lookup", "4006381333931"]).unwrap();
        match cli.command {
            Some(Commands::Lookup { code }) => assert_eq!(code, "4006381333931"),
            other => panic!("Expected Lookup command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ocr_and_say() {
        let cli = Cli::try_parse_from(["shopassist", "ocr", "label.jpg"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Ocr { image }) if image == PathBuf::from("label.jpg")));

        let cli = Cli::try_parse_from(["shopassist", "say", "hello there"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Say { text }) if text == "hello there"));
    }

    #[test]
    fn test_parse_config_actions() {
        let cli = Cli::try_parse_from(["shopassist", "config", "get", "speech.rate"]).unwrap();
        match cli.command {
            Some(Commands::Config {
                action: ConfigAction::Get { key },
            }) => assert_eq!(key, "speech.rate"),
            other => panic!("Expected config get, got {other:?}"),
        }
        assert!(matches!(
            Cli::try_parse_from(["shopassist", "config", "show"])
                .unwrap()
                .command,
            Some(Commands::Config {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["shopassist", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["shopassist", "toggle"]).is_err());
    }
}
