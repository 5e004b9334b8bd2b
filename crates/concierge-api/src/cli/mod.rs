//! CLI command definitions for the `concierge` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod conversation;

use clap::{Parser, Subcommand};

/// Chat with an assistant that knows the weather, the date and the holidays.
#[derive(Parser)]
#[command(name = "concierge", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug logs).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value_t = 3000)]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Send a message, starting a new conversation unless one is given.
    Ask {
        /// Continue this conversation instead of starting a new one.
        #[arg(long, short)]
        conversation: Option<String>,

        /// The message to send.
        message: String,
    },

    /// List conversations, most recently updated first.
    #[command(alias = "ls")]
    List,

    /// Show a conversation with its messages.
    Show {
        /// Conversation ID.
        id: String,
    },
}

impl Commands {
    /// Commands that call the model and therefore need its API key.
    pub fn needs_model(&self) -> bool {
        matches!(self, Commands::Serve { .. } | Commands::Ask { .. })
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_conversation() {
        let cli = Cli::try_parse_from([
            "concierge",
            "--json",
            "ask",
            "--conversation",
            "0190b2c4-0000-7000-8000-000000000000",
            "and tomorrow?",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Ask {
                conversation,
                message,
            } => {
                assert_eq!(
                    conversation.as_deref(),
                    Some("0190b2c4-0000-7000-8000-000000000000")
                );
                assert_eq!(message, "and tomorrow?");
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["concierge", "-vv", "serve"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.command.needs_model());
        match cli.command {
            Commands::Serve { port, host } => {
                assert_eq!(port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn read_only_commands_do_not_need_model() {
        let cli = Cli::try_parse_from(["concierge", "list"]).unwrap();
        assert!(!cli.command.needs_model());
        let cli = Cli::try_parse_from(["concierge", "show", "abc"]).unwrap();
        assert!(!cli.command.needs_model());
    }
}
