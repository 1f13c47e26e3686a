use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

/// Log sink transport: persist structured log records into a database table
#[derive(Debug, Parser)]
#[command(
    name = "sqlsink",
    version,
    about = "Deliver JSON log records into a SQLite/PostgreSQL log table",
    long_about = "Reads JSON-lines log records ({\"level\", \"message\", ...metadata}) and inserts each one into a configured log table through a bounded connection pool."
)]
pub struct Cli {
    /// Enable verbose output (debug level)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Suppress non-error output (error level only)
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deliver log records to the configured table
    Run {
        /// Configuration file path
        #[arg(short = 'c', long = "config", default_value = "config.toml")]
        config: String,
        /// JSON-lines input file (reads stdin when omitted)
        #[arg(short = 'i', long = "input")]
        input: Option<String>,
    },
    /// Generate a default configuration file
    Init {
        /// Output configuration file path
        #[arg(short = 'o', long = "output", default_value = "config.toml")]
        output: String,
        /// Force overwrite if file exists
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short = 'c', long = "config", default_value = "config.toml")]
        config: String,
    },
    /// Print the CREATE TABLE statement matching the configured field names
    Schema {
        /// Configuration file path
        #[arg(short = 'c', long = "config", default_value = "config.toml")]
        config: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Generate shell completions
    pub fn generate_completions(shell: Shell) {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_input() {
        let cli = Cli::parse_from(["sqlsink", "-v", "run", "-c", "a.toml", "-i", "logs.jsonl"]);
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Run { config, input }) => {
                assert_eq!(config, "a.toml");
                assert_eq!(input.as_deref(), Some("logs.jsonl"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
