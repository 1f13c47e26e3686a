mod cli;

use log::info;
use sqlsink::config::Config;
use sqlsink::error::{self, Result};
use sqlsink::logging;
use std::path::Path;

/// Initialize simple console logging for init/completions commands
fn init_simple_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    use clap::Parser;
    let cli = cli::opts::Cli::parse();

    match &cli.command {
        Some(cli::opts::Commands::Init { output, force }) => {
            init_simple_logging(cli.verbose, cli.quiet);
            cli::init::handle_init(output, *force)
        }
        Some(cli::opts::Commands::Completions { shell }) => {
            cli::opts::Cli::generate_completions(*shell);
            Ok(())
        }
        Some(cli::opts::Commands::Run { config, input }) => {
            let mut cfg = load_config(config)?;
            apply_logging(&mut cfg, cli.verbose, cli.quiet)?;
            info!("Application started");
            cli::run::handle_run(&cfg, input.as_deref()).await
        }
        Some(cli::opts::Commands::Validate { config }) => {
            let mut cfg = load_config(config)?;
            eprintln!("Configuration validation passed");
            apply_logging(&mut cfg, cli.verbose, cli.quiet)?;
            cli::validate::handle_validate(&cfg)
        }
        Some(cli::opts::Commands::Schema { config }) => {
            // 只向 stdout 输出建表语句，不初始化诊断日志
            let cfg = load_config(config)?;
            cli::schema::handle_schema(&cfg)
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    }
}

/// 加载并验证配置
fn load_config(config_path: &str) -> Result<Config> {
    let path = Path::new(config_path);
    match Config::from_file(path) {
        Ok(c) => {
            eprintln!("Loaded configuration file: {config_path}");
            Ok(c)
        }
        Err(e) => {
            if let error::Error::Config(error::ConfigError::NotFound(_)) = &e {
                eprintln!("Configuration file not found: {config_path}");
                eprintln!("Tip: run 'sqlsink init' to generate a configuration file");
            }
            Err(e)
        }
    }
}

/// 按命令行开关覆盖日志级别并初始化诊断日志
fn apply_logging(cfg: &mut Config, verbose: bool, quiet: bool) -> Result<()> {
    if verbose {
        cfg.logging.level = "debug".to_string();
    } else if quiet {
        cfg.logging.level = "error".to_string();
    }
    logging::init_logging(&cfg.logging)
}

fn print_help() {
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("sqlsink - Log Sink Transport for SQL Databases");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!("\nUsage: sqlsink <COMMAND> [OPTIONS]");
    eprintln!("\nCommands:");
    eprintln!("  run          Deliver JSON-lines log records to the log table");
    eprintln!("  init         Generate a default configuration file");
    eprintln!("  validate     Validate a configuration file");
    eprintln!("  schema       Print the CREATE TABLE statement for the log table");
    eprintln!("  completions  Generate shell completion scripts");
    eprintln!("\nOptions:");
    eprintln!("  -v, --verbose   Enable verbose output (debug level)");
    eprintln!("  -q, --quiet     Suppress non-error output");
    eprintln!("  -h, --help      Print help information");
    eprintln!("  -V, --version   Print version information");
    eprintln!("\nExamples:");
    eprintln!("  # Initialize configuration");
    eprintln!("  sqlsink init");
    eprintln!("\n  # Create the log table");
    eprintln!("  sqlsink schema -c config.toml | sqlite3 logs.db");
    eprintln!("\n  # Deliver records from a file with verbose logging");
    eprintln!("  sqlsink -v run -c config.toml -i app.jsonl");
    eprintln!("\n  # Deliver records piped from another process");
    eprintln!("  my-app | sqlsink run -c config.toml");
    eprintln!("\nFor more help: sqlsink --help");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
}
