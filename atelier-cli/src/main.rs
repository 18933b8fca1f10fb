//! atelier: one-shot client for the atelier bridge
//!
//! Each invocation connects, sends one envelope, optionally prints what the
//! bridge sends back for a while, and exits.

mod cli;
mod client;
mod commands;

use clap::Parser;
use cli::Cli;
use atelier_utils::LogConfig;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(e) = atelier_utils::init_logging_with_config(LogConfig::cli()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let exit_code = match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
