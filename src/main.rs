// scaffold - project scaffolding CLI
// Main CLI entry point

use clap::Parser;
use std::process;
use scaffold::cli::{Cli, CliDispatcher};
use scaffold::utils::config::Config;
use scaffold::utils::logging;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let config = match Config::load(&cli.overrides()) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            process::exit(err.exit_code());
        }
    };

    let code = CliDispatcher::new(&config).execute(cli.command).await;
    process::exit(code);
}
